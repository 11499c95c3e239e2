#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use audio_restore_core::{
    write_audio, AudioData, CollaboratorOutput, RestorationRequest, Result, SampleEncoding,
};

/// Sum of sines, one tone list per channel, written as 16-bit WAV.
pub fn tone_file(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    secs: f32,
    tones_per_channel: &[&[f32]],
) -> PathBuf {
    let channels = tones_per_channel.len();
    let frames = (sample_rate as f32 * secs) as usize;
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        for tones in tones_per_channel {
            let s: f32 = tones.iter().map(|f| (2.0 * PI * f * t).sin()).sum();
            samples.push(s * 0.2);
        }
    }
    let path = dir.join(name);
    write_audio(
        &path,
        &AudioData {
            samples,
            sample_rate,
            channels: channels as u16,
            encoding: SampleEncoding::Int16,
        },
    )
    .unwrap();
    path
}

/// Restorer stand-in that copies its input to the requested output.
pub fn copy_stub(req: &RestorationRequest) -> Result<CollaboratorOutput> {
    std::fs::copy(&req.input, &req.output)?;
    Ok(CollaboratorOutput::ok())
}

/// Deterministic pseudo-noise in [-0.5, 0.5).
pub fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
        })
        .collect()
}
