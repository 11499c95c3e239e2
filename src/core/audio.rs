use std::{fs::File, path::Path};

use anyhow::{anyhow, Context, Result};
use hound::WavWriter;
use log::{debug, warn};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{
        CodecParameters, DecoderOptions, CODEC_TYPE_PCM_F32BE, CODEC_TYPE_PCM_F32LE,
        CODEC_TYPE_PCM_F64BE, CODEC_TYPE_PCM_F64LE,
    },
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
    sample::SampleFormat,
};
use symphonia::default::{get_codecs, get_probe};

use crate::types::{AudioData, SampleEncoding};

pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path: &Path = path.as_ref();

    let file: File =
        File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;

    let mss: MediaSourceStream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint: Hint = Hint::new();

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognized audio container: {:?}", path))?;

    let mut format = probed.format;
    let track = format.default_track().context("No default track found")?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .context("No decoder for audio track")?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = codec_params.sample_rate.unwrap_or(0);
    let mut channels: u16 = codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet in {:?}: {}", path, msg);
                continue;
            }
            Err(e) => return Err(e).context("Failed to decode audio"),
        };
        sample_rate = decoded.spec().rate;
        channels = decoded.spec().channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);

        samples.extend_from_slice(buffer.samples());
    }

    if sample_rate == 0 || channels == 0 {
        return Err(anyhow!("Audio stream has no sample rate or channel layout"));
    }

    let encoding = encoding_of(&codec_params);

    debug!(
        "Read audio {:?}: sample_rate={}, channels={}, samples={}, encoding={:?}",
        path,
        sample_rate,
        channels,
        samples.len(),
        encoding
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        encoding,
    })
}

fn encoding_of(params: &CodecParameters) -> SampleEncoding {
    // The WAV reader leaves sample_format unset; float PCM only shows in the codec.
    if [
        CODEC_TYPE_PCM_F32LE,
        CODEC_TYPE_PCM_F32BE,
        CODEC_TYPE_PCM_F64LE,
        CODEC_TYPE_PCM_F64BE,
    ]
    .contains(&params.codec)
    {
        return SampleEncoding::Float32;
    }
    match params.sample_format {
        Some(SampleFormat::F32) | Some(SampleFormat::F64) => return SampleEncoding::Float32,
        Some(SampleFormat::S24) | Some(SampleFormat::U24) => return SampleEncoding::Int24,
        Some(SampleFormat::S32) | Some(SampleFormat::U32) => return SampleEncoding::Int32,
        Some(_) => return SampleEncoding::Int16,
        None => {}
    }
    match params.bits_per_sample {
        Some(24) => SampleEncoding::Int24,
        Some(32) => SampleEncoding::Int32,
        _ => SampleEncoding::Int16,
    }
}

/// Writes `audio` as WAV using its own sample encoding.
pub fn write_audio<P: AsRef<Path>>(path: P, audio: &AudioData) -> Result<()> {
    let path = path.as_ref();
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: audio.encoding.bits_per_sample(),
        sample_format: match audio.encoding {
            SampleEncoding::Float32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    match audio.encoding.full_scale() {
        None => {
            for &sample in &audio.samples {
                writer.write_sample(sample)?;
            }
        }
        Some(scale) => {
            let (lo, hi) = (-scale, scale - 1.0);
            for &sample in &audio.samples {
                let s = (sample as f64 * scale).round().clamp(lo, hi);
                match audio.encoding {
                    SampleEncoding::Int16 => writer.write_sample(s as i16)?,
                    _ => writer.write_sample(s as i32)?,
                }
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|chunk| chunk.iter().copied().sum::<f32>() / channels as f32)
        .collect()
}
