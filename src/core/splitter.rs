use log::warn;

use crate::{
    core::audio::downmix_to_mono,
    error::{RestoreError, Result},
    types::{AudioData, ChannelTag, ChannelUnit},
};

/// Splits a waveform into one unit per channel: `[Mono]` or `[Left, Right]`.
pub fn split(audio: &AudioData) -> Result<Vec<ChannelUnit>> {
    let tags: &[ChannelTag] = match audio.channels {
        1 => &[ChannelTag::Mono],
        2 => &[ChannelTag::Left, ChannelTag::Right],
        n => {
            return Err(RestoreError::UnsupportedChannelLayout {
                channels: n as usize,
            })
        }
    };

    let planes = deinterleave(&audio.samples, audio.channels);

    Ok(tags
        .iter()
        .zip(planes)
        .map(|(&tag, samples)| ChannelUnit {
            tag,
            audio: AudioData {
                samples,
                sample_rate: audio.sample_rate,
                channels: 1,
                encoding: audio.encoding,
            },
        })
        .collect())
}

/// Recombines restored units. Stereo units must agree on rate and length.
pub fn join(mut units: Vec<ChannelUnit>) -> Result<AudioData> {
    match units.len() {
        1 if units[0].tag == ChannelTag::Mono => Ok(units.remove(0).audio),
        2 => {
            units.sort_by_key(|u| u.tag != ChannelTag::Left);
            let (left, right) = (&units[0], &units[1]);
            if left.tag != ChannelTag::Left || right.tag != ChannelTag::Right {
                return Err(RestoreError::UnsupportedChannelLayout { channels: 2 });
            }
            for unit in [left, right] {
                if unit.audio.channels != 1 {
                    return Err(RestoreError::UnsupportedChannelLayout {
                        channels: unit.audio.channels as usize,
                    });
                }
            }

            let (l, r) = (&left.audio, &right.audio);
            if l.sample_rate != r.sample_rate || l.frames() != r.frames() {
                return Err(RestoreError::ChannelMismatch {
                    left_rate: l.sample_rate,
                    left_frames: l.frames(),
                    right_rate: r.sample_rate,
                    right_frames: r.frames(),
                });
            }

            Ok(AudioData {
                samples: interleave(&l.samples, &r.samples),
                sample_rate: l.sample_rate,
                channels: 2,
                encoding: l.encoding,
            })
        }
        n => Err(RestoreError::UnsupportedChannelLayout { channels: n }),
    }
}

/// Wraps audio returned by the restorer as a unit. Multi-channel output is
/// downmixed, since each unit is restored from a mono file.
pub fn restored_unit(tag: ChannelTag, mut audio: AudioData) -> ChannelUnit {
    if audio.channels > 1 {
        warn!(
            "Restorer returned {} channels for the {} unit, downmixing",
            audio.channels, tag
        );
        audio.samples = downmix_to_mono(&audio.samples, audio.channels);
        audio.channels = 1;
    }
    ChannelUnit { tag, audio }
}

pub fn deinterleave(interleaved: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let channels = channels.max(1) as usize;
    let frames = interleaved.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

pub fn interleave(left: &[f32], right: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(left.len() * 2);
    for (&l, &r) in left.iter().zip(right) {
        out.push(l);
        out.push(r);
    }
    out
}
