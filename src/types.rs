use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Interleaved waveform. Samples are normalized to [-1, 1] regardless of the
/// encoding they were decoded from.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
}

impl AudioData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// On-disk sample encoding of a waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    #[default]
    Int16,
    Int24,
    Int32,
    Float32,
}

impl SampleEncoding {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleEncoding::Int16 => 16,
            SampleEncoding::Int24 => 24,
            SampleEncoding::Int32 | SampleEncoding::Float32 => 32,
        }
    }

    /// Magnitude of the most negative integer code, `None` for float.
    pub fn full_scale(self) -> Option<f64> {
        match self {
            SampleEncoding::Int16 => Some(32_768.0),
            SampleEncoding::Int24 => Some(8_388_608.0),
            SampleEncoding::Int32 => Some(2_147_483_648.0),
            SampleEncoding::Float32 => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelTag {
    Mono,
    Left,
    Right,
}

impl ChannelTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelTag::Mono => "mono",
            ChannelTag::Left => "left",
            ChannelTag::Right => "right",
        }
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One single-channel slice of a parent waveform.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelUnit {
    pub tag: ChannelTag,
    pub audio: AudioData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub cutoff_hz: u32,
    pub order: usize,
}

impl FilterSpec {
    pub const DEFAULT_ORDER: usize = 10;

    pub fn new(cutoff_hz: u32) -> Self {
        Self {
            cutoff_hz,
            order: Self::DEFAULT_ORDER,
        }
    }
}

/// What the restoration collaborator is asked to do for one channel unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestorationRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub steps: u32,
    pub cutoff_hz: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreOptions {
    pub output_dir: PathBuf,
    pub steps: u32,
    pub cutoff_hz: u32,
    pub filter_order: usize,
    /// Render a before/after spectrogram next to the restored file.
    pub compare: bool,
    /// Resample each channel to this rate before handing it to the model.
    pub model_sample_rate: Option<u32>,
}

impl RestoreOptions {
    pub const MIN_STEPS: u32 = 10;
    pub const MAX_STEPS: u32 = 200;
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            steps: 50,
            cutoff_hz: 4_000,
            filter_order: FilterSpec::DEFAULT_ORDER,
            compare: false,
            model_sample_rate: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RestoreResult {
    pub audio_path: PathBuf,
    pub comparison_path: Option<PathBuf>,
    /// Set when a comparison was requested but could not be produced.
    pub analysis_error: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: usize,
}
