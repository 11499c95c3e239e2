//! Before/after spectrogram comparison.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use image::{Rgb, RgbImage};
use log::debug;
use ndarray::Array2;

use crate::{
    core::{
        audio::{downmix_to_mono, read_audio},
        dsp::{power_spectrogram_db, ANALYSIS_HOP, ANALYSIS_NFFT},
    },
    error::Result,
    paths::comparison_path,
};

/// Produces a comparison artifact for a reference and a restored file.
pub trait Analyzer {
    fn compare(&self, reference: &Path, restored: &Path) -> Result<PathBuf>;
}

impl<F> Analyzer for F
where
    F: Fn(&Path, &Path) -> Result<PathBuf>,
{
    fn compare(&self, reference: &Path, restored: &Path) -> Result<PathBuf> {
        self(reference, restored)
    }
}

/// Renders both spectrograms side by side into a PNG next to the restored
/// file, on a shared frequency axis.
#[derive(Clone, Debug)]
pub struct SpectrogramAnalyzer {
    pub panel_width: u32,
    pub height: u32,
    /// Dynamic range shown below the loudest bin.
    pub range_db: f32,
}

impl Default for SpectrogramAnalyzer {
    fn default() -> Self {
        Self {
            panel_width: 640,
            height: 384,
            range_db: 100.0,
        }
    }
}

const GAP: u32 = 4;

struct Panel {
    db: Array2<f32>,
    sample_rate: u32,
}

impl Panel {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let audio = read_audio(path)?;
        let mono = downmix_to_mono(&audio.samples, audio.channels);
        if mono.is_empty() {
            return Err(anyhow!("{:?} contains no samples", path));
        }
        Ok(Self {
            db: power_spectrogram_db(&mono, ANALYSIS_NFFT, ANALYSIS_HOP),
            sample_rate: audio.sample_rate,
        })
    }

    fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    fn peak(&self) -> f32 {
        self.db.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Loudest bin in the cell covering `frames` at frequency `hz`.
    fn sample(&self, frames: (usize, usize), hz: f32) -> Option<f32> {
        if hz > self.nyquist() {
            return None;
        }
        let bin_hz = self.sample_rate as f32 / ANALYSIS_NFFT as f32;
        let bin = ((hz / bin_hz) as usize).min(self.db.nrows() - 1);
        (frames.0..frames.1.max(frames.0 + 1))
            .filter(|&f| f < self.db.ncols())
            .map(|f| self.db[(bin, f)])
            .reduce(f32::max)
    }
}

impl SpectrogramAnalyzer {
    fn render(&self, panels: &[Panel; 2]) -> RgbImage {
        let width = self.panel_width * 2 + GAP;
        let mut img = RgbImage::from_pixel(width, self.height, Rgb([255, 255, 255]));

        let top_hz = panels[0].nyquist().max(panels[1].nyquist());
        let peak = panels[0].peak().max(panels[1].peak());

        for (p, panel) in panels.iter().enumerate() {
            let x0 = p as u32 * (self.panel_width + GAP);
            let frames = panel.db.ncols();
            for x in 0..self.panel_width {
                let f0 = x as usize * frames / self.panel_width as usize;
                let f1 = (x as usize + 1) * frames / self.panel_width as usize;
                for y in 0..self.height {
                    let hz = top_hz * (1.0 - (y as f32 + 0.5) / self.height as f32);
                    let colour = match panel.sample((f0, f1), hz) {
                        Some(db) => heat(((db - peak) / self.range_db + 1.0).clamp(0.0, 1.0)),
                        None => Rgb([0, 0, 0]),
                    };
                    img.put_pixel(x0 + x, y, colour);
                }
            }
        }
        img
    }
}

impl Analyzer for SpectrogramAnalyzer {
    fn compare(&self, reference: &Path, restored: &Path) -> Result<PathBuf> {
        let panels = [
            Panel::load(reference).context("reference spectrogram")?,
            Panel::load(restored).context("restored spectrogram")?,
        ];
        let out = comparison_path(restored);
        self.render(&panels)
            .save(&out)
            .with_context(|| format!("Failed to write comparison image {:?}", out))?;
        debug!("Wrote comparison image {:?}", out);
        Ok(out)
    }
}

/// Black → purple → orange → pale yellow.
fn heat(t: f32) -> Rgb<u8> {
    const STOPS: [(f32, [f32; 3]); 4] = [
        (0.0, [0.0, 0.0, 4.0]),
        (0.4, [120.0, 28.0, 109.0]),
        (0.75, [237.0, 105.0, 37.0]),
        (1.0, [252.0, 255.0, 164.0]),
    ];
    let i = STOPS
        .windows(2)
        .position(|w| t <= w[1].0)
        .unwrap_or(STOPS.len() - 2);
    let (t0, c0) = STOPS[i];
    let (t1, c1) = STOPS[i + 1];
    let k = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    Rgb([0, 1, 2].map(|j| (c0[j] + (c1[j] - c0[j]) * k).round() as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_endpoints() {
        assert_eq!(heat(0.0), Rgb([0, 0, 4]));
        assert_eq!(heat(1.0), Rgb([252, 255, 164]));
    }
}
