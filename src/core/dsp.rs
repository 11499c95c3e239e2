use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use ndarray::Array2;
use num_complex::Complex32;
use once_cell::sync::Lazy;
use rubato::{
    InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction,
};
use rustfft::{num_traits::Zero, Fft, FftPlanner};

use crate::{
    error::{RestoreError, Result},
    types::{FilterSpec, SampleEncoding},
};

/// First-order low-pass (the real pole of odd-order designs), bilinear with
/// prewarping at `w0`.
fn first_order_lowpass(w0: f64) -> Coefficients<f64> {
    let k = (w0 / 2.0).tan();
    Coefficients {
        a1: (k - 1.0) / (k + 1.0),
        a2: 0.0,
        b0: k / (1.0 + k),
        b1: k / (1.0 + k),
        b2: 0.0,
    }
}

/// Digital Butterworth low-pass as a cascade of second-order sections.
#[derive(Debug, Clone)]
pub struct ButterworthLowpass {
    sections: Vec<DirectForm2Transposed<f64>>,
}

impl ButterworthLowpass {
    /// `normalized_cutoff` is cutoff / Nyquist and must lie in (0, 1).
    pub fn new(order: usize, normalized_cutoff: f64) -> Result<Self> {
        // Designing against a Nyquist of 1 Hz keeps the cutoff normalized.
        let fs = 2.0f64;
        let mut sections = Vec::with_capacity(order / 2 + 1);
        for k in 0..order / 2 {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * theta.cos());
            let coeffs =
                Coefficients::<f64>::from_params(Type::LowPass, fs.hz(), normalized_cutoff.hz(), q)
                    .map_err(|e| {
                        RestoreError::InvalidParameter(format!(
                            "Failed to create lowpass section {k} (q={q:.4}): {e:?}"
                        ))
                    })?;
            sections.push(DirectForm2Transposed::<f64>::new(coeffs));
        }
        if order % 2 == 1 {
            sections.push(DirectForm2Transposed::<f64>::new(first_order_lowpass(
                PI * normalized_cutoff,
            )));
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> usize {
        self.sections.len()
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<f64> {
        samples
            .iter()
            .map(|&x| {
                self.sections
                    .iter_mut()
                    .fold(x as f64, |acc, section| section.run(acc))
            })
            .collect()
    }
}

/// Low-passes one channel and re-quantizes it to `encoding`.
///
/// A cutoff at or above Nyquist returns the input untouched. Re-quantization
/// truncates toward zero and saturates at the encoding's limits, so filtered
/// integer audio loses up to one LSB per sample.
pub fn lowpass(
    samples: &[f32],
    spec: FilterSpec,
    sample_rate: u32,
    encoding: SampleEncoding,
) -> Result<Vec<f32>> {
    if spec.order == 0 {
        return Err(RestoreError::InvalidParameter(
            "filter order must be positive".into(),
        ));
    }
    if spec.cutoff_hz == 0 || sample_rate == 0 {
        return Err(RestoreError::InvalidParameter(format!(
            "cutoff ({} Hz) and sample rate ({} Hz) must be positive",
            spec.cutoff_hz, sample_rate
        )));
    }

    let normalized = spec.cutoff_hz as f64 / (sample_rate as f64 / 2.0);
    if normalized >= 1.0 {
        return Ok(samples.to_vec());
    }

    let mut filter = ButterworthLowpass::new(spec.order, normalized)?;
    let filtered = filter.process(samples);
    Ok(quantize(&filtered, encoding))
}

fn quantize(samples: &[f64], encoding: SampleEncoding) -> Vec<f32> {
    match encoding.full_scale() {
        None => samples.iter().map(|&s| s as f32).collect(),
        Some(scale) => samples
            .iter()
            .map(|&s| ((s * scale).trunc().clamp(-scale, scale - 1.0) / scale) as f32)
            .collect(),
    }
}

/// Resamples one channel with a windowed-sinc interpolator.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> AnyResult<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = InterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: InterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;
    let target_len = (samples.len() as f64 * ratio).round() as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .context("Failed to create resampler")?;
    let input = vec![samples.to_vec()];
    let mut out = resampler
        .process(&input, None)
        .context("Failed to resample")?
        .into_iter()
        .next()
        .unwrap_or_default();

    out.resize(target_len, 0.0);
    Ok(out)
}

pub const ANALYSIS_NFFT: usize = 2048;
pub const ANALYSIS_HOP: usize = 512;

struct FftCache {
    fft_forward: Arc<dyn Fft<f32>>,
    hann_window: Vec<f32>,
}

static FFT_CACHE_2048: Lazy<FftCache> = Lazy::new(|| {
    let mut planner = FftPlanner::new();
    FftCache {
        fft_forward: planner.plan_fft_forward(ANALYSIS_NFFT),
        hann_window: compute_hann(ANALYSIS_NFFT),
    }
});

fn compute_hann(n_fft: usize) -> Vec<f32> {
    if n_fft <= 1 {
        return vec![1.0];
    }
    let denom = (n_fft - 1) as f32;
    (0..n_fft)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * (i as f32) / denom).cos())
        .collect()
}

/// Power spectrogram in dB with center padding, shape [F, Frames] where
/// F = n_fft / 2 + 1. Uses the cached plan for the analysis size.
pub fn power_spectrogram_db(signal: &[f32], n_fft: usize, hop: usize) -> Array2<f32> {
    let (fft, window): (Arc<dyn Fft<f32>>, Vec<f32>) = if n_fft == ANALYSIS_NFFT {
        let cache = &*FFT_CACHE_2048;
        (cache.fft_forward.clone(), cache.hann_window.clone())
    } else {
        (
            FftPlanner::new().plan_fft_forward(n_fft),
            compute_hann(n_fft),
        )
    };

    let t = signal.len();
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; pad + t + pad];
    padded[pad..pad + t].copy_from_slice(signal);

    let frames = 1 + t / hop.max(1);
    let f_bins = n_fft / 2 + 1;
    let mut out = Array2::<f32>::zeros((f_bins, frames));
    let mut buf = vec![Complex32::zero(); n_fft];

    for fr in 0..frames {
        let start = fr * hop;
        let frame = &padded[start..start + n_fft];
        for i in 0..n_fft {
            buf[i] = Complex32::new(frame[i] * window[i], 0.0);
        }
        fft.process(&mut buf);
        for fi in 0..f_bins {
            out[(fi, fr)] = 10.0 * (buf[fi].norm_sqr() + 1e-12).log10();
        }
    }

    out
}
