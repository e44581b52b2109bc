//! Signal processing helpers used around the vocoder: window envelopes for inverting an STFT,
//! Griffin-Lim phase reconstruction, mel spectrogram dynamic range compression and padding masks.
use ndarray::prelude::*;
use ndarray::{Data, Dimension};
use rand::Rng;
use std::f32::consts::PI;

/// Multiplier applied before taking the log in [`dynamic_range_compression`]
pub const DEFAULT_COMPRESSION_FACTOR: f32 = 1.0;
/// Floor applied before taking the log so silence doesn't become `-inf`
pub const DEFAULT_CLIP_VAL: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Hann,
    Hamming,
    Rectangular,
}

impl Window {
    /// The periodic form of the window, as used for spectral analysis.
    pub fn periodic(self, len: usize) -> Array1<f32> {
        let n = len as f32;
        match self {
            Self::Hann => Array1::from_shape_fn(len, |i| {
                0.5 - 0.5 * (2.0 * PI * i as f32 / n).cos()
            }),
            Self::Hamming => Array1::from_shape_fn(len, |i| {
                0.54 - 0.46 * (2.0 * PI * i as f32 / n).cos()
            }),
            Self::Rectangular => Array1::ones(len),
        }
    }
}

/// Compute the sum-square envelope of a window function at a given hop length. This is the
/// modulation that overlap-adding windowed frames introduces, dividing by it undoes the windowing
/// in an inverse STFT.
///
/// The window is squared and centred in an `n_fft` frame. The output has
/// `n_fft + hop_length * (n_frames - 1)` samples.
pub fn window_sumsquare(
    window: Window,
    n_frames: usize,
    hop_length: usize,
    win_length: usize,
    n_fft: usize,
) -> anyhow::Result<Array1<f32>> {
    anyhow::ensure!(n_frames > 0, "window_sumsquare needs at least one frame");
    anyhow::ensure!(
        win_length <= n_fft,
        "window length {} is longer than the FFT size {}",
        win_length,
        n_fft
    );

    let n = n_fft + hop_length * (n_frames - 1);
    let mut x = Array1::<f32>::zeros(n);

    let mut win_sq = Array1::<f32>::zeros(n_fft);
    let pad = (n_fft - win_length) / 2;
    win_sq
        .slice_mut(s![pad..pad + win_length])
        .assign(&window.periodic(win_length).mapv(|w| w * w));

    for frame in 0..n_frames {
        let sample = frame * hop_length;
        let mut target = x.slice_mut(s![sample..sample + n_fft]);
        target += &win_sq;
    }
    Ok(x)
}

/// A short-time fourier transform which can go both ways. Spectrograms are `(n_freqs, n_frames)`.
pub trait Stft {
    /// Returns the magnitudes and phases of the signal
    fn transform(&self, signal: ArrayView1<f32>) -> (Array2<f32>, Array2<f32>);

    fn inverse(&self, magnitudes: ArrayView2<f32>, phases: ArrayView2<f32>) -> Array1<f32>;
}

/// Estimates a signal for the given magnitude spectrogram, starting from random phase and
/// alternating between the STFT and its inverse for `n_iters` rounds.
pub fn griffin_lim<S, R>(
    magnitudes: ArrayView2<f32>,
    stft: &S,
    n_iters: usize,
    rng: &mut R,
) -> Array1<f32>
where
    S: Stft + ?Sized,
    R: Rng + ?Sized,
{
    let angles = Array2::from_shape_fn(magnitudes.raw_dim(), |_| {
        let theta = 2.0 * PI * rng.gen::<f32>();
        theta.sin().atan2(theta.cos())
    });
    let mut signal = stft.inverse(magnitudes, angles.view());

    for _ in 0..n_iters {
        let (_, angles) = stft.transform(signal.view());
        signal = stft.inverse(magnitudes, angles.view());
    }
    signal
}

/// `ln(max(x, clip_val) * c)`
pub fn dynamic_range_compression<S, D>(x: &ArrayBase<S, D>, c: f32, clip_val: f32) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    x.mapv(|v| (v.max(clip_val) * c).ln())
}

/// Inverse of [`dynamic_range_compression`] for values above the clip, `exp(x) / c`
pub fn dynamic_range_decompression<S, D>(x: &ArrayBase<S, D>, c: f32) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    x.mapv(|v| v.exp() / c)
}

/// Return a `(batch, max_len)` mask, entries within each length are true.
pub fn mask_from_lengths(lengths: &[usize]) -> Array2<bool> {
    let max_len = lengths.iter().copied().max().unwrap_or(0);
    Array2::from_shape_fn((lengths.len(), max_len), |(i, j)| j < lengths[i])
}
