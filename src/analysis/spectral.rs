//! STFT and magnitude spectrogram
//!
//! Hann-windowed short-time Fourier transform over mono samples. Frames are
//! stored frame-major (n_frames x n_bins) with only the non-negative
//! frequency bins kept.

use rustfft::{num_complex::Complex32, FftPlanner};

/// FFT window length used throughout the pipeline
pub const N_FFT: usize = 2048;

/// Hop length between consecutive analysis frames
pub const HOP_LENGTH: usize = 512;

/// Magnitude spectrogram with its analysis parameters
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Magnitude frames (n_frames x n_bins)
    pub frames: Vec<Vec<f32>>,
    pub n_fft: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
}

impl Spectrogram {
    /// Number of frequency bins per frame (n_fft / 2 + 1)
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Center frequency of a (possibly fractional) bin index
    pub fn bin_hz(&self, bin: f32) -> f32 {
        bin * self.sample_rate as f32 / self.n_fft as f32
    }

    /// Start time of a frame in seconds
    pub fn frame_time(&self, frame: usize) -> f32 {
        (frame * self.hop_length) as f32 / self.sample_rate as f32
    }
}

/// Compute the magnitude spectrogram of a mono signal.
///
/// Inputs shorter than one window are zero-padded so every non-empty signal
/// produces at least one frame.
pub fn magnitude_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    n_fft: usize,
    hop_length: usize,
) -> Spectrogram {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);

    let padded;
    let signal = if samples.len() < n_fft {
        padded = {
            let mut p = samples.to_vec();
            p.resize(n_fft, 0.0);
            p
        };
        &padded[..]
    } else {
        samples
    };

    let n_frames = (signal.len() - n_fft) / hop_length + 1;
    let n_bins = n_fft / 2 + 1;
    let mut frames = Vec::with_capacity(n_frames);

    for frame_idx in 0..n_frames {
        let start = frame_idx * hop_length;

        let mut buffer: Vec<Complex32> = signal[start..start + n_fft]
            .iter()
            .zip(&window)
            .map(|(&sample, &win)| Complex32::new(sample * win, 0.0))
            .collect();

        fft.process(&mut buffer);

        frames.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
    }

    Spectrogram {
        frames,
        n_fft,
        hop_length,
        sample_rate,
    }
}

/// Periodic Hann window of the given length (denominator `size`, the STFT
/// analysis variant, rather than the symmetric `size - 1` form)
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let samples = vec![0.0f32; 22050];
        let spec = magnitude_spectrogram(&samples, 22050, N_FFT, HOP_LENGTH);
        assert_eq!(spec.frames.len(), (22050 - N_FFT) / HOP_LENGTH + 1);
        assert_eq!(spec.frames[0].len(), N_FFT / 2 + 1);
    }

    #[test]
    fn test_short_input_is_padded_to_one_frame() {
        let samples = vec![0.1f32; 100];
        let spec = magnitude_spectrogram(&samples, 22050, N_FFT, HOP_LENGTH);
        assert_eq!(spec.frames.len(), 1);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sample_rate = 22050u32;
        let freq = 440.0f32;
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect();

        let spec = magnitude_spectrogram(&samples, sample_rate, N_FFT, HOP_LENGTH);
        let frame = &spec.frames[spec.frames.len() / 2];
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        let expected = (freq * N_FFT as f32 / sample_rate as f32).round() as usize;
        assert!(
            (peak_bin as i64 - expected as i64).abs() <= 1,
            "peak bin {} vs expected {}",
            peak_bin,
            expected
        );
    }

    #[test]
    fn test_bin_and_time_conversions() {
        let spec = magnitude_spectrogram(&vec![0.0; N_FFT], 22050, N_FFT, HOP_LENGTH);
        assert_eq!(spec.bin_hz(0.0), 0.0);
        assert!((spec.bin_hz(1.0) - 22050.0 / 2048.0).abs() < 1e-3);
        assert_eq!(spec.frame_time(0), 0.0);
    }

    #[test]
    fn test_hann_window_is_periodic_variant() {
        let w = hann_window(8);
        assert!(w[0].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
        // Periodic form: the last sample does not return to zero; the window
        // only closes at the (absent) index `size`.
        assert!(w[7] > 0.0);
        assert!(w.iter().cloned().fold(0.0f32, f32::max) <= 1.0);
    }
}
