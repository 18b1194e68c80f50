//! Tempo estimation
//!
//! Autocorrelation of the onset-strength envelope, FFT-accelerated
//! (ACF = IFFT(|FFT(x)|^2)), with candidate lags restricted to a musical BPM
//! range. Returns 0.0 when the signal has no usable periodicity; the caller
//! decides the fallback.

use rustfft::{num_complex::Complex32, FftPlanner};

use super::onset;
use super::spectral::HOP_LENGTH;

const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 240.0;

/// Minimum envelope length (frames) worth analyzing
const MIN_FRAMES: usize = 8;

/// Minimum ACF peak height relative to lag-0 energy
const MIN_ACF_RATIO: f32 = 0.1;

/// Estimate tempo in BPM from a mono signal.
///
/// Returns 0.0 for silence, a single onset, or any input without a clear
/// periodicity in the [MIN_BPM, MAX_BPM] range.
pub fn estimate_tempo(samples: &[f32], sample_rate: u32) -> f32 {
    let envelope = onset::onset_strength(samples, sample_rate);
    if envelope.len() < MIN_FRAMES {
        return 0.0;
    }

    // Remove DC so steady envelope level does not dominate the ACF
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f32> = envelope.iter().map(|&v| v - mean).collect();

    let acf = autocorrelate(&centered);
    if acf[0] <= 0.0 {
        return 0.0; // zero-variance envelope
    }

    // Lag bounds from the BPM range
    let frames_per_sec = sample_rate as f32 / HOP_LENGTH as f32;
    let min_lag = ((60.0 * frames_per_sec / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frames_per_sec / MIN_BPM).floor() as usize).min(centered.len() - 1);
    if min_lag > max_lag {
        return 0.0;
    }

    let mut best_lag = 0usize;
    let mut best_value = 0.0f32;
    for lag in min_lag..=max_lag {
        if acf[lag] > best_value {
            best_value = acf[lag];
            best_lag = lag;
        }
    }

    if best_lag == 0 || best_value / acf[0] < MIN_ACF_RATIO {
        return 0.0;
    }

    // Parabolic interpolation around the peak for a fractional lag
    let lag = interpolate_peak(&acf, best_lag);

    60.0 * frames_per_sec / lag
}

/// FFT-accelerated autocorrelation, zero-padded to avoid circular wraparound
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let padded_len = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex32> = signal
        .iter()
        .map(|&v| Complex32::new(v, 0.0))
        .chain(std::iter::repeat(Complex32::new(0.0, 0.0)))
        .take(padded_len)
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    let ifft = planner.plan_fft_inverse(padded_len);

    fft.process(&mut buffer);
    for v in &mut buffer {
        *v = Complex32::new(v.norm_sqr(), 0.0);
    }
    ifft.process(&mut buffer);

    // rustfft leaves the inverse unnormalized; the scale cancels in ratios
    // but is applied anyway for readable magnitudes.
    buffer[..n]
        .iter()
        .map(|c| c.re / padded_len as f32)
        .collect()
}

/// Quadratic interpolation of an ACF peak, clamped to half a lag either side
fn interpolate_peak(acf: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag + 1 >= acf.len() {
        return lag as f32;
    }

    let a = acf[lag - 1];
    let b = acf[lag];
    let c = acf[lag + 1];
    let denom = a - 2.0 * b + c;
    if denom.abs() < f32::EPSILON {
        return lag as f32;
    }

    let delta = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    lag as f32 + delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_train(period_secs: f32, total_secs: f32, sample_rate: u32) -> Vec<f32> {
        let mut samples = vec![0.0f32; (total_secs * sample_rate as f32) as usize];
        let burst_len = (0.05 * sample_rate as f32) as usize;
        let mut t = 0.0;
        while t < total_secs {
            let start = (t * sample_rate as f32) as usize;
            for i in 0..burst_len {
                if start + i < samples.len() {
                    let phase = 2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32;
                    samples[start + i] += phase.sin() * 0.5;
                }
            }
            t += period_secs;
        }
        samples
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let samples = vec![0.0f32; 44100];
        assert_eq!(estimate_tempo(&samples, 22050), 0.0);
    }

    #[test]
    fn test_single_tone_has_no_tempo() {
        // One onset at t=0, nothing periodic afterwards
        let sample_rate = 22050u32;
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * 261.63 * t).sin() * 0.5
            })
            .collect();
        assert_eq!(estimate_tempo(&samples, sample_rate), 0.0);
    }

    #[test]
    fn test_120_bpm_click_train() {
        let samples = click_train(0.5, 8.0, 22050);
        let bpm = estimate_tempo(&samples, 22050);
        assert!((105.0..=135.0).contains(&bpm), "estimated {} BPM", bpm);
    }

    #[test]
    fn test_60_bpm_click_train() {
        let samples = click_train(1.0, 8.0, 22050);
        let bpm = estimate_tempo(&samples, 22050);
        assert!((52.0..=68.0).contains(&bpm), "estimated {} BPM", bpm);
    }

    #[test]
    fn test_too_short_input_has_no_tempo() {
        let samples = vec![0.5f32; 1024];
        assert_eq!(estimate_tempo(&samples, 22050), 0.0);
    }

    #[test]
    fn test_interpolate_peak_centers_symmetric_peak() {
        let acf = vec![0.0, 1.0, 2.0, 1.0, 0.0];
        assert!((interpolate_peak(&acf, 2) - 2.0).abs() < 1e-6);
    }
}
