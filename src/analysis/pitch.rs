//! Pitch estimation
//!
//! Piptrack-style estimator: for every STFT frame, take the maximum-magnitude
//! bin inside the melodic band and refine its frequency with parabolic
//! interpolation. The segment pitch is the median of the voiced per-frame
//! pitches, which resists octave-jump outliers in individual frames better
//! than a mean.

use super::spectral::{self, HOP_LENGTH, N_FFT};

/// Lower bound of the melodic search band
const FMIN_HZ: f32 = 150.0;

/// Upper bound of the melodic search band
const FMAX_HZ: f32 = 4000.0;

/// Magnitude below this is treated as an unvoiced frame
const MAG_FLOOR: f32 = 1e-3;

/// Estimate the dominant pitch of an audio segment in Hz.
///
/// Returns `None` when no frame in the segment carries a voiced pitch.
pub fn extract_pitch(segment: &[f32], sample_rate: u32) -> Option<f32> {
    if segment.is_empty() {
        return None;
    }

    let spec = spectral::magnitude_spectrogram(segment, sample_rate, N_FFT, HOP_LENGTH);

    let bin_min = ((FMIN_HZ * spec.n_fft as f32 / sample_rate as f32).ceil() as usize).max(1);
    let bin_max =
        ((FMAX_HZ * spec.n_fft as f32 / sample_rate as f32).floor() as usize).min(spec.n_bins() - 2);
    if bin_min > bin_max {
        return None;
    }

    let mut pitches = Vec::new();

    for frame in &spec.frames {
        let (peak_bin, peak_mag) = frame[bin_min..=bin_max]
            .iter()
            .enumerate()
            .map(|(i, &m)| (i + bin_min, m))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        if peak_mag <= MAG_FLOOR {
            continue; // unvoiced / silent frame
        }

        let bin = interpolate_bin(frame, peak_bin);
        let hz = spec.bin_hz(bin);
        if hz > 0.0 {
            pitches.push(hz);
        }
    }

    if pitches.is_empty() {
        None
    } else {
        Some(median(&mut pitches))
    }
}

/// Convert a frequency in Hz to a fractional MIDI note number (A4 = 440 Hz)
pub fn hz_to_midi(hz: f64) -> f64 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

/// Parabolic interpolation of a magnitude peak to a fractional bin index
fn interpolate_bin(frame: &[f32], bin: usize) -> f32 {
    if bin == 0 || bin + 1 >= frame.len() {
        return bin as f32;
    }

    let a = frame[bin - 1];
    let b = frame[bin];
    let c = frame[bin + 1];
    let denom = a - 2.0 * b + c;
    if denom.abs() < f32::EPSILON {
        return bin as f32;
    }

    let delta = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    bin as f32 + delta
}

/// Median of an unsorted list (averages the two middle values for even counts)
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) * 0.5
    } else {
        values[n / 2]
    }
}
