//! Onset detection
//!
//! Positive spectral-flux novelty with an adaptive median + MAD threshold
//! (McFee & Ellis 2014) and local-maximum peak picking. Returns onset times
//! in seconds, strictly increasing.

use super::spectral::{self, HOP_LENGTH, N_FFT};

/// MAD multiplier for the adaptive threshold
const MAD_K: f32 = 2.5;

/// Absolute floor on the normalized envelope; peaks below this are noise
const MIN_PEAK: f32 = 0.1;

/// Minimum spacing between reported onsets, in frames (~90ms at 22.05kHz)
const MIN_GAP_FRAMES: usize = 4;

/// Compute the onset-strength envelope of a mono signal.
///
/// Per frame: sum of positive magnitude increases over the previous frame.
/// The first frame uses its total magnitude, so a sound starting at t=0
/// registers as an onset from silence. The envelope is normalized to a peak
/// of 1.0 (all-zero envelopes are returned as-is).
pub(crate) fn onset_strength(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let spec = spectral::magnitude_spectrogram(samples, sample_rate, N_FFT, HOP_LENGTH);
    let mut envelope = Vec::with_capacity(spec.frames.len());

    for (t, frame) in spec.frames.iter().enumerate() {
        let strength = if t == 0 {
            frame.iter().sum()
        } else {
            frame
                .iter()
                .zip(&spec.frames[t - 1])
                .map(|(&cur, &prev)| (cur - prev).max(0.0))
                .sum()
        };
        envelope.push(strength);
    }

    let max = envelope.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in &mut envelope {
            *v /= max;
        }
    }

    envelope
}

/// Detect note onset times (seconds) in a mono signal.
pub fn detect_onsets(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let envelope = onset_strength(samples, sample_rate);
    if envelope.is_empty() {
        return Vec::new();
    }

    let threshold = adaptive_threshold(&envelope).max(MIN_PEAK);

    let mut onsets = Vec::new();
    let mut last_onset: Option<usize> = None;

    for t in 0..envelope.len() {
        if envelope[t] < threshold {
            continue;
        }

        // Local maximum (boundaries compare against the one existing neighbor)
        let rising = t == 0 || envelope[t] >= envelope[t - 1];
        let falling = t + 1 == envelope.len() || envelope[t] > envelope[t + 1];
        if !(rising && falling) {
            continue;
        }

        if let Some(prev) = last_onset {
            if t - prev < MIN_GAP_FRAMES {
                continue;
            }
        }

        last_onset = Some(t);
        onsets.push((t * HOP_LENGTH) as f32 / sample_rate as f32);
    }

    onsets
}

/// Median + MAD threshold: `median(v) + k * median(|v - median(v)|)`
fn adaptive_threshold(values: &[f32]) -> f32 {
    let median = median_f32(values);
    let deviations: Vec<f32> = values.iter().map(|&v| (v - median).abs()).collect();
    let mad = median_f32(&deviations);
    median + MAD_K * mad
}

fn median_f32(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) * 0.5
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
        let n = (secs * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin() * 0.5
            })
            .collect()
    }

    /// Short tone bursts every `period_secs`, starting at t=0
    fn click_train(period_secs: f32, total_secs: f32, sample_rate: u32) -> Vec<f32> {
        let mut samples = vec![0.0f32; (total_secs * sample_rate as f32) as usize];
        let burst = sine(1000.0, 0.05, sample_rate);
        let mut t = 0.0;
        while t < total_secs {
            let start = (t * sample_rate as f32) as usize;
            for (i, &s) in burst.iter().enumerate() {
                if start + i < samples.len() {
                    samples[start + i] += s;
                }
            }
            t += period_secs;
        }
        samples
    }

    #[test]
    fn test_silence_has_no_onsets() {
        let samples = vec![0.0f32; 44100];
        assert!(detect_onsets(&samples, 22050).is_empty());
    }

    #[test]
    fn test_tone_from_silence_onsets_at_zero() {
        let samples = sine(440.0, 1.0, 22050);
        let onsets = detect_onsets(&samples, 22050);
        assert_eq!(onsets.len(), 1, "onsets: {:?}", onsets);
        assert!(onsets[0].abs() < 0.05);
    }

    #[test]
    fn test_click_train_yields_one_onset_per_click() {
        let samples = click_train(0.5, 4.0, 22050);
        let onsets = detect_onsets(&samples, 22050);
        assert_eq!(onsets.len(), 8, "onsets: {:?}", onsets);

        for (i, &t) in onsets.iter().enumerate() {
            assert!(
                (t - i as f32 * 0.5).abs() < 0.1,
                "onset {} at {:.3}s",
                i,
                t
            );
        }
    }

    #[test]
    fn test_onsets_strictly_increasing() {
        let samples = click_train(0.25, 3.0, 22050);
        let onsets = detect_onsets(&samples, 22050);
        for pair in onsets.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median_f32(&[1.0, 3.0, 2.0]), 2.0);
        assert_eq!(median_f32(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median_f32(&[]), 0.0);
    }
}
