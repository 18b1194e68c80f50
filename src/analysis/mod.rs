//! Note extraction pipeline
//!
//! Turns decoded mono audio into an ordered list of solfa note events:
//! tempo estimation, onset detection, per-segment pitch estimation, pitch to
//! solfa mapping, and quarter-beat duration quantization.

pub mod onset;
pub mod pitch;
pub mod solfa;
pub mod spectral;
pub mod tempo;

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fallback tempo when the estimator reports no usable periodicity
const FALLBACK_BPM: f32 = 60.0;

/// A single transcribed note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Solfa syllable (Do, Re, Mi, Fa, Sol, La, Ti)
    pub solfa: String,
    /// Duration in beats, rounded to the nearest quarter beat
    pub beats: f64,
}

/// Transcribe mono audio into an ordered sequence of solfa note events.
///
/// Tempo and onsets are estimated independently from the same samples. Each
/// pair of consecutive onsets bounds a segment (the last segment runs to the
/// end of the audio); a segment contributes one event if it contains samples
/// and a voiced pitch.
pub fn transcribe(samples: &[f32], sample_rate: u32) -> Vec<NoteEvent> {
    let estimated = tempo::estimate_tempo(samples, sample_rate);
    let bpm = if estimated.is_finite() && estimated > 0.0 {
        estimated
    } else {
        FALLBACK_BPM
    };
    let beat_duration_secs = 60.0 / bpm as f64;

    let onset_times = onset::detect_onsets(samples, sample_rate);
    let total_secs = samples.len() as f64 / sample_rate as f64;

    debug!(
        bpm,
        onsets = onset_times.len(),
        duration_secs = total_secs,
        "Transcribing audio"
    );

    let mut notes = Vec::new();

    for segment in segment_bounds(&onset_times, samples.len(), sample_rate) {
        let slice = &samples[segment.samples.clone()];

        let Some(hz) = pitch::extract_pitch(slice, sample_rate) else {
            continue; // unvoiced segment, no event
        };

        let midi_note = pitch::hz_to_midi(hz as f64).round() as i64;
        let syllable = solfa::midi_to_solfa(midi_note);

        let duration_beats = (segment.end_secs - segment.start_secs) / beat_duration_secs;
        let beats = solfa::quantize_beats(duration_beats);

        notes.push(NoteEvent {
            solfa: syllable.to_string(),
            beats,
        });
    }

    notes
}

/// A resolved note segment: time bounds plus the sample range to analyze
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start_secs: f64,
    end_secs: f64,
    samples: Range<usize>,
}

/// Resolve onset times into half-open segments over the sample buffer.
///
/// Consecutive onsets bound each segment; the last one extends to the end of
/// the audio. A segment whose sample slice is empty (degenerate start == end,
/// or an onset at or past the end of the buffer) is dropped and produces no
/// event.
fn segment_bounds(onset_times: &[f32], n_samples: usize, sample_rate: u32) -> Vec<Segment> {
    let total_secs = n_samples as f64 / sample_rate as f64;
    let mut segments = Vec::new();

    for (i, &onset) in onset_times.iter().enumerate() {
        let start_secs = onset as f64;
        let end_secs = onset_times
            .get(i + 1)
            .map(|&t| t as f64)
            .unwrap_or(total_secs);

        let start_idx = (start_secs * sample_rate as f64) as usize;
        let end_idx = ((end_secs * sample_rate as f64) as usize).min(n_samples);

        if start_idx >= end_idx {
            continue;
        }

        segments.push(Segment {
            start_secs,
            end_secs,
            samples: start_idx..end_idx,
        });
    }

    segments
}
