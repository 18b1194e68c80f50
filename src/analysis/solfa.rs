//! Pitch-class to solfa mapping and beat quantization
//!
//! The scale is fixed to C major. Out-of-scale pitch classes snap to the
//! nearest scale degree by absolute distance; on a tie the ascending scan
//! order makes the lower scale degree win, which keeps the mapping
//! deterministic.

/// Solfa syllables for the C major scale, in scale-degree order
pub const SOLFA_SYLLABLES: [&str; 7] = ["Do", "Re", "Mi", "Fa", "Sol", "La", "Ti"];

/// C major scale pitch classes: C=0, D=2, E=4, F=5, G=7, A=9, B=11
pub const SCALE_PITCH_CLASSES: [i64; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Map a MIDI note number to the closest C-major solfa syllable.
pub fn midi_to_solfa(midi_note: i64) -> &'static str {
    let pitch_class = midi_note.rem_euclid(12);

    let mut closest = 0;
    for (i, &pc) in SCALE_PITCH_CLASSES.iter().enumerate() {
        if (pc - pitch_class).abs() < (SCALE_PITCH_CLASSES[closest] - pitch_class).abs() {
            closest = i;
        }
    }

    SOLFA_SYLLABLES[closest]
}

/// Round a beat count to the nearest quarter beat.
pub fn quantize_beats(beats: f64) -> f64 {
    (beats * 4.0).round() / 4.0
}
