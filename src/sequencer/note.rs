// Note representation for the sequencer
// Chords for the chord lane and bar-relative notes for the melody lane

use crate::sequencer::timeline::TimelineError;
use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Get the note name for a MIDI pitch (e.g., 60 -> "C4", 70 -> "A#4")
pub fn note_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    let note_index = (pitch % 12) as usize;

    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Name of a pitch class (0 = C)
pub fn pitch_class_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES[(pitch_class % 12) as usize]
}

fn check_midi(value: u32) -> Result<u8, TimelineError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 127)
        .ok_or(TimelineError::MidiOutOfRange(value))
}

/// A chord in the chord lane
///
/// `midi_notes` is kept unique, sorted ascending and non-empty; every
/// constructor and mutator restores that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Display symbol (e.g., "Am7")
    pub symbol: String,

    /// Root name (e.g., "A")
    pub root: String,

    /// Quality suffix (e.g., "m7", empty for major)
    pub quality: String,

    midi_notes: Vec<u8>,

    note_names: Vec<String>,
}

impl Chord {
    /// Creates a new chord from its pitches
    pub fn new(
        symbol: impl Into<String>,
        root: impl Into<String>,
        quality: impl Into<String>,
        midi_notes: Vec<u8>,
    ) -> Result<Self, TimelineError> {
        let mut chord = Self {
            symbol: symbol.into(),
            root: root.into(),
            quality: quality.into(),
            midi_notes: Vec::new(),
            note_names: Vec::new(),
        };
        chord.set_notes(midi_notes)?;
        Ok(chord)
    }

    /// Pitches, unique and ascending
    pub fn midi_notes(&self) -> &[u8] {
        &self.midi_notes
    }

    /// Note names matching `midi_notes`
    pub fn note_names(&self) -> &[String] {
        &self.note_names
    }

    /// Replace all pitches
    pub fn set_notes(&mut self, mut midi_notes: Vec<u8>) -> Result<(), TimelineError> {
        if midi_notes.is_empty() {
            return Err(TimelineError::EmptyChord);
        }
        for &pitch in &midi_notes {
            check_midi(pitch as u32)?;
        }

        midi_notes.sort_unstable();
        midi_notes.dedup();

        self.note_names = midi_notes.iter().map(|&p| note_name(p)).collect();
        self.midi_notes = midi_notes;
        Ok(())
    }

    /// Add one pitch (no-op if already present)
    pub fn add_note(&mut self, pitch: u8) -> Result<(), TimelineError> {
        let mut notes = self.midi_notes.clone();
        notes.push(pitch);
        self.set_notes(notes)
    }

    /// Remove one pitch; removing the last pitch is rejected
    pub fn remove_note(&mut self, pitch: u8) -> Result<bool, TimelineError> {
        if !self.midi_notes.contains(&pitch) {
            return Ok(false);
        }
        let notes: Vec<u8> = self
            .midi_notes
            .iter()
            .copied()
            .filter(|&p| p != pitch)
            .collect();
        self.set_notes(notes)?;
        Ok(true)
    }

    /// Lowest pitch
    pub fn bass(&self) -> u8 {
        self.midi_notes[0]
    }

    /// Re-establish the invariants after deserialization
    pub(crate) fn normalized(mut self) -> Result<Self, TimelineError> {
        let notes = std::mem::take(&mut self.midi_notes);
        self.set_notes(notes)?;
        Ok(self)
    }
}

/// A note in the melody (channel 2) lane
///
/// `start` and `duration` are fractions of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyNote {
    /// MIDI note number (0-127, where 60 = C4)
    pub midi: u8,

    /// Start within the bar, in [0, 1)
    pub start: f64,

    /// Duration as a fraction of the bar (> 0)
    pub duration: f64,

    /// Optional per-note velocity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<u8>,
}

impl MelodyNote {
    /// Creates a new melody note
    pub fn new(midi: u8, start: f64, duration: f64) -> Result<Self, TimelineError> {
        let note = Self {
            midi,
            start,
            duration,
            velocity: None,
        };
        note.validate()?;
        Ok(note)
    }

    /// Same note with an explicit velocity
    pub fn with_velocity(mut self, velocity: u8) -> Result<Self, TimelineError> {
        check_midi(velocity as u32)?;
        self.velocity = Some(velocity);
        Ok(self)
    }

    /// End position as a fraction of the bar
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Check ranges (pitch, start in [0,1), positive duration)
    pub fn validate(&self) -> Result<(), TimelineError> {
        check_midi(self.midi as u32)?;
        if let Some(velocity) = self.velocity {
            check_midi(velocity as u32)?;
        }
        if !(0.0..1.0).contains(&self.start) {
            return Err(TimelineError::InvalidMelodyNote(format!(
                "start {} must be in [0, 1)",
                self.start
            )));
        }
        if !(self.duration > 0.0) || !self.duration.is_finite() {
            return Err(TimelineError::InvalidMelodyNote(format!(
                "duration {} must be > 0",
                self.duration
            )));
        }
        Ok(())
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        note_name(self.midi)
    }
}
