// Arpeggiator - Turn chord tones into an ordered, timed note sequence
// Used by the transport for both the chord lane and the melody lane

use crate::sequencer::timeline::Tempo;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Note order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpPattern {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpPattern {
    pub fn name(&self) -> &'static str {
        match self {
            ArpPattern::Up => "up",
            ArpPattern::Down => "down",
            ArpPattern::UpDown => "updown",
            ArpPattern::Random => "random",
        }
    }
}

/// Note rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpSpeed {
    Sixteenth,
    #[default]
    Eighth,
    Quarter,
}

impl ArpSpeed {
    pub fn name(&self) -> &'static str {
        match self {
            ArpSpeed::Sixteenth => "1/16",
            ArpSpeed::Eighth => "1/8",
            ArpSpeed::Quarter => "1/4",
        }
    }

    /// The rate's denominator, as used by the timing formula
    pub fn notes_per_beat(&self) -> f64 {
        match self {
            ArpSpeed::Sixteenth => 16.0,
            ArpSpeed::Eighth => 8.0,
            ArpSpeed::Quarter => 4.0,
        }
    }
}

/// Note length relative to the note spacing
///
/// Only scales the gate; both settings trigger every note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpTrigger {
    #[default]
    Retrigger,
    Sustain,
}

impl ArpTrigger {
    pub fn gate(&self) -> f64 {
        match self {
            ArpTrigger::Retrigger => 0.8,
            ArpTrigger::Sustain => 0.99,
        }
    }
}

/// Where the sequence index restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpMode {
    /// Restart at the first note on every chord and play the full sequence
    #[default]
    Chord,
    /// Keep running through the sequence across chords and bars
    Run,
}

/// Arpeggiator configuration for one lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArpeggiatorConfig {
    pub enabled: bool,
    pub pattern: ArpPattern,
    pub speed: ArpSpeed,
    pub octaves: u8, // >= 1
    pub trigger: ArpTrigger,
    pub mode: ArpMode,
}

impl Default for ArpeggiatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: ArpPattern::Up,
            speed: ArpSpeed::Eighth,
            octaves: 1,
            trigger: ArpTrigger::Retrigger,
            mode: ArpMode::Chord,
        }
    }
}

/// Spacing and length of arpeggiated notes, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpTiming {
    pub note_duration: f64,
    pub note_length: f64,
}

impl ArpTiming {
    pub fn new(config: &ArpeggiatorConfig, tempo: &Tempo) -> Self {
        let note_duration = tempo.beat_duration_seconds() / (config.speed.notes_per_beat() / 4.0);
        Self {
            note_duration,
            note_length: note_duration * config.trigger.gate(),
        }
    }
}

/// One arpeggiated note, relative to the chord's start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpNote {
    /// Seconds after the chord starts
    pub offset: f64,
    pub pitch: u8,
    /// Seconds
    pub length: f64,
}

/// Add the tones transposed up by whole octaves, sorted ascending
///
/// Pitches above 127 are dropped.
pub fn expand(tones: &[u8], octaves: u8) -> Vec<u8> {
    let mut expanded: Vec<u8> = tones.to_vec();
    for octave in 1..octaves.max(1) {
        let shift = 12 * octave as u16;
        expanded.extend(
            tones
                .iter()
                .map(|&tone| tone as u16 + shift)
                .filter(|&pitch| pitch <= 127)
                .map(|pitch| pitch as u8),
        );
    }
    expanded.sort_unstable();
    expanded
}

/// The ordered sequence for a chord
pub fn build_sequence<R: Rng + ?Sized>(
    tones: &[u8],
    config: &ArpeggiatorConfig,
    rng: &mut R,
) -> Vec<u8> {
    let mut sequence = expand(tones, config.octaves);
    match config.pattern {
        ArpPattern::Up => {}
        ArpPattern::Down => sequence.reverse(),
        ArpPattern::UpDown => {
            // Top and bottom notes are not repeated at the turnarounds
            let len = sequence.len();
            if len > 2 {
                let inner: Vec<u8> = sequence[1..len - 1].iter().rev().copied().collect();
                sequence.extend(inner);
            }
        }
        ArpPattern::Random => sequence.shuffle(rng),
    }
    sequence
}

/// Chord mode: the full sequence from index 0
pub fn emit_chord_mode(sequence: &[u8], timing: &ArpTiming) -> Vec<ArpNote> {
    sequence
        .iter()
        .enumerate()
        .map(|(i, &pitch)| ArpNote {
            offset: i as f64 * timing.note_duration,
            pitch,
            length: timing.note_length,
        })
        .collect()
}

/// Run mode: as many notes as fit in `available` seconds, continuing from `index`
///
/// `index` is advanced once per emitted note.
pub fn emit_run_mode(
    sequence: &[u8],
    timing: &ArpTiming,
    available: f64,
    index: &mut usize,
) -> Vec<ArpNote> {
    if sequence.is_empty() || timing.note_duration <= 0.0 {
        return Vec::new();
    }

    // Small epsilon so 2.0 / 0.25 does not floor to 7
    let count = (available / timing.note_duration + 1e-9).floor().max(0.0) as usize;
    let mut notes = Vec::with_capacity(count);
    for i in 0..count {
        notes.push(ArpNote {
            offset: i as f64 * timing.note_duration,
            pitch: sequence[*index % sequence.len()],
            length: timing.note_length,
        });
        *index += 1;
    }
    notes
}

/// Arpeggiate one chord lasting `available` seconds
pub fn arpeggiate<R: Rng + ?Sized>(
    tones: &[u8],
    config: &ArpeggiatorConfig,
    tempo: &Tempo,
    available: f64,
    run_index: &mut usize,
    rng: &mut R,
) -> Vec<ArpNote> {
    let sequence = build_sequence(tones, config, rng);
    let timing = ArpTiming::new(config, tempo);
    match config.mode {
        ArpMode::Chord => emit_chord_mode(&sequence, &timing),
        ArpMode::Run => emit_run_mode(&sequence, &timing, available, run_index),
    }
}
