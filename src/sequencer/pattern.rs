// Pattern - One named 8-bar slot of chords, drums and melody
// Patterns are stored in a fixed bank (A1..D4) and swapped whole during chaining

use crate::sequencer::follow::FollowPattern;
use crate::sequencer::note::{Chord, MelodyNote};
use crate::sequencer::style::MelodyStyle;
use crate::sequencer::timeline::{MAX_PATTERN_BARS, PatternName, STEPS_PER_BAR, TimelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Drum lanes, mapped onto the General MIDI percussion key map
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DrumTrack {
    Kick,
    Snare,
    #[serde(rename = "hihat")]
    HiHat,
    Clap,
}

impl DrumTrack {
    pub const ALL: [DrumTrack; 4] = [
        DrumTrack::Kick,
        DrumTrack::Snare,
        DrumTrack::HiHat,
        DrumTrack::Clap,
    ];

    /// General MIDI key for this drum (channel 10)
    pub fn gm_pitch(&self) -> u8 {
        match self {
            DrumTrack::Kick => 36,
            DrumTrack::Snare => 38,
            DrumTrack::HiHat => 42,
            DrumTrack::Clap => 39,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DrumTrack::Kick => "kick",
            DrumTrack::Snare => "snare",
            DrumTrack::HiHat => "hihat",
            DrumTrack::Clap => "clap",
        }
    }
}

impl fmt::Display for DrumTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sixteen on/off steps per drum track for one bar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumLane {
    pub steps: BTreeMap<DrumTrack, [bool; STEPS_PER_BAR]>,
}

impl DrumLane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a step is active
    pub fn is_active(&self, track: DrumTrack, step: usize) -> bool {
        self.steps
            .get(&track)
            .and_then(|steps| steps.get(step))
            .copied()
            .unwrap_or(false)
    }

    /// Turn a step on or off
    pub fn set_step(
        &mut self,
        track: DrumTrack,
        step: usize,
        active: bool,
    ) -> Result<(), TimelineError> {
        if step >= STEPS_PER_BAR {
            return Err(TimelineError::StepOutOfRange(step));
        }
        self.steps.entry(track).or_insert([false; STEPS_PER_BAR])[step] = active;
        Ok(())
    }

    /// Active steps as `(step, track)`, ordered by step then track
    pub fn active_steps(&self) -> Vec<(usize, DrumTrack)> {
        let mut active = Vec::new();
        for step in 0..STEPS_PER_BAR {
            for (track, steps) in &self.steps {
                if steps[step] {
                    active.push((step, *track));
                }
            }
        }
        active
    }

    pub fn is_empty(&self) -> bool {
        self.steps.values().all(|steps| steps.iter().all(|s| !s))
    }
}

/// One bar of the chord lane
///
/// Chords partition the bar equally: each lasts `bar_duration / chords.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// 1-indexed bar number
    pub bar_num: usize,
    pub chords: Vec<Chord>,
}

impl Bar {
    pub fn new(bar_num: usize, chords: Vec<Chord>) -> Self {
        Self { bar_num, chords }
    }

    /// Start of sub-chord `index` as a fraction of the bar
    pub fn chord_offset(&self, index: usize) -> f64 {
        if self.chords.is_empty() {
            return 0.0;
        }
        index as f64 / self.chords.len() as f64
    }

    /// Length of one sub-chord as a fraction of the bar
    pub fn chord_fraction(&self) -> f64 {
        if self.chords.is_empty() {
            return 0.0;
        }
        1.0 / self.chords.len() as f64
    }
}

/// How the melody lane gets its notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel2Mode {
    /// Notes are entered by hand
    #[default]
    Direct,
    /// Notes are generated from the chord lane
    Follow,
    /// Notes come from a performance style
    Style,
}

/// Melody lane settings stored with each pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel2Settings {
    pub audible: bool,
    pub mode: Channel2Mode,
    pub follow_pattern: FollowPattern,
    pub style: MelodyStyle,
    /// Chance of optional style hits, in percent
    pub variation: u8,
    /// Octave shift relative to the chord tones (-2..=2)
    pub octave: i8,
    pub velocity: u8,
    /// Maximum start jitter as a fraction of the bar (0.0 = none)
    pub humanize: f64,
}

impl Default for Channel2Settings {
    fn default() -> Self {
        Self {
            audible: true,
            mode: Channel2Mode::Direct,
            follow_pattern: FollowPattern::BrokenChord,
            style: MelodyStyle::PopComping,
            variation: 50,
            octave: 0,
            velocity: 80,
            humanize: 0.05,
        }
    }
}

/// A named 8-bar bundle of chord, drum and melody data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pattern {
    pub progression: Vec<Bar>,

    /// 0-indexed bar -> drum steps
    pub drum_patterns: BTreeMap<usize, DrumLane>,

    /// 0-indexed bar -> melody notes
    pub channel2_notes: BTreeMap<usize, Vec<MelodyNote>>,

    pub channel2_settings: Channel2Settings,
}

impl Pattern {
    /// Create an empty pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern from a chord progression
    pub fn with_progression(progression: Vec<Bar>) -> Result<Self, TimelineError> {
        let mut pattern = Self::new();
        pattern.set_progression(progression)?;
        Ok(pattern)
    }

    /// Replace the chord lane (at most 8 bars)
    pub fn set_progression(&mut self, progression: Vec<Bar>) -> Result<(), TimelineError> {
        if progression.len() > MAX_PATTERN_BARS {
            return Err(TimelineError::TooManyBars(progression.len()));
        }
        self.progression = progression;
        Ok(())
    }

    /// Number of bars in the chord lane
    pub fn bar_count(&self) -> usize {
        self.progression.len()
    }

    /// A pattern counts as filled once it has a chord progression
    pub fn is_filled(&self) -> bool {
        !self.progression.is_empty()
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.progression.get(index)
    }

    pub fn drum_lane(&self, bar_index: usize) -> Option<&DrumLane> {
        self.drum_patterns.get(&bar_index)
    }

    /// Turn a drum step on or off
    pub fn set_drum_step(
        &mut self,
        bar_index: usize,
        track: DrumTrack,
        step: usize,
        active: bool,
    ) -> Result<(), TimelineError> {
        if bar_index >= MAX_PATTERN_BARS {
            return Err(TimelineError::BarOutOfRange(bar_index));
        }
        self.drum_patterns
            .entry(bar_index)
            .or_default()
            .set_step(track, step, active)
    }

    /// Melody notes of one bar (empty slice if none)
    pub fn melody_notes(&self, bar_index: usize) -> &[MelodyNote] {
        self.channel2_notes
            .get(&bar_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Add a melody note, keeping the bar sorted by start
    pub fn add_melody_note(
        &mut self,
        bar_index: usize,
        note: MelodyNote,
    ) -> Result<(), TimelineError> {
        if bar_index >= MAX_PATTERN_BARS {
            return Err(TimelineError::BarOutOfRange(bar_index));
        }
        note.validate()?;

        let notes = self.channel2_notes.entry(bar_index).or_default();
        let insert_pos = notes
            .iter()
            .position(|n| n.start > note.start)
            .unwrap_or(notes.len());
        notes.insert(insert_pos, note);
        Ok(())
    }

    /// Whether the melody lane holds any note
    pub fn has_melody(&self) -> bool {
        self.channel2_notes.values().any(|notes| !notes.is_empty())
    }

    pub fn clear_melody(&mut self) {
        self.channel2_notes.clear();
    }

    /// Check every invariant of the pattern's data
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.progression.len() > MAX_PATTERN_BARS {
            return Err(TimelineError::TooManyBars(self.progression.len()));
        }
        for bar in &self.progression {
            for chord in &bar.chords {
                if chord.midi_notes().is_empty() {
                    return Err(TimelineError::EmptyChord);
                }
                if let Some(&pitch) = chord.midi_notes().iter().find(|&&p| p > 127) {
                    return Err(TimelineError::MidiOutOfRange(pitch as u32));
                }
            }
        }
        for (&bar_index, notes) in &self.channel2_notes {
            if bar_index >= MAX_PATTERN_BARS {
                return Err(TimelineError::BarOutOfRange(bar_index));
            }
            for note in notes {
                note.validate()?;
            }
        }
        if let Some(&bar_index) = self.drum_patterns.keys().find(|&&b| b >= MAX_PATTERN_BARS) {
            return Err(TimelineError::BarOutOfRange(bar_index));
        }
        Ok(())
    }
}

/// The lanes a pattern exports to MIDI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Chords,
    Melody,
    Drums,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Chords, Lane::Melody, Lane::Drums];

    /// Prefix used in exported file names
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Lane::Chords => "channel1",
            Lane::Melody => "channel2",
            Lane::Drums => "drums",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.file_prefix())
    }
}

/// The 16 pattern slots
///
/// Patterns are held behind `Arc` so that chaining and export snapshots
/// share data instead of copying it.
#[derive(Debug, Clone, Default)]
pub struct PatternBank {
    slots: BTreeMap<PatternName, Arc<Pattern>>,
}

impl PatternBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pattern in a slot, replacing what was there
    pub fn store(&mut self, name: PatternName, pattern: Pattern) {
        self.slots.insert(name, Arc::new(pattern));
    }

    /// Store an already shared pattern
    pub fn store_shared(&mut self, name: PatternName, pattern: Arc<Pattern>) {
        self.slots.insert(name, pattern);
    }

    pub fn get(&self, name: PatternName) -> Option<Arc<Pattern>> {
        self.slots.get(&name).cloned()
    }

    pub fn remove(&mut self, name: PatternName) -> Option<Arc<Pattern>> {
        self.slots.remove(&name)
    }

    /// Whether a slot holds a pattern with a chord progression
    pub fn is_filled(&self, name: PatternName) -> bool {
        self.slots.get(&name).is_some_and(|p| p.is_filled())
    }

    /// Filled slots in chaining order
    pub fn filled(&self) -> Vec<PatternName> {
        PatternName::ALL
            .iter()
            .copied()
            .filter(|name| self.is_filled(*name))
            .collect()
    }

    /// All stored slots in chaining order
    pub fn iter(&self) -> impl Iterator<Item = (PatternName, &Arc<Pattern>)> {
        self.slots.iter().map(|(name, pattern)| (*name, pattern))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
