// Timeline - Musical time representation
// Tempo, tick resolution, pattern slots and loop ranges for a 4/4 timeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Beats in one bar (the timeline is fixed to 4/4)
pub const BEATS_PER_BAR: u32 = 4;

/// Drum steps in one bar
pub const STEPS_PER_BAR: usize = 16;

/// Bars in one pattern
pub const MAX_PATTERN_BARS: usize = 8;

/// Default upper bound for the loop length in bars
pub const DEFAULT_MAX_LOOP_BARS: usize = 8;

/// Errors raised when timeline data would break an invariant
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimelineError {
    #[error("Chord must contain at least one note")]
    EmptyChord,

    #[error("MIDI value {0} is out of range (0-127)")]
    MidiOutOfRange(u32),

    #[error("Invalid melody note: {0}")]
    InvalidMelodyNote(String),

    #[error("Invalid loop range {start}..{end}")]
    InvalidLoop { start: usize, end: usize },

    #[error("Pattern holds {0} bars, the maximum is {MAX_PATTERN_BARS}")]
    TooManyBars(usize),

    #[error("Bar index {0} is out of range")]
    BarOutOfRange(usize),

    #[error("Step index {0} is out of range (0-15)")]
    StepOutOfRange(usize),

    #[error("Unknown pattern name: {0}")]
    UnknownPattern(String),

    #[error("BPM {0} is out of range (20-999)")]
    InvalidTempo(f64),
}

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Lowest accepted tempo
    pub const MIN_BPM: f64 = 20.0;
    /// Highest accepted tempo
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo, rejecting values outside [20.0, 999.0]
    pub fn new(bpm: f64) -> Result<Self, TimelineError> {
        if !(Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            return Err(TimelineError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one bar in seconds
    pub fn bar_duration_seconds(&self) -> f64 {
        self.beat_duration_seconds() * BEATS_PER_BAR as f64
    }

    /// Duration of one drum step in seconds
    pub fn step_duration_seconds(&self) -> f64 {
        self.bar_duration_seconds() / STEPS_PER_BAR as f64
    }

    /// Tempo as written in a MIDI tempo meta event
    pub fn microseconds_per_quarter(&self) -> u32 {
        (60_000_000.0 / self.bpm).round() as u32
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl TryFrom<f64> for Tempo {
    type Error = TimelineError;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Musical time representation
/// Represents a position in the timeline using bars, beats, and ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MusicalTime {
    pub bar: u32,  // Bar number (1-based)
    pub beat: u8,  // Beat within bar (1-based)
    pub tick: u16, // Tick within beat (0-based)
}

impl MusicalTime {
    /// Ticks per quarter note (PPQN)
    pub const TICKS_PER_QUARTER: u16 = 480;

    /// Ticks in one bar
    pub const TICKS_PER_BAR: u32 = Self::TICKS_PER_QUARTER as u32 * BEATS_PER_BAR;

    /// Ticks in one drum step
    pub const TICKS_PER_STEP: u32 = Self::TICKS_PER_BAR / STEPS_PER_BAR as u32;

    /// Creates a new musical time position
    pub fn new(bar: u32, beat: u8, tick: u16) -> Self {
        Self { bar, beat, tick }
    }

    /// Zero position (bar 1, beat 1, tick 0)
    pub fn zero() -> Self {
        Self::new(1, 1, 0)
    }

    /// Convert to total ticks from start
    pub fn to_total_ticks(&self) -> u64 {
        let bar_0 = self.bar.saturating_sub(1) as u64;
        let beat_0 = self.beat.saturating_sub(1) as u64;

        bar_0 * Self::TICKS_PER_BAR as u64
            + beat_0 * Self::TICKS_PER_QUARTER as u64
            + self.tick as u64
    }

    /// Create from total ticks
    pub fn from_total_ticks(total_ticks: u64) -> Self {
        let ticks_per_beat = Self::TICKS_PER_QUARTER as u64;
        let ticks_per_bar = Self::TICKS_PER_BAR as u64;

        let bar = (total_ticks / ticks_per_bar) + 1; // 1-based
        let remaining_after_bars = total_ticks % ticks_per_bar;
        let beat = (remaining_after_bars / ticks_per_beat) + 1; // 1-based
        let tick = remaining_after_bars % ticks_per_beat;

        Self::new(bar as u32, beat as u8, tick as u16)
    }

    /// Create from elapsed seconds at a given tempo
    pub fn from_seconds(seconds: f64, tempo: &Tempo) -> Self {
        let beats = seconds.max(0.0) / tempo.beat_duration_seconds();
        let total_ticks = (beats * Self::TICKS_PER_QUARTER as f64).round() as u64;
        Self::from_total_ticks(total_ticks)
    }
}

impl Default for MusicalTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for MusicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.bar, self.beat, self.tick)
    }
}

/// One of the 16 fixed pattern slots, in chaining order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PatternName {
    A1,
    A2,
    A3,
    A4,
    B1,
    B2,
    B3,
    B4,
    C1,
    C2,
    C3,
    C4,
    D1,
    D2,
    D3,
    D4,
}

impl PatternName {
    /// All slots in chaining order
    pub const ALL: [PatternName; 16] = [
        PatternName::A1,
        PatternName::A2,
        PatternName::A3,
        PatternName::A4,
        PatternName::B1,
        PatternName::B2,
        PatternName::B3,
        PatternName::B4,
        PatternName::C1,
        PatternName::C2,
        PatternName::C3,
        PatternName::C4,
        PatternName::D1,
        PatternName::D2,
        PatternName::D3,
        PatternName::D4,
    ];

    /// Position in the chaining order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Slot at a position in the chaining order (wraps)
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// The next slot in order, wrapping from D4 back to A1
    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Every slot after this one in order, wrapping, ending with this slot itself
    pub fn cycle_from(&self) -> impl Iterator<Item = PatternName> {
        let start = self.index();
        (1..=Self::ALL.len()).map(move |offset| Self::from_index(start + offset))
    }

    pub fn as_str(&self) -> &'static str {
        const NAMES: [&str; 16] = [
            "A1", "A2", "A3", "A4", "B1", "B2", "B3", "B4", "C1", "C2", "C3", "C4", "D1", "D2",
            "D3", "D4",
        ];
        NAMES[self.index()]
    }
}

impl Default for PatternName {
    fn default() -> Self {
        PatternName::A1
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternName {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| TimelineError::UnknownPattern(s.to_string()))
    }
}

/// Loop region in 1-indexed, inclusive bar numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
}

impl LoopRange {
    /// Creates a loop range, rejecting `start < 1` or `start > end`
    pub fn new(start: usize, end: usize) -> Result<Self, TimelineError> {
        if start < 1 || start > end {
            return Err(TimelineError::InvalidLoop { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a loop range that always satisfies the loop invariants:
    /// both ends inside `[1, bar_count]`, `start <= end` and at most
    /// `max_loop_bars` bars long.
    pub fn clamped(start: usize, end: usize, bar_count: usize, max_loop_bars: usize) -> Self {
        let last = bar_count.max(1);
        let max_len = max_loop_bars.max(1);

        let start = start.clamp(1, last);
        let mut end = end.clamp(start, last);
        if end - start + 1 > max_len {
            end = start + max_len - 1;
        }

        Self { start, end }
    }

    /// Re-apply the invariants after the progression length changed
    pub fn reclamp(&self, bar_count: usize, max_loop_bars: usize) -> Self {
        Self::clamped(self.start, self.end, bar_count, max_loop_bars)
    }

    /// Number of bars in the loop
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    /// A valid loop is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 0-indexed first bar
    pub fn start_index(&self) -> usize {
        self.start - 1
    }

    /// 0-indexed last bar
    pub fn end_index(&self) -> usize {
        self.end - 1
    }

    /// Whether a 0-indexed bar lies inside the loop
    pub fn contains_index(&self, bar_index: usize) -> bool {
        (self.start_index()..=self.end_index()).contains(&bar_index)
    }
}

impl Default for LoopRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: DEFAULT_MAX_LOOP_BARS,
        }
    }
}

impl fmt::Display for LoopRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
