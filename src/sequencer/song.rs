// Song - The live timeline data model
// Active pattern, pattern bank, tempo, loop region and playback flags

use crate::sequencer::pattern::{DrumTrack, Pattern, PatternBank};
use crate::sequencer::timeline::{
    DEFAULT_MAX_LOOP_BARS, LoopRange, MAX_PATTERN_BARS, PatternName, Tempo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Playback flags consulted by the chaining resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackFlags {
    pub loop_enabled: bool,
    pub chain_patterns: bool,
    pub song_mode: bool,
    pub loop_chain: bool,
}

impl Default for PlaybackFlags {
    fn default() -> Self {
        Self {
            loop_enabled: true,
            chain_patterns: false,
            song_mode: false,
            loop_chain: false,
        }
    }
}

/// The timeline being edited and played
///
/// The active pattern is held behind an `Arc` and is only ever replaced as a
/// whole. A reader holding the previous `Arc` keeps seeing a complete pattern.
#[derive(Debug, Clone)]
pub struct Song {
    active: Arc<Pattern>,
    current_pattern: PatternName,
    patterns: PatternBank,
    bpm: Tempo,
    /// Loop as requested; clamped to the active progression when read
    loop_range: LoopRange,
    max_loop_bars: usize,
    pub flags: PlaybackFlags,
    muted_drums: BTreeSet<DrumTrack>,
}

impl Song {
    /// Create an empty song at the given tempo, editing slot A1
    pub fn new(bpm: Tempo) -> Self {
        Self {
            active: Arc::new(Pattern::new()),
            current_pattern: PatternName::A1,
            patterns: PatternBank::new(),
            bpm,
            loop_range: LoopRange::default(),
            max_loop_bars: DEFAULT_MAX_LOOP_BARS,
            flags: PlaybackFlags::default(),
            muted_drums: BTreeSet::new(),
        }
    }

    /// Create a song whose active slot holds `pattern`
    pub fn with_pattern(bpm: Tempo, name: PatternName, pattern: Pattern) -> Self {
        let mut song = Self::new(bpm);
        song.swap_active(name, Arc::new(pattern));
        song
    }

    /// Shared handle to the active pattern
    pub fn active_pattern(&self) -> Arc<Pattern> {
        Arc::clone(&self.active)
    }

    /// Borrow the active pattern
    pub fn active(&self) -> &Pattern {
        &self.active
    }

    pub fn current_pattern(&self) -> PatternName {
        self.current_pattern
    }

    pub fn patterns(&self) -> &PatternBank {
        &self.patterns
    }

    /// Number of bars in the active progression
    pub fn bar_count(&self) -> usize {
        self.active.bar_count()
    }

    /// Replace the active pattern by reference and write it back to its slot
    pub fn swap_active(&mut self, name: PatternName, pattern: Arc<Pattern>) {
        self.patterns.store_shared(name, Arc::clone(&pattern));
        self.active = pattern;
        self.current_pattern = name;
    }

    /// Edit the active pattern
    ///
    /// Copies on write when a reader still holds the current `Arc`, then
    /// stores the result in the bank.
    pub fn edit_active<R>(&mut self, edit: impl FnOnce(&mut Pattern) -> R) -> R {
        let result = edit(Arc::make_mut(&mut self.active));
        self.patterns
            .store_shared(self.current_pattern, Arc::clone(&self.active));
        result
    }

    /// Store a pattern in any slot; storing into the current slot also activates it
    pub fn store_pattern(&mut self, name: PatternName, pattern: Pattern) {
        if name == self.current_pattern {
            self.swap_active(name, Arc::new(pattern));
        } else {
            self.patterns.store(name, pattern);
        }
    }

    /// Switch editing to another slot (an empty pattern if the slot is unused)
    pub fn select_pattern(&mut self, name: PatternName) {
        let pattern = self
            .patterns
            .get(name)
            .unwrap_or_else(|| Arc::new(Pattern::new()));
        self.swap_active(name, pattern);
    }

    pub fn bpm(&self) -> Tempo {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: Tempo) {
        self.bpm = bpm;
    }

    /// Loop region clamped to the active progression
    ///
    /// A loop set on a long pattern survives a swap to a shorter one and
    /// applies again in full after swapping back.
    pub fn loop_range(&self) -> LoopRange {
        self.loop_range.reclamp(self.bar_count(), self.max_loop_bars)
    }

    /// Loop region as last set, before clamping to the active progression
    pub fn requested_loop(&self) -> LoopRange {
        self.loop_range
    }

    /// Set the loop region; returns it as clamped to the active progression
    pub fn set_loop(&mut self, start: usize, end: usize) -> LoopRange {
        self.loop_range = LoopRange::clamped(start, end, MAX_PATTERN_BARS, self.max_loop_bars);
        self.loop_range()
    }

    pub fn max_loop_bars(&self) -> usize {
        self.max_loop_bars
    }

    pub fn set_max_loop_bars(&mut self, max_loop_bars: usize) {
        self.max_loop_bars = max_loop_bars.max(1);
        self.loop_range = self.loop_range.reclamp(MAX_PATTERN_BARS, self.max_loop_bars);
    }

    pub fn is_drum_muted(&self, track: DrumTrack) -> bool {
        self.muted_drums.contains(&track)
    }

    pub fn set_drum_muted(&mut self, track: DrumTrack, muted: bool) {
        if muted {
            self.muted_drums.insert(track);
        } else {
            self.muted_drums.remove(&track);
        }
    }

    /// Frozen view for export, safe to read while playback goes on
    pub fn snapshot(&self) -> SongSnapshot {
        let mut patterns: Vec<(PatternName, Arc<Pattern>)> = self
            .patterns
            .iter()
            .filter(|(name, _)| *name != self.current_pattern)
            .map(|(name, pattern)| (name, Arc::clone(pattern)))
            .collect();
        patterns.push((self.current_pattern, Arc::clone(&self.active)));
        patterns.sort_by_key(|(name, _)| *name);

        SongSnapshot {
            bpm: self.bpm,
            current_pattern: self.current_pattern,
            patterns,
        }
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new(Tempo::default())
    }
}

/// Immutable copy of the song as seen at one instant
#[derive(Debug, Clone)]
pub struct SongSnapshot {
    pub bpm: Tempo,
    pub current_pattern: PatternName,
    /// Stored patterns in chaining order
    pub patterns: Vec<(PatternName, Arc<Pattern>)>,
}

impl SongSnapshot {
    pub fn pattern(&self, name: PatternName) -> Option<&Pattern> {
        self.patterns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, pattern)| pattern.as_ref())
    }

    /// Filled patterns in chaining order
    pub fn filled_patterns(&self) -> impl Iterator<Item = (PatternName, &Pattern)> {
        self.patterns
            .iter()
            .filter(|(_, pattern)| pattern.is_filled())
            .map(|(name, pattern)| (*name, pattern.as_ref()))
    }
}
