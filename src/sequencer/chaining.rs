// Chaining - Decide what happens when playback reaches the end of a bar
// Continue, loop back, chain into the next filled pattern, or stop

use crate::sequencer::pattern::PatternBank;
use crate::sequencer::song::PlaybackFlags;
use crate::sequencer::timeline::{LoopRange, PatternName};

/// What the transport does after a bar finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAction {
    /// Play the next bar of the current pattern
    Continue,
    /// Jump back to a 0-indexed bar (the loop start)
    Loop { bar: usize },
    /// Swap in another pattern and restart at bar 0
    Chain { target: PatternName },
    Stop,
}

/// Everything the resolver looks at
#[derive(Debug, Clone, Copy)]
pub struct ChainInput<'a> {
    /// Bar index after advancing past the finished bar
    pub current_bar: usize,
    pub loop_range: LoopRange,
    pub progression_len: usize,
    pub flags: PlaybackFlags,
    pub patterns: &'a PatternBank,
    pub current_pattern: PatternName,
}

/// Next filled slot after `current`, in A1..D4 order with wrap-around
///
/// The search visits `current` last, so a single filled pattern chains to itself.
pub fn next_filled_pattern(patterns: &PatternBank, current: PatternName) -> Option<PatternName> {
    current.cycle_from().find(|name| patterns.is_filled(*name))
}

/// Resolve the action taken at a bar boundary
pub fn resolve(input: &ChainInput<'_>) -> ChainAction {
    let limit = input.loop_range.end.min(input.progression_len);
    if input.current_bar < limit {
        return ChainAction::Continue;
    }

    if input.flags.chain_patterns && !input.flags.song_mode {
        match next_filled_pattern(input.patterns, input.current_pattern) {
            Some(target) => return ChainAction::Chain { target },
            None if !input.flags.loop_chain => return ChainAction::Stop,
            None => {}
        }
    }

    if input.flags.loop_enabled {
        ChainAction::Loop {
            bar: input.loop_range.start_index(),
        }
    } else {
        ChainAction::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::Chord;
    use crate::sequencer::pattern::{Bar, Pattern};

    fn filled() -> Pattern {
        let chord = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        Pattern::with_progression(vec![Bar::new(1, vec![chord])]).unwrap()
    }

    fn bank(names: &[PatternName]) -> PatternBank {
        let mut bank = PatternBank::new();
        for name in names {
            bank.store(*name, filled());
        }
        bank
    }

    fn input<'a>(
        current_bar: usize,
        flags: PlaybackFlags,
        patterns: &'a PatternBank,
        current_pattern: PatternName,
    ) -> ChainInput<'a> {
        ChainInput {
            current_bar,
            loop_range: LoopRange::new(2, 4).unwrap(),
            progression_len: 4,
            flags,
            patterns,
            current_pattern,
        }
    }

    #[test]
    fn test_continue_inside_loop() {
        let bank = PatternBank::new();
        let flags = PlaybackFlags::default();
        assert_eq!(
            resolve(&input(3, flags, &bank, PatternName::A1)),
            ChainAction::Continue
        );
    }

    #[test]
    fn test_loop_back_to_start() {
        let bank = PatternBank::new();
        let flags = PlaybackFlags::default();
        assert_eq!(
            resolve(&input(4, flags, &bank, PatternName::A1)),
            ChainAction::Loop { bar: 1 }
        );
    }

    #[test]
    fn test_loop_end_beyond_progression() {
        let bank = PatternBank::new();
        let mut chain_input = input(2, PlaybackFlags::default(), &bank, PatternName::A1);
        chain_input.progression_len = 2;
        chain_input.loop_range = LoopRange::new(1, 8).unwrap();
        assert_eq!(resolve(&chain_input), ChainAction::Loop { bar: 0 });
    }

    #[test]
    fn test_stop_without_loop() {
        let bank = PatternBank::new();
        let flags = PlaybackFlags {
            loop_enabled: false,
            ..PlaybackFlags::default()
        };
        assert_eq!(
            resolve(&input(4, flags, &bank, PatternName::A1)),
            ChainAction::Stop
        );
    }

    #[test]
    fn test_chain_to_next_filled() {
        let bank = bank(&[PatternName::A1, PatternName::B3]);
        let flags = PlaybackFlags {
            chain_patterns: true,
            ..PlaybackFlags::default()
        };
        assert_eq!(
            resolve(&input(4, flags, &bank, PatternName::A1)),
            ChainAction::Chain {
                target: PatternName::B3
            }
        );
        // Wraps around from the last filled slot
        assert_eq!(
            resolve(&input(4, flags, &bank, PatternName::B3)),
            ChainAction::Chain {
                target: PatternName::A1
            }
        );
    }

    #[test]
    fn test_song_mode_disables_chaining() {
        let bank = bank(&[PatternName::A1, PatternName::A2]);
        let flags = PlaybackFlags {
            chain_patterns: true,
            song_mode: true,
            ..PlaybackFlags::default()
        };
        assert_eq!(
            resolve(&input(4, flags, &bank, PatternName::A1)),
            ChainAction::Loop { bar: 1 }
        );
    }

    #[test]
    fn test_no_filled_pattern_falls_back_on_loop_chain() {
        let bank = PatternBank::new();
        let stop_flags = PlaybackFlags {
            chain_patterns: true,
            loop_chain: false,
            ..PlaybackFlags::default()
        };
        assert_eq!(
            resolve(&input(4, stop_flags, &bank, PatternName::A1)),
            ChainAction::Stop
        );

        let loop_flags = PlaybackFlags {
            loop_chain: true,
            ..stop_flags
        };
        assert_eq!(
            resolve(&input(4, loop_flags, &bank, PatternName::A1)),
            ChainAction::Loop { bar: 1 }
        );
    }

    #[test]
    fn test_single_filled_pattern_chains_to_itself() {
        let bank = bank(&[PatternName::C2]);
        assert_eq!(next_filled_pattern(&bank, PatternName::C2), Some(PatternName::C2));
    }

    #[test]
    fn test_chain_cycle_visits_every_filled_pattern_once() {
        let names = [
            PatternName::A2,
            PatternName::B1,
            PatternName::C4,
            PatternName::D1,
        ];
        let bank = bank(&names);

        for start in names {
            let mut visited = Vec::new();
            let mut current = start;
            loop {
                current = next_filled_pattern(&bank, current).unwrap();
                visited.push(current);
                if current == start {
                    break;
                }
            }
            assert_eq!(visited.len(), names.len());
            let mut sorted = visited.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), names.len());
        }
    }
}
