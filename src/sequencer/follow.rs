// Follow mode - Generate melody-lane notes from the chord lane
// Broken chords, arpeggios, Alberti bass, block chords and waltz figures

use crate::sequencer::note::MelodyNote;
use crate::sequencer::pattern::{Channel2Mode, Channel2Settings, Pattern};
use crate::sequencer::style::StyleGenerator;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Figure used to turn a chord into a bar of melody
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowPattern {
    #[default]
    BrokenChord,
    ArpeggioUp,
    ArpeggioDown,
    Alberti,
    Block,
    Waltz,
}

impl FollowPattern {
    pub const ALL: [FollowPattern; 6] = [
        FollowPattern::BrokenChord,
        FollowPattern::ArpeggioUp,
        FollowPattern::ArpeggioDown,
        FollowPattern::Alberti,
        FollowPattern::Block,
        FollowPattern::Waltz,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FollowPattern::BrokenChord => "Broken Chord",
            FollowPattern::ArpeggioUp => "Arpeggio Up",
            FollowPattern::ArpeggioDown => "Arpeggio Down",
            FollowPattern::Alberti => "Alberti Bass",
            FollowPattern::Block => "Block Chord",
            FollowPattern::Waltz => "Waltz Bass",
        }
    }
}

impl fmt::Display for FollowPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces one bar of melody for a chord
pub trait MelodyGenerator {
    /// Notes for one bar, in bar fractions
    fn generate_bar(&mut self, chord_tones: &[u8], settings: &Channel2Settings) -> Vec<MelodyNote>;
}

/// Rule-based generator following the chord lane
pub struct FollowGenerator {
    rng: StdRng,
}

impl FollowGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic humanization
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for FollowGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw note before range checks: (pitch, start, duration, velocity)
type Figure = Vec<(i16, f64, f64, i16)>;

fn broken_chord(tones: &[i16], velocity: i16) -> Figure {
    // C-E-G-C: the chord tones, then the root again
    let count = (tones.len() + 1).min(4);
    let length = 1.0 / count as f64;
    (0..count)
        .map(|i| {
            let pitch = if i < tones.len() { tones[i] } else { tones[0] };
            (pitch, i as f64 * length, length * 0.9, velocity)
        })
        .collect()
}

fn arpeggio(tones: &[i16], velocity: i16) -> Figure {
    const NOTES_PER_BAR: usize = 8;
    let length = 1.0 / NOTES_PER_BAR as f64;
    (0..NOTES_PER_BAR)
        .map(|i| {
            (
                tones[i % tones.len()],
                i as f64 * length,
                length * 0.8,
                velocity - (i % 4) as i16 * 5,
            )
        })
        .collect()
}

fn alberti(tones: &[i16], velocity: i16) -> Figure {
    if tones.len() < 3 {
        return broken_chord(tones, velocity);
    }
    let top = tones[tones.len() - 1];
    [tones[0], top, tones[1], top]
        .iter()
        .enumerate()
        .map(|(i, &pitch)| (pitch, i as f64 * 0.25, 0.25 * 0.9, velocity))
        .collect()
}

fn block(tones: &[i16], velocity: i16) -> Figure {
    tones
        .iter()
        .enumerate()
        .map(|(i, &pitch)| (pitch, 0.0, 0.95, velocity - i as i16 * 3))
        .collect()
}

fn waltz(tones: &[i16], velocity: i16) -> Figure {
    let beat = 1.0 / 3.0;
    let mut figure = vec![(tones[0], 0.0, beat * 0.9, velocity + 10)];
    for beat_index in 1..3 {
        for (i, &pitch) in tones[1..].iter().enumerate() {
            figure.push((
                pitch,
                beat_index as f64 * beat,
                beat * 0.8,
                velocity - 10 - i as i16 * 3,
            ));
        }
    }
    figure
}

impl MelodyGenerator for FollowGenerator {
    fn generate_bar(&mut self, chord_tones: &[u8], settings: &Channel2Settings) -> Vec<MelodyNote> {
        let mut tones: Vec<u8> = chord_tones.to_vec();
        tones.sort_unstable();
        tones.dedup();
        if tones.is_empty() {
            return Vec::new();
        }

        let shift = settings.octave.clamp(-2, 2) as i16 * 12;
        let shifted: Vec<i16> = tones.iter().map(|&t| t as i16 + shift).collect();
        let velocity = settings.velocity as i16;

        let figure = match settings.follow_pattern {
            FollowPattern::BrokenChord => broken_chord(&shifted, velocity),
            FollowPattern::ArpeggioUp => arpeggio(&shifted, velocity),
            FollowPattern::ArpeggioDown => {
                let reversed: Vec<i16> = shifted.iter().rev().copied().collect();
                arpeggio(&reversed, velocity)
            }
            FollowPattern::Alberti => alberti(&shifted, velocity),
            FollowPattern::Block => block(&shifted, velocity),
            FollowPattern::Waltz => waltz(&shifted, velocity),
        };

        let humanize = settings.humanize.max(0.0);
        figure
            .into_iter()
            .filter(|(pitch, ..)| (0..=127).contains(pitch))
            .map(|(pitch, start, duration, velocity)| {
                let start = if humanize > 0.0 {
                    let offset = (self.rng.gen_range(0.0..1.0) - 0.5) * humanize;
                    (start + offset).clamp(0.0, 0.999)
                } else {
                    start
                };
                MelodyNote {
                    midi: pitch as u8,
                    start,
                    duration,
                    velocity: Some(velocity.clamp(1, 127) as u8),
                }
            })
            .collect()
    }
}

/// Fill the melody lane of a pattern from its chords
///
/// Each bar follows its first chord. Bars without chords are skipped.
/// Returns the number of bars generated.
pub fn regenerate_melody(pattern: &mut Pattern, generator: &mut dyn MelodyGenerator) -> usize {
    pattern.clear_melody();

    let mut generated = 0;
    for bar_index in 0..pattern.bar_count() {
        let tones: Vec<u8> = match pattern.bar(bar_index).and_then(|bar| bar.chords.first()) {
            Some(chord) => chord.midi_notes().to_vec(),
            None => {
                log::warn!("Bar {} has no chord tones, skipping melody generation", bar_index + 1);
                continue;
            }
        };

        let notes = generator.generate_bar(&tones, &pattern.channel2_settings);
        if !notes.is_empty() {
            pattern.channel2_notes.insert(bar_index, notes);
            generated += 1;
        }
    }

    log::debug!("Generated melody for {} bars", generated);
    generated
}

/// One generator per melody-lane mode
pub struct MelodyGenerators {
    follow: Box<dyn MelodyGenerator>,
    style: Box<dyn MelodyGenerator>,
}

impl MelodyGenerators {
    pub fn new() -> Self {
        Self {
            follow: Box::new(FollowGenerator::new()),
            style: Box::new(StyleGenerator::new()),
        }
    }

    /// Deterministic generators for both modes
    pub fn with_seed(seed: u64) -> Self {
        Self {
            follow: Box::new(FollowGenerator::with_seed(seed)),
            style: Box::new(StyleGenerator::with_seed(seed.wrapping_add(1))),
        }
    }

    pub fn with_follow(mut self, generator: Box<dyn MelodyGenerator>) -> Self {
        self.follow = generator;
        self
    }

    pub fn with_style(mut self, generator: Box<dyn MelodyGenerator>) -> Self {
        self.style = generator;
        self
    }

    /// Generator used to fill an empty melody lane in `mode`
    ///
    /// Direct mode has no generator of its own and falls back to following
    /// the chords.
    pub fn for_mode(&mut self, mode: Channel2Mode) -> &mut dyn MelodyGenerator {
        match mode {
            Channel2Mode::Direct | Channel2Mode::Follow => self.follow.as_mut(),
            Channel2Mode::Style => self.style.as_mut(),
        }
    }

    /// Regenerate the melody lane with the generator for the pattern's mode
    pub fn regenerate(&mut self, pattern: &mut Pattern) -> usize {
        let mode = pattern.channel2_settings.mode;
        log::debug!("Regenerating melody in {:?} mode", mode);
        regenerate_melody(pattern, self.for_mode(mode))
    }
}

impl Default for MelodyGenerators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::Chord;
    use crate::sequencer::pattern::Bar;
    use crate::sequencer::style::MelodyStyle;

    fn settings(pattern: FollowPattern) -> Channel2Settings {
        Channel2Settings {
            follow_pattern: pattern,
            humanize: 0.0,
            ..Channel2Settings::default()
        }
    }

    fn pitches(notes: &[MelodyNote]) -> Vec<u8> {
        notes.iter().map(|n| n.midi).collect()
    }

    #[test]
    fn test_broken_chord() {
        let mut generator = FollowGenerator::with_seed(0);
        let notes = generator.generate_bar(&[64, 60, 67], &settings(FollowPattern::BrokenChord));
        assert_eq!(pitches(&notes), vec![60, 64, 67, 60]);
        assert_eq!(notes[1].start, 0.25);
        assert!((notes[0].duration - 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_arpeggio_directions() {
        let mut generator = FollowGenerator::with_seed(0);
        let up = generator.generate_bar(&[60, 64, 67], &settings(FollowPattern::ArpeggioUp));
        assert_eq!(pitches(&up), vec![60, 64, 67, 60, 64, 67, 60, 64]);
        assert_eq!(up[3].velocity, Some(65));

        let down = generator.generate_bar(&[60, 64, 67], &settings(FollowPattern::ArpeggioDown));
        assert_eq!(&pitches(&down)[..4], &[67, 64, 60, 67]);
    }

    #[test]
    fn test_alberti_and_fallback() {
        let mut generator = FollowGenerator::with_seed(0);
        let notes = generator.generate_bar(&[60, 64, 67], &settings(FollowPattern::Alberti));
        assert_eq!(pitches(&notes), vec![60, 67, 64, 67]);

        // Fewer than three tones falls back to a broken chord
        let notes = generator.generate_bar(&[60, 67], &settings(FollowPattern::Alberti));
        assert_eq!(pitches(&notes), vec![60, 67, 60]);
    }

    #[test]
    fn test_block_and_waltz() {
        let mut generator = FollowGenerator::with_seed(0);
        let block = generator.generate_bar(&[60, 64, 67], &settings(FollowPattern::Block));
        assert!(block.iter().all(|n| n.start == 0.0));
        assert_eq!(block[2].velocity, Some(74));

        let waltz = generator.generate_bar(&[60, 64, 67], &settings(FollowPattern::Waltz));
        assert_eq!(pitches(&waltz), vec![60, 64, 67, 64, 67]);
        assert_eq!(waltz[0].velocity, Some(90));
    }

    #[test]
    fn test_octave_shift_and_range() {
        let mut generator = FollowGenerator::with_seed(0);
        let shifted = Channel2Settings {
            octave: 1,
            ..settings(FollowPattern::Block)
        };
        let notes = generator.generate_bar(&[60, 64], &shifted);
        assert_eq!(pitches(&notes), vec![72, 76]);

        let high = Channel2Settings {
            octave: 2,
            ..settings(FollowPattern::Block)
        };
        let notes = generator.generate_bar(&[100, 110], &high);
        assert_eq!(pitches(&notes), vec![124]);
    }

    #[test]
    fn test_humanize_stays_in_bar() {
        let mut generator = FollowGenerator::with_seed(42);
        let humanized = Channel2Settings {
            humanize: 0.2,
            ..settings(FollowPattern::ArpeggioUp)
        };
        for _ in 0..50 {
            let notes = generator.generate_bar(&[60, 64, 67], &humanized);
            assert!(notes.iter().all(|n| n.validate().is_ok()));
        }
    }

    #[test]
    fn test_regenerate_skips_bars_without_chords() {
        let chord = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        let mut pattern = Pattern::with_progression(vec![
            Bar::new(1, vec![chord.clone()]),
            Bar::new(2, Vec::new()),
            Bar::new(3, vec![chord]),
        ])
        .unwrap();
        pattern.channel2_settings = settings(FollowPattern::BrokenChord);

        let mut generator = FollowGenerator::with_seed(0);
        assert_eq!(regenerate_melody(&mut pattern, &mut generator), 2);
        assert_eq!(pattern.melody_notes(0).len(), 4);
        assert!(pattern.melody_notes(1).is_empty());
        assert_eq!(pattern.melody_notes(2).len(), 4);
    }

    #[test]
    fn test_generators_dispatch_on_mode() {
        let chord = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        let mut pattern = Pattern::with_progression(vec![Bar::new(1, vec![chord])]).unwrap();
        pattern.channel2_settings = settings(FollowPattern::Alberti);
        let mut generators = MelodyGenerators::with_seed(0);

        pattern.channel2_settings.mode = Channel2Mode::Follow;
        assert_eq!(generators.regenerate(&mut pattern), 1);
        assert_eq!(pitches(pattern.melody_notes(0)), vec![60, 67, 64, 67]);

        // Funk stabs: two three-note stabs, no ghost notes at zero variation
        pattern.channel2_settings.mode = Channel2Mode::Style;
        pattern.channel2_settings.style = MelodyStyle::FunkStabs;
        pattern.channel2_settings.variation = 0;
        assert_eq!(generators.regenerate(&mut pattern), 1);
        let notes = pattern.melody_notes(0);
        assert_eq!(notes.len(), 6);
        assert_eq!(notes[3].start, 0.6875);

        pattern.channel2_settings.mode = Channel2Mode::Direct;
        generators.regenerate(&mut pattern);
        assert_eq!(pitches(pattern.melody_notes(0)), vec![60, 67, 64, 67]);
    }
}
