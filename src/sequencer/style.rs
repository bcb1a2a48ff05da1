// Style mode - Performance styles for the melody lane
// Comping, arpeggio, voicing and stab figures played over each bar's chord

use crate::sequencer::follow::MelodyGenerator;
use crate::sequencer::note::MelodyNote;
use crate::sequencer::pattern::Channel2Settings;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Performance style applied to every bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MelodyStyle {
    #[default]
    PopComping,
    TechnoArp,
    JazzVoicings,
    PianoBallad,
    EdmPlucks,
    FunkStabs,
}

impl MelodyStyle {
    pub const ALL: [MelodyStyle; 6] = [
        MelodyStyle::PopComping,
        MelodyStyle::TechnoArp,
        MelodyStyle::JazzVoicings,
        MelodyStyle::PianoBallad,
        MelodyStyle::EdmPlucks,
        MelodyStyle::FunkStabs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MelodyStyle::PopComping => "Pop Comping",
            MelodyStyle::TechnoArp => "Techno Arp",
            MelodyStyle::JazzVoicings => "Jazz Voicings",
            MelodyStyle::PianoBallad => "Piano Ballad",
            MelodyStyle::EdmPlucks => "EDM Plucks",
            MelodyStyle::FunkStabs => "Funk Stabs",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MelodyStyle::PopComping => "Block chords on beats 1 and 3 with fills on 2 and 4",
            MelodyStyle::TechnoArp => "Sixteenth-note arpeggio accented on the beat",
            MelodyStyle::JazzVoicings => "Rootless voicings on syncopated hits",
            MelodyStyle::PianoBallad => "Up and down arpeggio with overlapping notes",
            MelodyStyle::EdmPlucks => "Off-beat plucks an octave up",
            MelodyStyle::FunkStabs => "Short chord stabs with ghost notes",
        }
    }
}

impl fmt::Display for MelodyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Raw note in beats before range checks: (pitch, start, duration, velocity)
type Hits = Vec<(i16, f64, f64, i16)>;

const BEATS_PER_BAR: f64 = 4.0;

/// Generator for the melody lane in style mode
///
/// `variation` (0..=100) is the chance of optional fills, ghost notes and
/// off-beat hits.
pub struct StyleGenerator {
    rng: StdRng,
}

impl StyleGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Roll against the variation percentage
    fn varies(&mut self, variation: u8) -> bool {
        self.rng.gen_range(0..100) < variation.min(100)
    }

    fn pick(&mut self, tones: &[i16]) -> i16 {
        tones[self.rng.gen_range(0..tones.len())]
    }

    fn pop_comping(&mut self, tones: &[i16], variation: u8) -> Hits {
        let mut hits: Hits = [0.0, 2.0]
            .iter()
            .flat_map(|&beat| {
                tones
                    .iter()
                    .enumerate()
                    .map(move |(i, &pitch)| (pitch, beat, 0.4, 85 - i as i16 * 5))
            })
            .collect();
        if self.varies(variation) {
            for beat in [1.0, 3.0] {
                let pitch = self.pick(tones) + 12;
                hits.push((pitch, beat, 0.2, 75));
            }
        }
        hits
    }

    fn techno_arp(&mut self, tones: &[i16], variation: u8) -> Hits {
        let mut hits = Hits::new();
        for i in 0..16 {
            let accent = i % 4 == 0;
            if !accent && !self.varies(variation) {
                continue;
            }
            let velocity = if accent { 95 } else { 70 };
            hits.push((tones[i % tones.len()], i as f64 * 0.25, 0.2, velocity));
        }
        hits
    }

    fn jazz_voicings(&mut self, tones: &[i16], variation: u8) -> Hits {
        let voicing = if tones.len() > 2 { &tones[1..] } else { tones };
        let mut hits = Hits::new();
        for (index, position) in [0.0, 1.5, 2.5, 3.75].into_iter().enumerate() {
            if index > 0 && !self.varies(variation) {
                continue;
            }
            for (voice, &pitch) in voicing.iter().enumerate() {
                hits.push((pitch, position, 0.3, 80 - voice as i16 * 5));
            }
        }
        hits
    }

    fn piano_ballad(&mut self, tones: &[i16]) -> Hits {
        let figure: Vec<i16> = tones.iter().chain(tones.iter().rev()).copied().collect();
        let step = BEATS_PER_BAR / figure.len() as f64;
        figure
            .into_iter()
            .enumerate()
            .map(|(i, pitch)| {
                let velocity = 75 + self.rng.gen_range(0..10);
                (pitch, i as f64 * step, step * 1.5, velocity)
            })
            .collect()
    }

    fn edm_plucks(&mut self, tones: &[i16], variation: u8) -> Hits {
        let mut hits = Hits::new();
        for position in [0.5, 1.0, 1.5, 2.5, 3.0, 3.5] {
            let pitch = self.pick(tones) + 12;
            if self.varies(variation) {
                hits.push((pitch, position, 0.15, 90));
            }
        }
        hits
    }

    fn funk_stabs(&mut self, tones: &[i16], variation: u8) -> Hits {
        let mut hits: Hits = [0.0, 2.75]
            .iter()
            .flat_map(|&position| {
                tones
                    .iter()
                    .enumerate()
                    .map(move |(i, &pitch)| (pitch, position, 0.1, 95 - i as i16 * 5))
            })
            .collect();
        if self.varies(variation) {
            for beat in [1.0, 2.0, 3.0] {
                hits.push((tones[0], beat + 0.25, 0.05, 50));
            }
        }
        hits
    }
}

impl Default for StyleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MelodyGenerator for StyleGenerator {
    fn generate_bar(&mut self, chord_tones: &[u8], settings: &Channel2Settings) -> Vec<MelodyNote> {
        let mut tones: Vec<u8> = chord_tones.to_vec();
        tones.sort_unstable();
        tones.dedup();
        if tones.is_empty() {
            return Vec::new();
        }

        let shift = settings.octave.clamp(-2, 2) as i16 * 12;
        let shifted: Vec<i16> = tones.iter().map(|&t| t as i16 + shift).collect();
        let variation = settings.variation;

        let hits = match settings.style {
            MelodyStyle::PopComping => self.pop_comping(&shifted, variation),
            MelodyStyle::TechnoArp => self.techno_arp(&shifted, variation),
            MelodyStyle::JazzVoicings => self.jazz_voicings(&shifted, variation),
            MelodyStyle::PianoBallad => self.piano_ballad(&shifted),
            MelodyStyle::EdmPlucks => self.edm_plucks(&shifted, variation),
            MelodyStyle::FunkStabs => self.funk_stabs(&shifted, variation),
        };

        hits.into_iter()
            .filter(|(pitch, ..)| (0..=127).contains(pitch))
            .map(|(pitch, start, duration, velocity)| MelodyNote {
                midi: pitch as u8,
                start: start / BEATS_PER_BAR,
                duration: duration / BEATS_PER_BAR,
                velocity: Some(velocity.clamp(1, 127) as u8),
            })
            .collect()
    }
}
