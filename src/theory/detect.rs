// Chord recognition - Name a set of sounding pitches

use crate::sequencer::note::pitch_class_name;
use crate::theory::dictionary::{CHORD_TEMPLATES, ChordTemplate};

/// Confidence reported when nothing matches and the bass note is used
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Minimum fuzzy coverage for a template to be considered
const FUZZY_THRESHOLD: f64 = 0.5;

/// A recognized chord
#[derive(Debug, Clone, PartialEq)]
pub struct ChordMatch {
    /// Root pitch class (0 = C)
    pub root: u8,
    /// Quality suffix, `None` when only the bass note could be named
    pub quality: Option<&'static str>,
    /// Display symbol, with a slash bass for inversions (e.g., "C/E")
    pub symbol: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// 0 = root position, 1 = third in the bass, ...
    pub inversion: usize,
}

/// Intervals of every pitch class above `root`, sorted
fn intervals_from(pitch_classes: &[u8], root: u8) -> Vec<u8> {
    let mut intervals: Vec<u8> = pitch_classes
        .iter()
        .map(|&pc| (pc + 12 - root) % 12)
        .collect();
    intervals.sort_unstable();
    intervals
}

/// Share of intervals that have a template interval within one semitone
fn coverage(intervals: &[u8], template: &[u8]) -> f64 {
    let matches = intervals
        .iter()
        .filter(|&&i| template.iter().any(|&t| (i as i16 - t as i16).abs() <= 1))
        .count();
    matches as f64 / intervals.len().max(template.len()) as f64
}

/// Exact template hits plus half credit for near misses
fn confidence(intervals: &[u8], template: &[u8]) -> f64 {
    let mut exact = 0;
    let mut close = 0;
    for &interval in intervals {
        if template.contains(&interval) {
            exact += 1;
        } else if template
            .iter()
            .any(|&t| (interval as i16 - t as i16).abs() == 1)
        {
            close += 1;
        }
    }
    let len = template.len() as f64;
    (exact as f64 / len + close as f64 / len * 0.5).min(1.0)
}

fn inversion(template: &ChordTemplate, root: u8, bass: u8) -> usize {
    let bass_interval = (bass + 12 - root) % 12;
    template
        .pitch_classes()
        .iter()
        .position(|&i| i == bass_interval)
        .unwrap_or(0)
}

fn symbol(root: u8, suffix: &str, bass: u8) -> String {
    if root == bass {
        format!("{}{}", pitch_class_name(root), suffix)
    } else {
        format!(
            "{}{}/{}",
            pitch_class_name(root),
            suffix,
            pitch_class_name(bass)
        )
    }
}

/// Recognize a chord from MIDI pitches
///
/// Each pitch class is tried as the root against the dictionary. An exact
/// pitch-class match scores 1.0, with the bass note preferred as root.
/// Otherwise the best fuzzy match above 0.5 coverage wins; failing that
/// the bass note alone is reported.
pub fn detect_chord(midi_notes: &[u8]) -> Option<ChordMatch> {
    let bass = midi_notes.iter().min()? % 12;

    let mut pitch_classes: Vec<u8> = midi_notes.iter().map(|n| n % 12).collect();
    pitch_classes.sort_unstable();
    pitch_classes.dedup();

    // Bass first so it wins ties
    let roots = std::iter::once(bass).chain(pitch_classes.iter().copied().filter(|&pc| pc != bass));

    let mut exact: Option<(u8, &ChordTemplate)> = None;
    let mut fuzzy: Option<(u8, &ChordTemplate, f64, f64)> = None;

    for root in roots {
        let intervals = intervals_from(&pitch_classes, root);
        for template in &CHORD_TEMPLATES {
            let classes = template.pitch_classes();
            if classes == intervals {
                exact = Some((root, template));
                break;
            }
            let score = coverage(&intervals, &classes);
            if score > FUZZY_THRESHOLD && fuzzy.is_none_or(|(_, _, best, _)| score > best) {
                fuzzy = Some((root, template, score, confidence(&intervals, &classes)));
            }
        }
        if exact.is_some() {
            break;
        }
    }

    if let Some((root, template)) = exact {
        return Some(ChordMatch {
            root,
            quality: Some(template.suffix),
            symbol: symbol(root, template.suffix, bass),
            confidence: 1.0,
            inversion: inversion(template, root, bass),
        });
    }

    if let Some((root, template, _, confidence)) = fuzzy {
        return Some(ChordMatch {
            root,
            quality: Some(template.suffix),
            symbol: symbol(root, template.suffix, bass),
            confidence,
            inversion: inversion(template, root, bass),
        });
    }

    Some(ChordMatch {
        root: bass,
        quality: None,
        symbol: pitch_class_name(bass).to_string(),
        confidence: FALLBACK_CONFIDENCE,
        inversion: 0,
    })
}
