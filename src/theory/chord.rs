// Chord symbols - Parse "Am7" style symbols and "|"-separated progressions

use crate::sequencer::note::Chord;
use crate::sequencer::pattern::Bar;
use crate::sequencer::timeline::{MAX_PATTERN_BARS, TimelineError};
use crate::theory::dictionary;

/// Pitch of the root before the pitch class is added (C4)
pub const BASE_PITCH: u8 = 60;

/// Music theory errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TheoryError {
    #[error("Invalid chord symbol: {0}")]
    InvalidSymbol(String),

    #[error("Progression has {0} bars, the maximum is {MAX_PATTERN_BARS}")]
    TooManyBars(usize),

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Pitch class of a root name (`C`, `F#`, `Bb`, ...)
pub fn pitch_class(root: &str) -> Option<u8> {
    let mut chars = root.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let class = match chars.next() {
        None => base,
        Some('#') => (base + 1) % 12,
        Some('b') => (base + 11) % 12,
        Some(_) => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(class)
}

/// Split a symbol into its root and quality suffix
fn split_root(symbol: &str) -> Option<(&str, &str)> {
    let first = symbol.chars().next()?;
    if !('A'..='G').contains(&first) {
        return None;
    }
    let root_len = match symbol[1..].chars().next() {
        Some('#') | Some('b') => 2,
        _ => 1,
    };
    Some(symbol.split_at(root_len))
}

/// Parse one chord symbol
///
/// Unknown qualities fall back to a major triad.
pub fn parse_chord(symbol: &str) -> Result<Chord, TheoryError> {
    let symbol = symbol.trim();
    let (root, quality) =
        split_root(symbol).ok_or_else(|| TheoryError::InvalidSymbol(symbol.to_string()))?;
    let root_class =
        pitch_class(root).ok_or_else(|| TheoryError::InvalidSymbol(symbol.to_string()))?;

    let template = match dictionary::lookup(quality) {
        Some(template) => template,
        None => {
            log::debug!("Unknown quality '{}' in {}, using major", quality, symbol);
            &dictionary::CHORD_TEMPLATES[0]
        }
    };

    let midi_notes: Vec<u8> = template
        .intervals
        .iter()
        .map(|interval| BASE_PITCH + root_class + interval)
        .collect();

    Ok(Chord::new(symbol, root, quality, midi_notes)?)
}

/// Parse a progression like `"C Am | F G | C"`
///
/// Bars are split on `|` and chords on whitespace. Empty bars between
/// separators are dropped; symbols that do not parse are skipped.
pub fn parse_progression(text: &str) -> Result<Vec<Bar>, TheoryError> {
    let bar_texts: Vec<&str> = text
        .split('|')
        .map(str::trim)
        .filter(|bar| !bar.is_empty())
        .collect();
    if bar_texts.len() > MAX_PATTERN_BARS {
        return Err(TheoryError::TooManyBars(bar_texts.len()));
    }

    let bars = bar_texts
        .iter()
        .enumerate()
        .map(|(index, bar_text)| {
            let chords = bar_text
                .split_whitespace()
                .filter_map(|symbol| match parse_chord(symbol) {
                    Ok(chord) => Some(chord),
                    Err(e) => {
                        log::warn!("Skipping '{}' in bar {}: {}", symbol, index + 1, e);
                        None
                    }
                })
                .collect();
            Bar::new(index + 1, chords)
        })
        .collect();

    Ok(bars)
}
