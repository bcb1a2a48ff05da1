// Music theory - Chord symbols, the chord dictionary and chord recognition

pub mod chord;
pub mod detect;
pub mod dictionary;

pub use chord::{TheoryError, parse_chord, parse_progression, pitch_class};
pub use detect::{ChordMatch, detect_chord};
pub use dictionary::{CHORD_TEMPLATES, ChordFamily, ChordTemplate};
