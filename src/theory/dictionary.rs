// Chord dictionary - Interval templates keyed by symbol suffix

/// Broad family of a chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordFamily {
    Major,
    Minor,
    Dominant,
    Diminished,
    HalfDiminished,
    Augmented,
    Suspended,
    Power,
    Altered,
}

/// One chord quality: symbol suffix and semitone offsets from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordTemplate {
    pub suffix: &'static str,
    pub intervals: &'static [u8],
    pub family: ChordFamily,
}

const fn template(
    suffix: &'static str,
    intervals: &'static [u8],
    family: ChordFamily,
) -> ChordTemplate {
    ChordTemplate {
        suffix,
        intervals,
        family,
    }
}

/// Every known quality, simplest first
pub const CHORD_TEMPLATES: [ChordTemplate; 34] = [
    // Triads
    template("", &[0, 4, 7], ChordFamily::Major),
    template("m", &[0, 3, 7], ChordFamily::Minor),
    template("dim", &[0, 3, 6], ChordFamily::Diminished),
    template("aug", &[0, 4, 8], ChordFamily::Augmented),
    template("sus2", &[0, 2, 7], ChordFamily::Suspended),
    template("sus4", &[0, 5, 7], ChordFamily::Suspended),
    template("5", &[0, 7], ChordFamily::Power),
    // Sevenths
    template("7", &[0, 4, 7, 10], ChordFamily::Dominant),
    template("maj7", &[0, 4, 7, 11], ChordFamily::Major),
    template("m7", &[0, 3, 7, 10], ChordFamily::Minor),
    template("mMaj7", &[0, 3, 7, 11], ChordFamily::Minor),
    template("dim7", &[0, 3, 6, 9], ChordFamily::Diminished),
    template("m7b5", &[0, 3, 6, 10], ChordFamily::HalfDiminished),
    template("7sus4", &[0, 5, 7, 10], ChordFamily::Suspended),
    // Sixths
    template("6", &[0, 4, 7, 9], ChordFamily::Major),
    template("m6", &[0, 3, 7, 9], ChordFamily::Minor),
    template("6add9", &[0, 4, 7, 9, 14], ChordFamily::Major),
    // Ninths
    template("add9", &[0, 4, 7, 14], ChordFamily::Major),
    template("madd9", &[0, 3, 7, 14], ChordFamily::Minor),
    template("9", &[0, 4, 7, 10, 14], ChordFamily::Dominant),
    template("m9", &[0, 3, 7, 10, 14], ChordFamily::Minor),
    template("maj9", &[0, 4, 7, 11, 14], ChordFamily::Major),
    template("9sus4", &[0, 5, 7, 10, 14], ChordFamily::Suspended),
    // Elevenths
    template("11", &[0, 4, 7, 10, 14, 17], ChordFamily::Dominant),
    template("m11", &[0, 3, 7, 10, 14, 17], ChordFamily::Minor),
    template("maj11", &[0, 4, 7, 11, 14, 17], ChordFamily::Major),
    // Thirteenths
    template("13", &[0, 4, 7, 10, 14, 17, 21], ChordFamily::Dominant),
    template("m13", &[0, 3, 7, 10, 14, 17, 21], ChordFamily::Minor),
    template("maj13", &[0, 4, 7, 11, 14, 17, 21], ChordFamily::Major),
    // Altered
    template("7b5", &[0, 4, 6, 10], ChordFamily::Altered),
    template("7#5", &[0, 4, 8, 10], ChordFamily::Altered),
    template("7b9", &[0, 4, 7, 10, 13], ChordFamily::Altered),
    template("7#9", &[0, 4, 7, 10, 15], ChordFamily::Altered),
    template("alt", &[0, 4, 6, 10, 13], ChordFamily::Altered),
];

/// Suffixes that mean the same thing as a dictionary entry
const ALIASES: [(&str, &str); 4] = [("maj", ""), ("M", ""), ("min", "m"), ("-", "m")];

/// Look up a quality by its symbol suffix (aliases included)
pub fn lookup(suffix: &str) -> Option<&'static ChordTemplate> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == suffix)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(suffix);
    CHORD_TEMPLATES.iter().find(|t| t.suffix == canonical)
}

impl ChordTemplate {
    /// Template reduced to sorted, unique pitch classes
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut classes: Vec<u8> = self.intervals.iter().map(|i| i % 12).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}
