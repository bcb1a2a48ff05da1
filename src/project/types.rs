// Types for project persistence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::project::ProjectError;
use crate::sequencer::pattern::Pattern;
use crate::sequencer::song::{PlaybackFlags, Song};
use crate::sequencer::timeline::{DEFAULT_MAX_LOOP_BARS, LoopRange, PatternName, Tempo};

/// Project version information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProjectVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn current() -> Self {
        Self::new(1, 0, 0)
    }

    /// Files from a newer major version are refused
    pub fn is_supported(&self) -> bool {
        self.major >= 1 && self.major <= Self::current().major
    }
}

impl std::fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Project metadata, also written on its own as the manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    /// Project name
    pub name: String,
    /// Version of the project format
    pub version: ProjectVersion,
    /// Creation timestamp (RFC 3339)
    pub created: String,
    /// Last modification timestamp (RFC 3339)
    pub modified: String,
    /// Tempo (BPM)
    pub tempo: f64,
    /// Author/creator information
    pub author: Option<String>,
    /// Project description
    pub description: Option<String>,
}

impl ProjectMetadata {
    /// Stamp the modification time with the current UTC time
    pub fn touch(&mut self) {
        self.modified = chrono::Utc::now().to_rfc3339();
    }
}

/// Main project structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Project metadata
    pub metadata: ProjectMetadata,
    /// Stored patterns by slot
    pub patterns: BTreeMap<PatternName, Pattern>,
    /// Slot being edited when the project was saved
    pub current_pattern: PatternName,
    pub loop_range: LoopRange,
    #[serde(default = "default_max_loop_bars")]
    pub max_loop_bars: usize,
    #[serde(default)]
    pub flags: PlaybackFlags,
    #[serde(default)]
    pub config: EngineConfig,
}

fn default_max_loop_bars() -> usize {
    DEFAULT_MAX_LOOP_BARS
}

impl Default for Project {
    fn default() -> Self {
        let now = chrono::Utc::now();

        Self {
            metadata: ProjectMetadata {
                name: "Untitled Project".to_string(),
                version: ProjectVersion::current(),
                created: now.to_rfc3339(),
                modified: now.to_rfc3339(),
                tempo: 120.0,
                author: None,
                description: None,
            },
            patterns: BTreeMap::new(),
            current_pattern: PatternName::A1,
            loop_range: LoopRange::default(),
            max_loop_bars: DEFAULT_MAX_LOOP_BARS,
            flags: PlaybackFlags::default(),
            config: EngineConfig::default(),
        }
    }
}

impl Project {
    /// Restore chord invariants (sorted, unique, named pitches) after loading
    ///
    /// Fails on an empty chord or an out-of-range pitch.
    pub fn normalize(&mut self) -> Result<(), ProjectError> {
        for (name, pattern) in self.patterns.iter_mut() {
            for bar in pattern.progression.iter_mut() {
                let chords = std::mem::take(&mut bar.chords);
                bar.chords = chords
                    .into_iter()
                    .map(|chord| chord.normalized())
                    .collect::<Result<_, _>>()
                    .map_err(|e| {
                        ProjectError::InvalidStructure(format!(
                            "Pattern {} bar {}: {}",
                            name, bar.bar_num, e
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Build the live song from this project
    pub fn to_song(&self) -> Result<Song, ProjectError> {
        let mut song = Song::new(Tempo::new(self.metadata.tempo)?);
        song.set_max_loop_bars(self.max_loop_bars);
        for (&name, pattern) in &self.patterns {
            song.store_pattern(name, pattern.clone());
        }
        song.select_pattern(self.current_pattern);
        song.set_loop(self.loop_range.start, self.loop_range.end);
        song.flags = self.flags;
        Ok(song)
    }
}

impl Song {
    /// Capture the song as a project named `name`
    pub fn to_project(&self, name: &str) -> Project {
        let mut project = Project::default();
        project.metadata.name = name.to_string();
        project.metadata.tempo = self.bpm().bpm();
        project.patterns = self
            .snapshot()
            .patterns
            .into_iter()
            .map(|(name, pattern)| (name, pattern.as_ref().clone()))
            .collect();
        project.current_pattern = self.current_pattern();
        project.loop_range = self.requested_loop();
        project.max_loop_bars = self.max_loop_bars();
        project.flags = self.flags;
        project
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::Chord;
    use crate::sequencer::pattern::Bar;

    fn two_bar_pattern() -> Pattern {
        let c = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        let g = Chord::new("G", "G", "", vec![67, 71, 74]).unwrap();
        Pattern::with_progression(vec![Bar::new(1, vec![c]), Bar::new(2, vec![g])]).unwrap()
    }

    #[test]
    fn test_project_version() {
        let version = ProjectVersion::new(1, 2, 3);
        assert_eq!(version.to_string(), "1.2.3");
        assert!(version.is_supported());
        assert!(!ProjectVersion::new(2, 0, 0).is_supported());
        assert!(!ProjectVersion::new(0, 9, 0).is_supported());
    }

    #[test]
    fn test_project_defaults() {
        let project = Project::default();
        assert_eq!(project.metadata.name, "Untitled Project");
        assert_eq!(project.metadata.tempo, 120.0);
        assert!(chrono::DateTime::parse_from_rfc3339(&project.metadata.created).is_ok());
        assert!(project.patterns.is_empty());
        assert_eq!(project.current_pattern, PatternName::A1);
    }

    #[test]
    fn test_song_round_trip() {
        let mut song = Song::with_pattern(
            Tempo::new(96.0).unwrap(),
            PatternName::A1,
            two_bar_pattern(),
        );
        song.store_pattern(PatternName::B2, two_bar_pattern());
        song.set_loop(2, 2);
        song.flags.chain_patterns = true;

        let project = song.to_project("Round Trip");
        assert_eq!(project.metadata.name, "Round Trip");
        assert_eq!(project.metadata.tempo, 96.0);
        assert_eq!(project.patterns.len(), 2);

        let restored = project.to_song().unwrap();
        assert_eq!(restored.bpm().bpm(), 96.0);
        assert_eq!(restored.current_pattern(), PatternName::A1);
        assert_eq!(restored.bar_count(), 2);
        assert_eq!(restored.loop_range(), LoopRange { start: 2, end: 2 });
        assert!(restored.flags.chain_patterns);
        assert!(restored.patterns().is_filled(PatternName::B2));
    }

    #[test]
    fn test_saved_loop_outlives_short_current_pattern() {
        let c = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        let six_bars =
            Pattern::with_progression((1..=6).map(|n| Bar::new(n, vec![c.clone()])).collect())
                .unwrap();
        let mut song = Song::with_pattern(Tempo::default(), PatternName::A1, six_bars);
        song.set_loop(2, 5);
        song.store_pattern(PatternName::B1, two_bar_pattern());
        song.select_pattern(PatternName::B1);
        assert_eq!(song.loop_range(), LoopRange { start: 2, end: 2 });

        let project = song.to_project("Short Current");
        assert_eq!(project.loop_range, LoopRange { start: 2, end: 5 });
        assert!(crate::project::validate_project_structure(&project).is_ok());

        let mut restored = project.to_song().unwrap();
        assert_eq!(restored.loop_range(), LoopRange { start: 2, end: 2 });
        restored.select_pattern(PatternName::A1);
        assert_eq!(restored.loop_range(), LoopRange { start: 2, end: 5 });
    }

    #[test]
    fn test_to_song_rejects_bad_tempo() {
        let mut project = Project::default();
        project.metadata.tempo = 0.0;
        assert!(matches!(project.to_song(), Err(ProjectError::Timeline(_))));
    }

    #[test]
    fn test_normalize_rejects_empty_chord() {
        let text = r#"(symbol: "C", root: "C", quality: "", midi_notes: [], note_names: [])"#;
        let chord: Chord = ron::from_str(text).unwrap();

        let mut project = Project::default();
        project.patterns.insert(
            PatternName::A1,
            Pattern::with_progression(vec![Bar::new(1, vec![chord])]).unwrap(),
        );
        assert!(matches!(
            project.normalize(),
            Err(ProjectError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_normalize_sorts_notes() {
        let text =
            r#"(symbol: "C", root: "C", quality: "", midi_notes: [67, 60, 64, 60], note_names: [])"#;
        let chord: Chord = ron::from_str(text).unwrap();

        let mut project = Project::default();
        project.patterns.insert(
            PatternName::A1,
            Pattern::with_progression(vec![Bar::new(1, vec![chord])]).unwrap(),
        );
        project.normalize().unwrap();

        let chord = &project.patterns[&PatternName::A1].progression[0].chords[0];
        assert_eq!(chord.midi_notes(), &[60, 64, 67]);
        assert_eq!(chord.note_names(), &["C4", "E4", "G4"]);
    }
}
