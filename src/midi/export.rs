// MIDI export - Render song snapshots to per-lane Standard MIDI Files

use crate::config::EngineConfig;
use crate::midi::event::{DRUM_CHANNEL, MELODIC_CHANNEL};
use crate::midi::smf;
use crate::sequencer::pattern::{Lane, Pattern};
use crate::sequencer::song::SongSnapshot;
use crate::sequencer::timeline::PatternName;
use std::fs;
use std::path::{Path, PathBuf};

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pattern {0} not found")]
    PatternNotFound(PatternName),

    #[error("Delta-time of {delta} ticks does not fit in a MIDI variable-length quantity")]
    DeltaOverflow { delta: u64 },
}

/// Which part of the song goes into the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    Pattern(PatternName),
    /// Every filled pattern, A1 to D4, laid end to end
    AllPatterns,
}

/// Renders lanes of a song snapshot to MIDI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiExporter {
    pub chord_velocity: u8,
    pub melody_velocity: u8,
    pub drum_velocity: u8,
}

impl Default for MidiExporter {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl MidiExporter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chord_velocity: config.chord_velocity,
            melody_velocity: config.melody_velocity,
            drum_velocity: config.drum_velocity,
        }
    }

    /// `channel1-A1.mid`, `drums-all-patterns.mid`, ...
    pub fn file_name(lane: Lane, scope: ExportScope) -> String {
        match scope {
            ExportScope::Pattern(name) => format!("{}-{}.mid", lane.file_prefix(), name),
            ExportScope::AllPatterns => format!("{}-all-patterns.mid", lane.file_prefix()),
        }
    }

    fn patterns<'a>(
        snapshot: &'a SongSnapshot,
        scope: ExportScope,
    ) -> Result<Vec<&'a Pattern>, ExportError> {
        match scope {
            ExportScope::Pattern(name) => snapshot
                .pattern(name)
                .map(|pattern| vec![pattern])
                .ok_or(ExportError::PatternNotFound(name)),
            ExportScope::AllPatterns => Ok(snapshot
                .filled_patterns()
                .map(|(_, pattern)| pattern)
                .collect()),
        }
    }

    /// Render one lane to the bytes of a complete file
    pub fn render(
        &self,
        snapshot: &SongSnapshot,
        lane: Lane,
        scope: ExportScope,
    ) -> Result<Vec<u8>, ExportError> {
        let patterns = Self::patterns(snapshot, scope)?;
        let (channel, events) = match lane {
            Lane::Chords => (
                MELODIC_CHANNEL,
                smf::chord_lane(&patterns, self.chord_velocity),
            ),
            Lane::Melody => (
                MELODIC_CHANNEL,
                smf::melody_lane(&patterns, self.melody_velocity),
            ),
            Lane::Drums => (DRUM_CHANNEL, smf::drum_lane(&patterns, self.drum_velocity)),
        };
        log::debug!(
            "Rendering {} ({:?}): {} note events",
            lane,
            scope,
            events.len()
        );
        smf::write_smf(&snapshot.bpm, channel, &events)
    }

    /// Render one lane and write it into `dir` under the conventional name
    pub fn export_to_dir(
        &self,
        snapshot: &SongSnapshot,
        lane: Lane,
        scope: ExportScope,
        dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.render(snapshot, lane, scope)?;
        let path = dir.join(Self::file_name(lane, scope));
        fs::write(&path, &bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Exported {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::note::Chord;
    use crate::sequencer::pattern::Bar;
    use crate::sequencer::song::Song;
    use crate::sequencer::timeline::Tempo;

    fn song() -> Song {
        let chord = Chord::new("C", "C", "", vec![60, 64, 67]).unwrap();
        let pattern = Pattern::with_progression(vec![Bar::new(1, vec![chord])]).unwrap();
        Song::with_pattern(Tempo::default(), PatternName::A1, pattern)
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            MidiExporter::file_name(Lane::Chords, ExportScope::Pattern(PatternName::B3)),
            "channel1-B3.mid"
        );
        assert_eq!(
            MidiExporter::file_name(Lane::Melody, ExportScope::AllPatterns),
            "channel2-all-patterns.mid"
        );
        assert_eq!(
            MidiExporter::file_name(Lane::Drums, ExportScope::Pattern(PatternName::A1)),
            "drums-A1.mid"
        );
    }

    #[test]
    fn test_missing_pattern() {
        let snapshot = song().snapshot();
        let result = MidiExporter::default().render(
            &snapshot,
            Lane::Chords,
            ExportScope::Pattern(PatternName::D4),
        );
        assert!(matches!(
            result,
            Err(ExportError::PatternNotFound(PatternName::D4))
        ));
    }

    #[test]
    fn test_velocity_from_config() {
        let config = EngineConfig {
            chord_velocity: 100,
            ..EngineConfig::default()
        };
        let exporter = MidiExporter::new(&config);
        let bytes = exporter
            .render(
                &song().snapshot(),
                Lane::Chords,
                ExportScope::Pattern(PatternName::A1),
            )
            .unwrap();
        let file = midly::Smf::parse(&bytes).unwrap();
        assert!(matches!(
            file.tracks[0][1].kind,
            midly::TrackEventKind::Midi {
                message: midly::MidiMessage::NoteOn { vel, .. },
                ..
            } if vel.as_int() == 100
        ));
    }

    #[test]
    fn test_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = MidiExporter::default().export_to_dir(
            &song().snapshot(),
            Lane::Chords,
            ExportScope::AllPatterns,
            &missing,
        );
        match result {
            Err(ExportError::Io { path, .. }) => {
                assert_eq!(path, missing.join("channel1-all-patterns.mid"))
            }
            other => panic!("Expected Io error, got {:?}", other),
        }
    }
}
