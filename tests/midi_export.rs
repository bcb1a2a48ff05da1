// Integration tests for MIDI export
// Render whole songs to Standard MIDI Files and read them back

use chord_studio::midi::{ExportScope, MidiEvent, MidiExporter};
use chord_studio::sequencer::{DrumTrack, Lane, MelodyNote, Pattern, PatternName, Song, Tempo};
use chord_studio::{EngineConfig, RecordingEngine, Transport, parse_progression};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use tempfile::tempdir;

fn song() -> Song {
    let mut pattern =
        Pattern::with_progression(parse_progression("C | Am F").unwrap()).unwrap();
    pattern
        .add_melody_note(1, MelodyNote::new(76, 0.5, 0.25).unwrap())
        .unwrap();
    pattern
        .add_melody_note(0, MelodyNote::new(72, 0.0, 0.5).unwrap())
        .unwrap();
    pattern.set_drum_step(0, DrumTrack::Kick, 0, true).unwrap();
    pattern.set_drum_step(0, DrumTrack::Snare, 4, true).unwrap();
    Song::with_pattern(Tempo::default(), PatternName::A1, pattern)
}

/// Translate a parsed event into the messages the exporter writes
fn to_event(kind: &TrackEventKind) -> MidiEvent {
    match *kind {
        TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        } => MidiEvent::NoteOn {
            channel: channel.as_int(),
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOff { key, .. },
        } => MidiEvent::NoteOff {
            channel: channel.as_int(),
            note: key.as_int(),
        },
        TrackEventKind::Meta(MetaMessage::Tempo(micros)) => MidiEvent::Tempo {
            microseconds_per_quarter: micros.as_int(),
        },
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => MidiEvent::EndOfTrack,
        ref other => panic!("unexpected event {:?}", other),
    }
}

/// Absolute tick of every event in the first track
fn absolute(bytes: &[u8]) -> Vec<(u64, MidiEvent)> {
    let smf = Smf::parse(bytes).unwrap();
    assert_eq!(smf.header.format, Format::SingleTrack);
    assert!(matches!(smf.header.timing, Timing::Metrical(ticks) if ticks.as_int() == 480));
    assert_eq!(smf.tracks.len(), 1);

    let mut tick = 0u64;
    smf.tracks[0]
        .iter()
        .map(|event| {
            tick += event.delta.as_int() as u64;
            (tick, to_event(&event.kind))
        })
        .collect()
}

fn note_ons(events: &[(u64, MidiEvent)]) -> Vec<(u64, u8)> {
    events
        .iter()
        .filter_map(|(tick, event)| match event {
            MidiEvent::NoteOn { note, .. } => Some((*tick, *note)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_chord_lane_end_to_end() {
    let snapshot = song().snapshot();
    let bytes = MidiExporter::default()
        .render(&snapshot, Lane::Chords, ExportScope::Pattern(PatternName::A1))
        .unwrap();

    // Header and the exact start of the track
    assert_eq!(&bytes[0..14], b"MThd\x00\x00\x00\x06\x00\x00\x00\x01\x01\xE0");
    assert_eq!(&bytes[14..18], b"MTrk");
    let track_len = u32::from_be_bytes(bytes[18..22].try_into().unwrap()) as usize;
    assert_eq!(bytes.len(), 22 + track_len);
    assert_eq!(
        &bytes[22..33],
        &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, 0x00, 0x90, 60, 80]
    );
    assert_eq!(&bytes[bytes.len() - 3..], &[0xFF, 0x2F, 0x00]);

    let events = absolute(&bytes);
    assert_eq!(
        events[0],
        (
            0,
            MidiEvent::Tempo {
                microseconds_per_quarter: 500_000
            }
        )
    );
    assert_eq!(
        note_ons(&events),
        vec![
            (0, 60),
            (0, 64),
            (0, 67),
            (1920, 69),
            (1920, 72),
            (1920, 76),
            (2880, 65),
            (2880, 69),
            (2880, 72)
        ]
    );
    assert_eq!(events.last(), Some(&(3840, MidiEvent::EndOfTrack)));
}

#[test]
fn test_every_note_on_has_a_note_off() {
    let snapshot = song().snapshot();
    let exporter = MidiExporter::default();

    for lane in Lane::ALL {
        let bytes = exporter
            .render(&snapshot, lane, ExportScope::Pattern(PatternName::A1))
            .unwrap();
        let mut balance: HashMap<u8, i32> = HashMap::new();
        for (_, event) in absolute(&bytes) {
            match event {
                MidiEvent::NoteOn { note, .. } => *balance.entry(note).or_default() += 1,
                MidiEvent::NoteOff { note, .. } => *balance.entry(note).or_default() -= 1,
                _ => {}
            }
            assert!(balance.values().all(|count| *count >= 0), "{} lane", lane);
        }
        assert!(balance.values().all(|count| *count == 0), "{} lane", lane);
    }
}

#[test]
fn test_melody_and_drum_lanes() {
    let snapshot = song().snapshot();
    let exporter = MidiExporter::default();

    let melody = absolute(
        &exporter
            .render(&snapshot, Lane::Melody, ExportScope::Pattern(PatternName::A1))
            .unwrap(),
    );
    assert_eq!(note_ons(&melody), vec![(0, 72), (2880, 76)]);
    assert!(melody.contains(&(
        3360,
        MidiEvent::NoteOff {
            channel: 0,
            note: 76
        }
    )));

    let drums = absolute(
        &exporter
            .render(&snapshot, Lane::Drums, ExportScope::Pattern(PatternName::A1))
            .unwrap(),
    );
    assert_eq!(
        note_ons(&drums),
        vec![
            (0, DrumTrack::Kick.gm_pitch()),
            (480, DrumTrack::Snare.gm_pitch())
        ]
    );
    assert!(drums.iter().all(|(_, event)| match event {
        MidiEvent::NoteOn { channel, .. } | MidiEvent::NoteOff { channel, .. } => *channel == 9,
        _ => true,
    }));
}

#[test]
fn test_all_patterns_are_laid_end_to_end() {
    let mut song = song();
    song.store_pattern(
        PatternName::B1,
        Pattern::with_progression(parse_progression("G | D").unwrap()).unwrap(),
    );
    let snapshot = song.snapshot();

    let bytes = MidiExporter::default()
        .render(&snapshot, Lane::Chords, ExportScope::AllPatterns)
        .unwrap();
    let roots: Vec<(u64, u8)> = note_ons(&absolute(&bytes))
        .into_iter()
        .filter(|(tick, _)| *tick >= 3840)
        .collect();

    // B1 starts after A1's two bars
    assert_eq!(roots[0], (3840, 67));
    assert_eq!(roots[3], (5760, 62));
}

#[test]
fn test_empty_lane_is_a_valid_file() {
    let song = Song::with_pattern(
        Tempo::new(90.0).unwrap(),
        PatternName::A1,
        Pattern::with_progression(parse_progression("C").unwrap()).unwrap(),
    );
    let bytes = MidiExporter::default()
        .render(
            &song.snapshot(),
            Lane::Drums,
            ExportScope::Pattern(PatternName::A1),
        )
        .unwrap();

    let events = absolute(&bytes);
    assert_eq!(
        events,
        vec![
            (
                0,
                MidiEvent::Tempo {
                    microseconds_per_quarter: 666_667
                }
            ),
            (0, MidiEvent::EndOfTrack)
        ]
    );
}

#[test]
fn test_export_all_lanes_to_dir() {
    let dir = tempdir().unwrap();
    let snapshot = song().snapshot();
    let exporter = MidiExporter::new(&EngineConfig::default());

    let mut written = Vec::new();
    for lane in Lane::ALL {
        let path = exporter
            .export_to_dir(&snapshot, lane, ExportScope::Pattern(PatternName::A1), dir.path())
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(Smf::parse(&bytes).is_ok());
        written.push(path.file_name().unwrap().to_string_lossy().into_owned());
    }
    assert_eq!(
        written,
        vec!["channel1-A1.mid", "channel2-A1.mid", "drums-A1.mid"]
    );
}

#[test]
fn test_export_during_playback_matches_idle_export() {
    let song = song();
    let exporter = MidiExporter::default();
    let idle = exporter
        .render(&song.snapshot(), Lane::Chords, ExportScope::AllPatterns)
        .unwrap();

    let mut transport = Transport::new(song, RecordingEngine::new(), EngineConfig::default());
    transport.play(0.0);
    transport.advance(2.5);
    assert!(transport.is_playing());

    let playing = exporter
        .render(
            &transport.song().snapshot(),
            Lane::Chords,
            ExportScope::AllPatterns,
        )
        .unwrap();
    assert_eq!(playing, idle);
    assert!(transport.is_playing());
}
