// Integration tests for the transport
// Drive playback in simulated time and check what reaches the engine and the renderer

use chord_studio::messaging::channels::RenderConsumer;
use chord_studio::sequencer::{
    ArpPattern, DrumTrack, Lane, MelodyNote, Pattern, PatternName, Song, Tempo,
};
use chord_studio::{
    EngineConfig, RecordingEngine, RenderEvent, Transport, create_render_channel,
    parse_progression,
};
use ringbuf::traits::Consumer;

fn pattern(progression: &str) -> Pattern {
    let mut pattern = Pattern::with_progression(parse_progression(progression).unwrap()).unwrap();
    pattern.channel2_settings.audible = false;
    pattern
}

fn transport(song: Song) -> (Transport<RecordingEngine>, RenderConsumer) {
    let (tx, rx) = create_render_channel(4096);
    let transport = Transport::new(song, RecordingEngine::new(), EngineConfig::default())
        .with_render_channel(tx)
        .with_seed(7);
    (transport, rx)
}

/// Run the transport event by event until `end` (exclusive)
fn run_until(
    transport: &mut Transport<RecordingEngine>,
    rx: &mut RenderConsumer,
    end: f64,
) -> Vec<RenderEvent> {
    let mut events = Vec::new();
    while let Some(time) = transport.next_event_time() {
        if time >= end {
            break;
        }
        transport.advance(time);
        events.extend(std::iter::from_fn(|| rx.try_pop()));
    }
    events
}

#[test]
fn test_loop_never_leaves_range() {
    let mut song = Song::with_pattern(
        Tempo::default(),
        PatternName::A1,
        pattern("C | Am | F | G | Em"),
    );
    song.set_loop(2, 4);
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 60.0);
    assert!(transport.is_playing());

    let bars: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::BarHighlight { bar } => Some(*bar),
            _ => None,
        })
        .collect();
    assert_eq!(bars.len(), 30);
    assert!(bars.iter().all(|bar| (1..=3).contains(bar)));
    assert_eq!(&bars[..6], &[1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_chaining_visits_every_filled_pattern() {
    let mut song = Song::with_pattern(Tempo::default(), PatternName::A1, pattern("C"));
    song.store_pattern(PatternName::B2, pattern("F"));
    song.store_pattern(PatternName::D4, pattern("G"));
    song.flags.chain_patterns = true;
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 8.5);

    let changes: Vec<PatternName> = events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::PatternChanged { pattern } => Some(*pattern),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            PatternName::B2,
            PatternName::D4,
            PatternName::A1,
            PatternName::B2
        ]
    );

    // Each chained pattern starts on its own first bar
    let roots: Vec<f64> = transport
        .engine()
        .note_ons(Lane::Chords)
        .iter()
        .map(|(time, _)| *time)
        .collect();
    assert!(roots.contains(&2.0) && roots.contains(&4.0) && roots.contains(&6.0));
}

#[test]
fn test_single_filled_pattern_chains_to_itself() {
    let mut song = Song::with_pattern(Tempo::default(), PatternName::C3, pattern("Dm7 G7"));
    song.flags.chain_patterns = true;
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 6.5);

    assert!(transport.is_playing());
    assert_eq!(transport.song().current_pattern(), PatternName::C3);
    let changes = events
        .iter()
        .filter(|event| {
            **event
                == RenderEvent::PatternChanged {
                    pattern: PatternName::C3,
                }
        })
        .count();
    assert_eq!(changes, 3);
}

#[test]
fn test_loop_disabled_stops_at_loop_end() {
    let mut song = Song::with_pattern(Tempo::default(), PatternName::A1, pattern("C | F | G"));
    song.flags.loop_enabled = false;
    song.set_loop(1, 2);
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 100.0);

    assert!(!transport.is_playing());
    assert_eq!(events.last(), Some(&RenderEvent::Stopped));
    assert!(
        transport
            .engine()
            .note_ons(Lane::Chords)
            .iter()
            .all(|(time, _)| *time < 4.0)
    );
    assert_eq!(transport.engine().sounding_count(), 0);
}

#[test]
fn test_stop_silences_and_discards_schedule() {
    let mut p = pattern("C | Am");
    p.set_drum_step(0, DrumTrack::Kick, 0, true).unwrap();
    p.set_drum_step(0, DrumTrack::Snare, 8, true).unwrap();
    let song = Song::with_pattern(Tempo::default(), PatternName::A1, p);
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    transport.advance(0.5);
    transport.stop();
    let events: Vec<RenderEvent> = std::iter::from_fn(|| rx.try_pop()).collect();
    assert_eq!(events.last(), Some(&RenderEvent::Stopped));
    assert!(events.contains(&RenderEvent::ClearHighlights));

    let before = transport.engine().events().len();
    assert_eq!(transport.engine().sounding_count(), 0);
    assert_eq!(transport.advance(60.0), 0);
    assert_eq!(transport.engine().events().len(), before);
    assert!(transport.next_event_time().is_none());
}

#[test]
fn test_empty_song_does_not_start() {
    let (mut transport, mut rx) = transport(Song::new(Tempo::default()));
    transport.play(0.0);

    assert!(!transport.is_playing());
    assert!(transport.next_event_time().is_none());
    let events: Vec<RenderEvent> = std::iter::from_fn(|| rx.try_pop()).collect();
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, RenderEvent::Started { .. } | RenderEvent::Stopped))
    );
}

#[test]
fn test_down_arpeggio_plays_top_note_first() {
    let song = Song::with_pattern(Tempo::default(), PatternName::A1, pattern("C"));
    let (tx, _rx) = create_render_channel(64);
    let mut config = EngineConfig::default();
    config.chord_arp.enabled = true;
    config.chord_arp.pattern = ArpPattern::Down;
    let mut transport = Transport::new(song, RecordingEngine::new(), config)
        .with_render_channel(tx)
        .with_seed(7);

    transport.play(0.0);
    transport.advance(1.9);

    let pitches: Vec<u8> = transport
        .engine()
        .note_ons(Lane::Chords)
        .iter()
        .map(|(_, pitch)| *pitch)
        .collect();
    let mut expected = transport.song().active().progression[0].chords[0]
        .midi_notes()
        .to_vec();
    expected.reverse();
    assert_eq!(&pitches[..expected.len()], expected.as_slice());
}

#[test]
fn test_drum_steps_follow_sixteenth_grid() {
    let mut p = pattern("C");
    p.set_drum_step(0, DrumTrack::Kick, 0, true).unwrap();
    p.set_drum_step(0, DrumTrack::Snare, 4, true).unwrap();
    p.set_drum_step(0, DrumTrack::HiHat, 6, true).unwrap();
    let mut song = Song::with_pattern(Tempo::new(60.0).unwrap(), PatternName::A1, p);
    song.flags.loop_enabled = false;
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 100.0);

    // At 60 BPM a step lasts a quarter of a second
    assert_eq!(
        transport.engine().note_ons(Lane::Drums),
        vec![
            (0.0, DrumTrack::Kick.gm_pitch()),
            (1.0, DrumTrack::Snare.gm_pitch()),
            (1.5, DrumTrack::HiHat.gm_pitch())
        ]
    );
    assert!(events.contains(&RenderEvent::StepHighlight { bar: 0, step: 15 }));
}

#[test]
fn test_chained_pattern_plays_all_its_bars() {
    let mut song = Song::with_pattern(Tempo::default(), PatternName::A1, pattern("C"));
    song.store_pattern(PatternName::B1, pattern("F | G | Am"));
    song.flags.chain_patterns = true;
    let (mut transport, mut rx) = transport(song);

    transport.play(0.0);
    let events = run_until(&mut transport, &mut rx, 8.5);

    let bars: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::BarHighlight { bar } => Some(*bar),
            _ => None,
        })
        .collect();
    assert_eq!(bars, vec![0, 0, 1, 2, 0]);
    assert_eq!(transport.song().current_pattern(), PatternName::A1);
}

#[test]
fn test_consecutive_steps_retrigger_at_uneven_tempo() {
    let mut p = pattern("C");
    for step in 0..16 {
        p.set_drum_step(0, DrumTrack::Kick, step, true).unwrap();
    }
    let mut song = Song::with_pattern(Tempo::new(90.0).unwrap(), PatternName::A1, p);
    song.flags.loop_enabled = false;
    let (mut transport, _rx) = transport(song);
    let step = transport.song().bpm().bar_duration_seconds() / 16.0;
    let kick = DrumTrack::Kick.gm_pitch();

    transport.play(0.0);
    for index in 0..16 {
        transport.advance(index as f64 * step + step / 2.0);
        assert!(
            transport.engine().is_sounding(Lane::Drums, kick),
            "kick silent during step {index}"
        );
    }

    // Every release lands exactly on the next onset
    let ons = transport.engine().note_ons(Lane::Drums);
    let offs = transport.engine().note_offs(Lane::Drums);
    assert_eq!(ons.len(), 16);
    for (off, on) in offs.iter().zip(ons.iter().skip(1)) {
        assert_eq!(off.0, on.0);
    }
}

#[test]
fn test_back_to_back_melody_notes_both_sound() {
    let mut p = pattern("C");
    p.channel2_settings.audible = true;
    p.add_melody_note(0, MelodyNote::new(72, 0.1, 0.2).unwrap())
        .unwrap();
    p.add_melody_note(0, MelodyNote::new(72, 0.3, 0.3).unwrap())
        .unwrap();
    let mut song = Song::with_pattern(Tempo::new(90.0).unwrap(), PatternName::A1, p);
    song.flags.loop_enabled = false;
    let (mut transport, _rx) = transport(song);
    let bar = transport.song().bpm().bar_duration_seconds();

    transport.play(0.0);
    transport.advance(0.45 * bar);
    assert!(transport.engine().is_sounding(Lane::Melody, 72));

    transport.advance(100.0);
    assert_eq!(transport.engine().note_ons(Lane::Melody).len(), 2);
    assert_eq!(transport.engine().sounding_count(), 0);
}
