// Sound engine boundary - Where the transport sends note triggers
// The synthesis itself lives outside this crate

use crate::sequencer::pattern::Lane;
use std::collections::BTreeSet;

/// Receives note triggers from the transport
///
/// `time` is the scheduled time in seconds on the transport clock.
pub trait SoundEngine {
    fn trigger_note_on(&mut self, lane: Lane, pitch: u8, velocity: u8, time: f64);

    fn trigger_note_off(&mut self, lane: Lane, pitch: u8, time: f64);

    /// Silence every sounding voice
    fn release_all(&mut self);
}

/// A trigger as received by an engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    NoteOn {
        lane: Lane,
        pitch: u8,
        velocity: u8,
        time: f64,
    },
    NoteOff {
        lane: Lane,
        pitch: u8,
        time: f64,
    },
    ReleaseAll,
}

/// Sound engine that keeps every trigger it receives
///
/// Also tracks which voices are sounding, like a voice manager would.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    events: Vec<EngineEvent>,
    sounding: BTreeSet<(u8, u8)>,
}

fn lane_key(lane: Lane) -> u8 {
    match lane {
        Lane::Chords => 0,
        Lane::Melody => 1,
        Lane::Drums => 2,
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// `(time, pitch)` of every note-on for a lane
    pub fn note_ons(&self, lane: Lane) -> Vec<(f64, u8)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                EngineEvent::NoteOn {
                    lane: l,
                    pitch,
                    time,
                    ..
                } if l == lane => Some((time, pitch)),
                _ => None,
            })
            .collect()
    }

    /// `(time, pitch)` of every note-off for a lane
    pub fn note_offs(&self, lane: Lane) -> Vec<(f64, u8)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                EngineEvent::NoteOff {
                    lane: l,
                    pitch,
                    time,
                } if l == lane => Some((time, pitch)),
                _ => None,
            })
            .collect()
    }

    /// Number of voices currently sounding
    pub fn sounding_count(&self) -> usize {
        self.sounding.len()
    }

    pub fn is_sounding(&self, lane: Lane, pitch: u8) -> bool {
        self.sounding.contains(&(lane_key(lane), pitch))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl SoundEngine for RecordingEngine {
    fn trigger_note_on(&mut self, lane: Lane, pitch: u8, velocity: u8, time: f64) {
        self.sounding.insert((lane_key(lane), pitch));
        self.events.push(EngineEvent::NoteOn {
            lane,
            pitch,
            velocity,
            time,
        });
    }

    fn trigger_note_off(&mut self, lane: Lane, pitch: u8, time: f64) {
        self.sounding.remove(&(lane_key(lane), pitch));
        self.events.push(EngineEvent::NoteOff { lane, pitch, time });
    }

    fn release_all(&mut self) {
        self.sounding.clear();
        self.events.push(EngineEvent::ReleaseAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_engine_tracks_voices() {
        let mut engine = RecordingEngine::new();
        engine.trigger_note_on(Lane::Chords, 60, 80, 0.0);
        engine.trigger_note_on(Lane::Melody, 60, 80, 0.0);
        engine.trigger_note_on(Lane::Chords, 64, 80, 0.0);
        assert_eq!(engine.sounding_count(), 3);

        engine.trigger_note_off(Lane::Chords, 60, 1.0);
        assert_eq!(engine.sounding_count(), 2);
        assert!(!engine.is_sounding(Lane::Chords, 60));
        assert!(engine.is_sounding(Lane::Melody, 60));
        assert_eq!(engine.note_ons(Lane::Chords), vec![(0.0, 60), (0.0, 64)]);
        assert_eq!(engine.note_offs(Lane::Chords), vec![(1.0, 60)]);

        engine.release_all();
        assert_eq!(engine.sounding_count(), 0);
        assert_eq!(engine.events().last(), Some(&EngineEvent::ReleaseAll));
    }
}
