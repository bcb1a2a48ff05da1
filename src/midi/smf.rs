// Standard MIDI File - Header and track chunks, lane encoders
// Format 0, one track, 480 ticks per quarter note

use crate::midi::event::{MidiEvent, NoteEvent};
use crate::midi::export::ExportError;
use crate::midi::vlq::{self, MAX_VLQ};
use crate::sequencer::pattern::Pattern;
use crate::sequencer::timeline::{MusicalTime, Tempo};

/// Ticks per quarter note written to the header
pub const DIVISION: u16 = MusicalTime::TICKS_PER_QUARTER;

const TICKS_PER_BAR: u64 = MusicalTime::TICKS_PER_BAR as u64;
const TICKS_PER_STEP: u64 = MusicalTime::TICKS_PER_STEP as u64;

/// "MThd", length 6, format 0, one track, division
pub fn header_chunk() -> [u8; 14] {
    let mut out = [0u8; 14];
    out[0..4].copy_from_slice(b"MThd");
    out[4..8].copy_from_slice(&6u32.to_be_bytes());
    out[8..10].copy_from_slice(&0u16.to_be_bytes()); // format 0
    out[10..12].copy_from_slice(&1u16.to_be_bytes()); // 1 track
    out[12..14].copy_from_slice(&DIVISION.to_be_bytes());
    out
}

/// Builds a track's event stream from events at absolute ticks
#[derive(Debug, Default)]
pub struct TrackWriter {
    bytes: Vec<u8>,
    cursor: u64,
}

impl TrackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` at absolute `tick`
    ///
    /// Ticks must not go backwards; the delta is measured from the previous
    /// event.
    pub fn event_at(&mut self, tick: u64, event: &MidiEvent) -> Result<(), ExportError> {
        debug_assert!(tick >= self.cursor, "track events out of order");
        let delta = tick.saturating_sub(self.cursor);
        if delta > MAX_VLQ as u64 {
            return Err(ExportError::DeltaOverflow { delta });
        }
        vlq::write_vlq(&mut self.bytes, delta as u32);
        event.write_to(&mut self.bytes);
        self.cursor = self.cursor.max(tick);
        Ok(())
    }

    /// Close the track with End-of-Track and wrap it in an "MTrk" chunk
    pub fn finish(mut self) -> Vec<u8> {
        vlq::write_vlq(&mut self.bytes, 0);
        MidiEvent::EndOfTrack.write_to(&mut self.bytes);

        let mut chunk = Vec::with_capacity(self.bytes.len() + 8);
        chunk.extend_from_slice(b"MTrk");
        chunk.extend_from_slice(&(self.bytes.len() as u32).to_be_bytes());
        chunk.extend_from_slice(&self.bytes);
        chunk
    }
}

/// Write a complete single-track file: tempo meta, `events` on `channel`,
/// End-of-Track
///
/// `events` are written in the order given. With no events the file still
/// holds the tempo and End-of-Track.
pub fn write_smf(tempo: &Tempo, channel: u8, events: &[NoteEvent]) -> Result<Vec<u8>, ExportError> {
    let mut track = TrackWriter::new();
    track.event_at(
        0,
        &MidiEvent::Tempo {
            microseconds_per_quarter: tempo.microseconds_per_quarter(),
        },
    )?;
    for event in events {
        track.event_at(event.tick(), &event.to_midi(channel))?;
    }

    let track = track.finish();
    let mut out = Vec::with_capacity(14 + track.len());
    out.extend_from_slice(&header_chunk());
    out.extend_from_slice(&track);
    Ok(out)
}

fn bar_tick(bar_index: usize, fraction: f64) -> u64 {
    ((bar_index as f64 + fraction) * TICKS_PER_BAR as f64).round() as u64
}

/// Chord-lane events, bar by bar and sub-chord by sub-chord
///
/// All pitches of a sub-chord start together and stop together at the next
/// sub-chord boundary, so in the written track only the first Note-Off of
/// each group carries a nonzero delta. This relies on every note of a chord
/// sharing one duration; per-note lengths need a globally sorted track like
/// the melody lane. Patterns are laid end to end.
pub fn chord_lane(patterns: &[&Pattern], velocity: u8) -> Vec<NoteEvent> {
    let mut events = Vec::new();
    let mut bar_offset = 0;

    for pattern in patterns {
        for (index, bar) in pattern.progression.iter().enumerate() {
            let count = bar.chords.len();
            for (i, chord) in bar.chords.iter().enumerate() {
                let start = bar_tick(bar_offset + index, i as f64 / count as f64);
                let end = bar_tick(bar_offset + index, (i + 1) as f64 / count as f64);
                events.extend(chord.midi_notes().iter().map(|&pitch| NoteEvent::NoteOn {
                    tick: start,
                    pitch,
                    velocity,
                }));
                events.extend(
                    chord
                        .midi_notes()
                        .iter()
                        .map(|&pitch| NoteEvent::NoteOff { tick: end, pitch }),
                );
            }
        }
        bar_offset += pattern.bar_count();
    }

    events
}

/// Melody-lane events, sorted globally by tick
///
/// Notes without their own velocity use `default_velocity`.
pub fn melody_lane(patterns: &[&Pattern], default_velocity: u8) -> Vec<NoteEvent> {
    let mut events = Vec::new();
    let mut bar_offset = 0;

    for pattern in patterns {
        for index in 0..pattern.bar_count() {
            for note in pattern.melody_notes(index) {
                let velocity = note.velocity.unwrap_or(default_velocity).clamp(1, 127);
                events.push(NoteEvent::NoteOn {
                    tick: bar_tick(bar_offset + index, note.start),
                    pitch: note.midi,
                    velocity,
                });
                events.push(NoteEvent::NoteOff {
                    tick: bar_tick(bar_offset + index, note.start + note.duration),
                    pitch: note.midi,
                });
            }
        }
        bar_offset += pattern.bar_count();
    }

    events.sort_by(NoteEvent::track_order);
    events
}

/// Drum-lane events, one step long each, sorted globally by tick
pub fn drum_lane(patterns: &[&Pattern], velocity: u8) -> Vec<NoteEvent> {
    let mut events = Vec::new();
    let mut bar_offset = 0;

    for pattern in patterns {
        for index in 0..pattern.bar_count() {
            let Some(lane) = pattern.drum_lane(index) else {
                continue;
            };
            for (step, track) in lane.active_steps() {
                let tick = ((bar_offset + index) as u64 * 16 + step as u64) * TICKS_PER_STEP;
                let pitch = track.gm_pitch();
                events.push(NoteEvent::NoteOn {
                    tick,
                    pitch,
                    velocity,
                });
                events.push(NoteEvent::NoteOff {
                    tick: tick + TICKS_PER_STEP,
                    pitch,
                });
            }
        }
        bar_offset += pattern.bar_count();
    }

    events.sort_by(NoteEvent::track_order);
    events
}
