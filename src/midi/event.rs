// MIDI events - Channel and meta messages written to tracks

use std::cmp::Ordering;

/// Channel used by the chord and melody lanes (channel 1)
pub const MELODIC_CHANNEL: u8 = 0;

/// General MIDI percussion channel (channel 10)
pub const DRUM_CHANNEL: u8 = 9;

/// One message in a track, without its delta-time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    Tempo { microseconds_per_quarter: u32 },
    EndOfTrack,
}

impl MidiEvent {
    /// Append the encoded message to `buf`
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match *self {
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => buf.extend_from_slice(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]),
            MidiEvent::NoteOff { channel, note } => {
                buf.extend_from_slice(&[0x80 | (channel & 0x0F), note & 0x7F, 0x00])
            }
            MidiEvent::Tempo {
                microseconds_per_quarter: micros,
            } => buf.extend_from_slice(&[
                0xFF,
                0x51,
                0x03,
                ((micros >> 16) & 0xFF) as u8,
                ((micros >> 8) & 0xFF) as u8,
                (micros & 0xFF) as u8,
            ]),
            MidiEvent::EndOfTrack => buf.extend_from_slice(&[0xFF, 0x2F, 0x00]),
        }
    }
}

/// A note event at an absolute tick, before delta-time conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { tick: u64, pitch: u8, velocity: u8 },
    NoteOff { tick: u64, pitch: u8 },
}

impl NoteEvent {
    pub fn tick(&self) -> u64 {
        match *self {
            NoteEvent::NoteOn { tick, .. } | NoteEvent::NoteOff { tick, .. } => tick,
        }
    }

    pub fn pitch(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { pitch, .. } | NoteEvent::NoteOff { pitch, .. } => pitch,
        }
    }

    /// Channel message for this note on `channel`
    pub fn to_midi(&self, channel: u8) -> MidiEvent {
        match *self {
            NoteEvent::NoteOn {
                pitch, velocity, ..
            } => MidiEvent::NoteOn {
                channel,
                note: pitch,
                velocity,
            },
            NoteEvent::NoteOff { pitch, .. } => MidiEvent::NoteOff {
                channel,
                note: pitch,
            },
        }
    }

    /// Track order: by tick, Note-Off before Note-On at equal ticks
    pub fn track_order(&self, other: &Self) -> Ordering {
        self.tick()
            .cmp(&other.tick())
            .then_with(|| self.is_on().cmp(&other.is_on()))
    }

    fn is_on(&self) -> bool {
        matches!(self, NoteEvent::NoteOn { .. })
    }
}
