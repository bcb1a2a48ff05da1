// Event queue - Time-ordered queue of scheduled transport events
// Every event carries the session epoch it was scheduled under

use crate::sequencer::pattern::Lane;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Something the transport will do at a scheduled time
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Schedule the contents of a 0-indexed bar
    BarStart { bar: usize },
    /// The bar is over; advance and resolve what comes next
    BarEnd { bar: usize },
    ChordHighlight { bar: usize, chord: usize },
    StepHighlight { bar: usize, step: usize },
    /// `voice` pairs the note-on with the note-off that ends it
    NoteOn {
        lane: Lane,
        pitch: u8,
        velocity: u8,
        voice: u64,
    },
    NoteOff { lane: Lane, pitch: u8, voice: u64 },
}

/// An event with its absolute fire time (seconds) and session epoch
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: f64,
    pub epoch: u64,
    seq: u64,
    pub event: TransportEvent,
}

impl TransportEvent {
    /// Releases sort ahead of everything else due at the same instant
    fn rank(&self) -> u8 {
        match self {
            TransportEvent::NoteOff { .. } => 0,
            _ => 1,
        }
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed so the BinaryHeap pops the earliest time first; at equal
    // times note-offs go first, then insertion order
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.event.rank().cmp(&self.event.rank()))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-queue on (time, insertion order)
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
    next_voice: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an event at an absolute time
    pub fn push(&mut self, time: f64, epoch: u64, event: TransportEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent {
            time,
            epoch,
            seq,
            event,
        });
    }

    /// Schedule a note-on at `at` and the note-off that ends it at `end`
    ///
    /// Returns the voice id shared by the pair.
    pub fn push_note(
        &mut self,
        epoch: u64,
        lane: Lane,
        pitch: u8,
        velocity: u8,
        at: f64,
        end: f64,
    ) -> u64 {
        self.next_voice += 1;
        let voice = self.next_voice;
        self.push(
            at,
            epoch,
            TransportEvent::NoteOn {
                lane,
                pitch,
                velocity,
                voice,
            },
        );
        self.push(end, epoch, TransportEvent::NoteOff { lane, pitch, voice });
        voice
    }

    /// Pop the earliest event if it is due at `now`
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledEvent> {
        if self.heap.peek()?.time <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Fire time of the earliest event
    pub fn next_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.time)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
