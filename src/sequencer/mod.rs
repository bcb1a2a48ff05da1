// Sequencer module
// Timeline data model, arpeggiator, pattern chaining and the transport scheduler

pub mod arpeggiator;
pub mod chaining;
pub mod event_queue;
pub mod follow;
pub mod note;
pub mod pattern;
pub mod playhead;
pub mod song;
pub mod style;
pub mod timeline;
pub mod transport;

pub use arpeggiator::{ArpMode, ArpPattern, ArpSpeed, ArpTrigger, ArpeggiatorConfig};
pub use chaining::{ChainAction, ChainInput, next_filled_pattern, resolve};
pub use follow::{
    FollowGenerator, FollowPattern, MelodyGenerator, MelodyGenerators, regenerate_melody,
};
pub use note::{Chord, MelodyNote, note_name};
pub use pattern::{
    Bar, Channel2Mode, Channel2Settings, DrumLane, DrumTrack, Lane, Pattern, PatternBank,
};
pub use playhead::{PlayheadClock, PlayheadPosition, PlayheadSettings};
pub use song::{PlaybackFlags, Song, SongSnapshot};
pub use style::{MelodyStyle, StyleGenerator};
pub use timeline::{LoopRange, MusicalTime, PatternName, Tempo, TimelineError};
pub use transport::{Highlight, Transport, TransportState};
