// MIDI module
// Event encoding, variable-length quantities and Standard MIDI File export

pub mod event;
pub mod export;
pub mod smf;
pub mod vlq;

pub use event::{MidiEvent, NoteEvent};
pub use export::{ExportError, ExportScope, MidiExporter};
pub use smf::write_smf;
