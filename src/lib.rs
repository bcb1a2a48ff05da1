// Chord Studio - Library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod midi;
pub mod project;
pub mod sequencer;
pub mod theory;

// Re-export commonly used types for convenience
pub use audio::engine::{RecordingEngine, SoundEngine};
pub use config::{ConfigError, EngineConfig};
pub use messaging::channels::create_render_channel;
pub use messaging::render::RenderEvent;
pub use midi::{ExportError, ExportScope, MidiExporter};
pub use project::{Project, ProjectError, ProjectManager};
pub use sequencer::{
    ArpeggiatorConfig, Chord, Lane, LoopRange, MelodyNote, Pattern, PatternName, Song, Tempo,
    TimelineError, Transport, TransportState,
};
pub use theory::{TheoryError, detect_chord, parse_chord, parse_progression};
