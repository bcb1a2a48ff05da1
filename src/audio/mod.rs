// Audio boundary - Sound engine collaborator interface

pub mod engine;

pub use engine::{EngineEvent, RecordingEngine, SoundEngine};
