// Messaging - Lock-free channel from the transport to the renderer

pub mod channels;
pub mod render;

pub use channels::{RenderConsumer, RenderProducer, create_render_channel, push_render_event};
pub use render::RenderEvent;
