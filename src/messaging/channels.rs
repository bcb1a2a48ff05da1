// Communication channels lock-free

use crate::messaging::render::RenderEvent;
use ringbuf::traits::Producer;
use ringbuf::{HeapRb, traits::Split};

pub type RenderProducer = ringbuf::HeapProd<RenderEvent>;
pub type RenderConsumer = ringbuf::HeapCons<RenderEvent>;

pub fn create_render_channel(capacity: usize) -> (RenderProducer, RenderConsumer) {
    let rb = HeapRb::<RenderEvent>::new(capacity.max(1));
    rb.split()
}

/// Push without blocking; a full channel drops the event
///
/// Returns whether the event was queued.
pub fn push_render_event(producer: &mut RenderProducer, event: RenderEvent) -> bool {
    if producer.try_push(event).is_err() {
        log::warn!("Render channel full, dropping {:?}", event);
        return false;
    }
    true
}
