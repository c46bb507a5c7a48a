//! Event queue between the UI and the player shell.
//!
//! Architecture:
//! - Widgets emit typed events (play/pause, seek, add files, ...) through an
//!   [`EventEmitter`] handle
//! - emit() only queues; nothing runs on the widget's call stack
//! - The shell drains the queue once per frame with poll() and dispatches
//!
//! Queue order is emit order, which is the order the shell applies commands in.

use std::any::Any;
use std::sync::{Arc, Mutex};
use log::warn;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

type Queue = Arc<Mutex<Vec<BoxedEvent>>>;

#[derive(Clone, Default)]
pub struct EventBus {
    queue: Queue,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit<E: Event>(&self, event: E) {
        emit_into(&self.queue, event);
    }

    /// All events emitted since the last poll, in emit order.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Handle for widgets
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Shared emit path for bus and emitter handles
fn emit_into<E: Event>(queue: &Mutex<Vec<BoxedEvent>>, event: E) {
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    if queue.len() >= MAX_QUEUE_SIZE {
        let evict_count = queue.len() / 2;
        warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
        queue.drain(0..evict_count);
    }
    queue.push(Box::new(event));
}

/// Lightweight emitter handle for UI components.
#[derive(Clone)]
pub struct EventEmitter {
    queue: Queue,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        emit_into(&self.queue, event);
    }
}

/// Downcast a queued event to its concrete type.
///
/// Must deref to `dyn Event` before `as_any()`: `Box<dyn Event>` also matches
/// the blanket impl, and calling through the box yields the box's TypeId.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
