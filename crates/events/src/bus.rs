//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the transport layer for events *after* they have been appended
//! to the event store. It is deliberately lightweight:
//!
//! - **Transport-agnostic**: in-memory channels today, a broker later.
//! - **At-least-once delivery**: consumers must tolerate duplicates.
//! - **No persistence**: the store is the source of truth; the bus only
//!   distributes.
//!
//! At-least-once is acceptable here because events land in the store before
//! they are published, and every consumer (projections, advisory triggers)
//! is idempotent. If publication fails the events are still persisted and
//! can be replayed.

use std::sync::mpsc::Receiver;
use std::time::Duration;
use std::sync::Arc;

/// A subscription to an event stream.
///
/// Each subscription receives a copy of every message published to the bus
/// (broadcast semantics). Subscriptions are designed for single-threaded
/// consumption; give each consumer thread its own subscription.
///
/// Typical consumer loop:
///
/// ```ignore
/// let sub = bus.subscribe();
/// loop {
///     match sub.recv_timeout(Duration::from_millis(200)) {
///         Ok(envelope) => project(envelope),
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// Sits between the event store and its consumers:
///
/// ```text
/// Command → Event Store (append) → Event Bus (publish) → Consumers
///                                                           ├─ Projections
///                                                           ├─ Realtime feed
///                                                           └─ Advisory runner
/// ```
///
/// `publish()` can fail (bus full, lock poisoned). Failures surface to the
/// caller, typically the command dispatcher; since the events are already
/// persisted, re-publishing is safe.
///
/// Implementations must be `Send + Sync` so multiple threads can publish
/// concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
