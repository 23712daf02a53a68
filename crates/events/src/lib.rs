//! `stockpilot-events` — event contracts and pub/sub mechanics.
//!
//! The write model appends events to the store; this crate defines what an
//! event looks like in transit (`Event`, `EventEnvelope`) and how consumers
//! receive it (`EventBus`, `Subscription`, `InMemoryEventBus`).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
