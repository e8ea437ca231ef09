//! Dispatch engine, lifecycle hooks, and adapter contract for a
//! transport-agnostic message-processing framework: a `Processor` matches
//! inbound messages against registered `(matcher, handler)` pairs,
//! enforces exactly-one-handler dispatch, and routes unmatched or faulted
//! messages to an optional dead-letter queue (see [`processor::Processor`]
//! for the entry point).
//!
//! Concrete transports and DLQ backends live in sibling crates; this crate
//! only depends on the [`adapter::Adapter`] and [`dlq::Dlq`] traits they
//! implement.

pub mod adapter;
pub mod context;
pub mod dlq;
mod error;
pub mod hooks;
pub mod matcher;
pub mod message;
pub mod processor;
pub mod registry;
pub mod shutdown;
pub mod state;
pub mod test_support;

pub use error::SwitchyardError;
