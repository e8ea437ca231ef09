//! Scoped contexts the dispatch engine hands to hooks and handlers.

mod handling;
mod processing;

pub use handling::HandlingContext;
pub use processing::ProcessingContext;
