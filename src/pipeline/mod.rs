//! The quotation processing pipeline: shared types and the scheduled
//! dispatcher.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{Dispatcher, spawn_dispatcher};
