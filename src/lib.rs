//! Quoteflow — inbound quotation request processing pipeline.

pub mod config;
pub mod emitter;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod mailbox;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod routing;
pub mod sink;
