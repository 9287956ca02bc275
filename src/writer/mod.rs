//! Buffered delivery of metric points to a remote sink

pub mod batch_writer;

pub use batch_writer::{BatchWriter, WriterState, MAX_RETRY_COUNT, RETRY_DELAY};
