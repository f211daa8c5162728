//! Processing Pipeline Module
//!
//! ```text
//! Receiver ──► voltage queue ─┐
//!          └─► current queue ─┴─► ProcessingLoop ──► ImpedanceCalculator ──► MeasurementSink
//!
//! DirectGenerator ──► circuit model ──► generated CSV + batch emit
//! ```
//!
//! The streaming path runs the receiver and the processing loop as separate
//! tasks joined by two bounded queues. The direct path never touches the
//! transform engine.

pub mod direct;
pub mod output;
mod processing_loop;

pub use direct::{replay_impedance_csv, DirectGenerator, DirectSettings, DirectStats};
pub use output::{
    sink_for_mode, CsvFileSink, HttpSink, JsonFileSink, MeasurementSink, OutputWriter,
};
pub use processing_loop::{LoopStats, ProcessingLoop};
