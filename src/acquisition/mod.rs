//! Signal acquisition module
//!
//! Produces voltage/current pairs from synthetic excitation or recorded CSV
//! files and feeds them into the processing queues.

pub mod csv_loader;
pub mod generator;
mod receiver;
mod source;

pub use csv_loader::LoadError;
pub use generator::{SignalGenerator, SyntheticGenerator};
pub use receiver::{Receiver, ReceiverStats, SignalQueues};
pub use source::{FileSource, SignalSource, SourceEvent, SyntheticSource};
