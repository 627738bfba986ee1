//! Graphwatch daemon library.
//!
//! Wires the normalizer, graph writer, and detection engine into a running
//! service: a queue-consumer loop fed by a TCP line intake, an optional
//! periodic detection sweep, and a Prometheus metrics endpoint.
//!
//! ```text
//! TCP intake -> mpsc queue -> consumer -> Normalizer -> GraphWriter -> store
//!                                                  detection sweep -> AlertStore
//! ```

pub mod cli;
pub mod consumer;
pub mod intake;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;

pub use consumer::{Envelope, Ingestor};
pub use orchestrator::Orchestrator;
