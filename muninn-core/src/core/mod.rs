//! Core types shared by every pipeline stage

pub mod errors;
pub mod types;

pub use errors::{ComputeError, IngestError, TransportError};
pub use types::{now_ms, Domain, Sample};
