//! This crate contains the tracing primitives used to instrument the deployment label check
//! operator: console output and rolling file output, each with its own level filter.
pub mod tracing;

pub use tracing::Tracing;
