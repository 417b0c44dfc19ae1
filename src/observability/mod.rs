// Observability: metrics recording

pub mod metrics;

pub use metrics::{init, render};
