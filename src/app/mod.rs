//! Aggregation and output building on top of the spatial core.

pub mod info;
pub mod ingest;
pub mod pipelines;
pub mod stats;
pub mod zip_index;
