//! File-format and network collaborators feeding the pipelines.

pub mod census;
pub mod download;
pub mod gsod;
pub mod isd;
