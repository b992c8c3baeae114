//! Probe output handling
//!
//! This module turns the prober's JSON report into candidate lists:
//! - Deserialization of the ffprobe `-show_streams` report
//! - Duration and frame-count normalisation
//! - Stable partition of streams by kind

pub mod catalog;

pub use catalog::{build_catalog, Catalog, ProbeResult, ProbeStream};
