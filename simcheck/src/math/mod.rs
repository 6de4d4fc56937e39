//! Numeric helpers shared by the analysis pipelines.

pub mod statistics;
