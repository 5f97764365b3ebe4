//! Batch orchestration for oligocalc.
//!
//! Ties the melt calculator client to CSV input/output: one remote call per
//! input row, results appended to the row, output flushed as it goes.

pub mod batch;
