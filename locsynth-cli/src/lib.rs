//! CLI library for testing purposes

pub mod report;

pub use report::{RunSummary, TargetRow};
