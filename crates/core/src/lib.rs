//! Core domain types for the insight store
//!
//! This crate contains the record types shared across all other crates.

mod insight;
mod report;

pub use insight::*;
pub use report::*;
