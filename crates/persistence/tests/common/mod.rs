//! Test infrastructure for the persistence layer.
//!
//! This module provides a temporary store harness, record fixtures and assertion
//! helpers shared by the integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
