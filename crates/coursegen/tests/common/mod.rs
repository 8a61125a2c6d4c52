//! Shared test utilities for coursegen integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an in-memory database to an orchestrator
//! - `ScriptedTransformer` for counting and failing transformation calls
//! - Builders for course outlines and pipeline configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{ScriptedTransformer, TestHarness};
