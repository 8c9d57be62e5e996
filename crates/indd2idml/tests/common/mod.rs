//! Shared test utilities for indd2idml integration tests.

pub mod harness;

pub use harness::TestHarness;
