//! Test doubles shared by unit tests, integration tests and benchmarks.
//!
//! Compiled for `cfg(test)` and behind the `test-util` feature.

pub mod doubles;
pub mod mock_http;
