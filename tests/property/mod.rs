//! Property-based tests for hashing, index persistence and URL mapping

mod determinism;
