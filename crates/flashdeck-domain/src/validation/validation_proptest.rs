//! Property-based tests for field validators.
