//! Property-based tests for the ownership gate.
