//! Property-based tests for the statistical kernels
//!
//! These tests use proptest to verify mathematical invariants across
//! thousands of randomized inputs, catching edge cases that unit tests miss.
