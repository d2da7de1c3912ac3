//! Property-based tests for batch termination and accounting

mod batch_termination;
