//! Shared helpers that are not part of the execution core.

pub mod log;
