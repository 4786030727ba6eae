//! Frame-based bytecode virtual machine.
//!
//! Provides the machine itself, its program file format and a small logging layer.

pub mod utils;
pub mod virtual_machine;
