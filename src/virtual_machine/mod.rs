//! Frame-based bytecode virtual machine.
//!
//! A program is an ordered list of frames. Each frame is one instruction
//! (`[opcode, operands...]`) or one flag declaration (`[0xFF, label]`).
//! Flags are resolved once per run into a label -> frame index table, and
//! jumps go through that table instead of raw offsets.
//!
//! # Architecture
//!
//! - **Registers**: four general-purpose registers (`EAX`, `EBX`, `ECX`, `EDX`),
//!   each bounded by the configured architecture width
//! - **Stack**: fixed-capacity byte stack with a pre-incrementing pointer
//! - **Heap**: fixed-capacity byte array addressed by register value
//! - **Halting**: a nonzero halt signal stops the machine and is its exit status
//!
//! # Modules
//!
//! - [`config`]: Architecture width and buffer sizes
//! - [`errors`]: Fault types and exit status mapping
//! - [`flags`]: Flag frame detection and the label table
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`program`]: Program container and binary file format
//! - [`vm`]: Machine state and the fetch-execute loop

pub mod config;
pub mod errors;
pub mod flags;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod program;
pub mod vm;
