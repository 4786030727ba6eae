use std::fmt::Display;
use thiserror::Error;

/// Process exit status reported for every fault.
pub const FAULT_EXIT_STATUS: i32 = 3;

/// Classification of a [`VMError`].
///
/// Several error variants can share a kind (e.g. both stack pointer range
/// violations are a [`FaultKind::SegmentationFault`]).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FaultKind {
    EmptyProgram,
    MalformedProgram,
    MalformedFrame,
    StackOverflow,
    StackUnderflow,
    SegmentationFault,
    HeapOutOfBounds,
    InvalidInstructionPointer,
    InvalidRegister,
    RegisterOverflow,
    UnknownOpcode,
    UndefinedFlag,
    InvalidConfig,
    Decode,
    Io,
}

impl FaultKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FaultKind::EmptyProgram => "EmptyProgram",
            FaultKind::MalformedProgram => "MalformedProgram",
            FaultKind::MalformedFrame => "MalformedFrame",
            FaultKind::StackOverflow => "StackOverflow",
            FaultKind::StackUnderflow => "StackUnderflow",
            FaultKind::SegmentationFault => "SegmentationFault",
            FaultKind::HeapOutOfBounds => "HeapOutOfBounds",
            FaultKind::InvalidInstructionPointer => "InvalidInstructionPointer",
            FaultKind::InvalidRegister => "InvalidRegister",
            FaultKind::RegisterOverflow => "RegisterOverflow",
            FaultKind::UnknownOpcode => "UnknownOpcode",
            FaultKind::UndefinedFlag => "UndefinedFlag",
            FaultKind::InvalidConfig => "InvalidConfig",
            FaultKind::Decode => "Decode",
            FaultKind::Io => "Io",
        }
    }
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring, loading or running the VM.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VMError {
    /// `run` was called without frames to execute.
    #[error("no bytecodes to run")]
    EmptyProgram,
    /// A flag frame has no label byte.
    #[error("flag declared at frame {index} has no label")]
    MissingFlagLabel { index: usize },
    /// A flag frame is immediately followed by another flag frame.
    #[error("doubled flag tag but no identifier provided at frame {index}")]
    DoubledFlagMarker { index: usize },
    /// Frame length does not match the operands its opcode declares.
    #[error("{instruction} at frame {index} expects {expected} operand bytes but got {actual}")]
    MalformedFrame {
        instruction: &'static str,
        index: usize,
        expected: usize,
        actual: usize,
    },
    /// Push would move the stack pointer past the stack capacity.
    #[error("stack overflow: pointer {pointer} exceeds stack capacity {capacity}")]
    StackOverflow { pointer: usize, capacity: usize },
    /// Pop with the stack pointer already at the bottom.
    #[error("stack underflow: nothing left to pop")]
    StackUnderflow,
    /// Stack pointer set at or above the stack capacity.
    #[error("segmentation fault: stack pointer {value} exceeds stack capacity {capacity}")]
    StackPointerOverflow { value: i64, capacity: usize },
    /// Stack pointer set below zero.
    #[error("segmentation fault: stack pointer value {value} cannot be lower than 0")]
    StackPointerUnderflow { value: i64 },
    /// Heap access outside the heap capacity.
    #[error("heap address {address} out of bounds (capacity {capacity})")]
    HeapOutOfBounds { address: u64, capacity: usize },
    /// Instruction pointer left the program.
    #[error("segmentation fault: invalid instruction pointer {ip} (program has {len} frames)")]
    InvalidIP { ip: usize, len: usize },
    /// Register index outside `0..=3`.
    #[error("invalid register {index}: expected a number between 0 and 3")]
    InvalidRegister { index: u8 },
    /// Register value does not fit the configured architecture width.
    #[error("value {value} for register exceeds architecture size of {arch_bits} bits")]
    RegisterOverflow { value: u64, arch_bits: u32 },
    /// Opcode byte with no handler.
    #[error("unknown opcode 0x{opcode:02X} at frame {index}")]
    UnknownOpcode { opcode: u8, index: usize },
    /// Jump to a label no flag frame declares.
    #[error("undefined flag label 0x{label:02X}")]
    UndefinedFlag { label: u8 },
    /// Configuration rejected by validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
    /// Failed to decode a program file.
    #[error("decoding error: {reason}")]
    DecodeError { reason: String },
    /// File I/O failure while loading or saving a program.
    #[error("io error on {path}: {reason}")]
    IoError { path: String, reason: String },
}

impl VMError {
    /// Returns the fault kind this error belongs to.
    pub const fn kind(&self) -> FaultKind {
        match self {
            VMError::EmptyProgram => FaultKind::EmptyProgram,
            VMError::MissingFlagLabel { .. } | VMError::DoubledFlagMarker { .. } => {
                FaultKind::MalformedProgram
            }
            VMError::MalformedFrame { .. } => FaultKind::MalformedFrame,
            VMError::StackOverflow { .. } => FaultKind::StackOverflow,
            VMError::StackUnderflow => FaultKind::StackUnderflow,
            VMError::StackPointerOverflow { .. } | VMError::StackPointerUnderflow { .. } => {
                FaultKind::SegmentationFault
            }
            VMError::HeapOutOfBounds { .. } => FaultKind::HeapOutOfBounds,
            VMError::InvalidIP { .. } => FaultKind::InvalidInstructionPointer,
            VMError::InvalidRegister { .. } => FaultKind::InvalidRegister,
            VMError::RegisterOverflow { .. } => FaultKind::RegisterOverflow,
            VMError::UnknownOpcode { .. } => FaultKind::UnknownOpcode,
            VMError::UndefinedFlag { .. } => FaultKind::UndefinedFlag,
            VMError::InvalidConfig { .. } => FaultKind::InvalidConfig,
            VMError::DecodeError { .. } => FaultKind::Decode,
            VMError::IoError { .. } => FaultKind::Io,
        }
    }

    /// Returns the process exit status for this fault.
    ///
    /// All faults collapse to [`FAULT_EXIT_STATUS`].
    pub const fn exit_status(&self) -> i32 {
        FAULT_EXIT_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_stack_pointer_violations_are_segmentation_faults() {
        let above = VMError::StackPointerOverflow {
            value: 256,
            capacity: 256,
        };
        let below = VMError::StackPointerUnderflow { value: -1 };
        assert_eq!(above.kind(), FaultKind::SegmentationFault);
        assert_eq!(below.kind(), FaultKind::SegmentationFault);
        assert_ne!(above.to_string(), below.to_string());
    }

    #[test]
    fn flag_errors_are_malformed_program() {
        assert_eq!(
            VMError::MissingFlagLabel { index: 0 }.kind(),
            FaultKind::MalformedProgram
        );
        assert_eq!(
            VMError::DoubledFlagMarker { index: 3 }.kind(),
            FaultKind::MalformedProgram
        );
    }

    #[test]
    fn every_fault_shares_exit_status() {
        let errors = [
            VMError::EmptyProgram,
            VMError::StackUnderflow,
            VMError::InvalidRegister { index: 9 },
            VMError::UnknownOpcode {
                opcode: 0xEE,
                index: 0,
            },
        ];
        for err in errors {
            assert_eq!(err.exit_status(), FAULT_EXIT_STATUS);
        }
    }

    #[test]
    fn messages_include_context() {
        let err = VMError::UnknownOpcode {
            opcode: 0xAB,
            index: 4,
        };
        assert_eq!(err.to_string(), "unknown opcode 0xAB at frame 4");
        assert_eq!(FaultKind::UnknownOpcode.to_string(), "UnknownOpcode");
    }
}
