//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction list and invokes a callback macro with it. The opcode
//! table and the ISA fingerprint test are generated from it; the dispatch
//! table in `vm.rs` lists each variant explicitly, so an instruction added
//! here without a handler fails the exhaustive match there.
//!
//! This module generates:
//! - The [`Instruction`] enum with opcode mappings
//! - `TryFrom<u8>` for decoding opcodes
//! - Mnemonics and operand byte counts
//!
//! # Frame Format
//!
//! Each frame is `[opcode, operands...]`:
//! - Register operand: 1 byte (0 = EAX, 1 = EBX, 2 = ECX, 3 = EDX)
//! - Immediate u8: 1 byte
//! - Immediate u32: 4 bytes (little-endian)
//! - Label: 1 byte, resolved through the flag table
//!
//! [`FLAG_IDENTIFIER`] (`0xFF`) is reserved for flag frames and is never an opcode.

use crate::virtual_machine::errors::VMError;

/// First byte of a flag (label declaration) frame.
pub const FLAG_IDENTIFIER: u8 = 0xFF;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Machine control
            // =========================
            /// NOP ; does nothing
            Nop = 0x00, "NOP" => [],
            /// HALT status ; halt signal = status (0 keeps the machine running)
            Halt = 0x01, "HALT" => [status: ImmU8],
            // =========================
            // Registers
            // =========================
            /// LOAD rd, imm32 ; rd = imm32
            Load = 0x10, "LOAD" => [rd: Reg, imm: ImmU32],
            /// MOVE rd, rs ; rd = rs
            Move = 0x11, "MOVE" => [rd: Reg, rs: Reg],
            // =========================
            // Arithmetic (wrapping at the architecture width)
            // =========================
            /// ADD rd, rs1, rs2 ; rd = rs1 + rs2
            Add = 0x20, "ADD" => [rd: Reg, rs1: Reg, rs2: Reg],
            /// SUB rd, rs1, rs2 ; rd = rs1 - rs2
            Sub = 0x21, "SUB" => [rd: Reg, rs1: Reg, rs2: Reg],
            /// INC rd ; rd = rd + 1
            Inc = 0x22, "INC" => [rd: Reg],
            /// DEC rd ; rd = rd - 1
            Dec = 0x23, "DEC" => [rd: Reg],
            // =========================
            // Stack
            // =========================
            /// PUSH rs ; push the low byte of rs
            Push = 0x30, "PUSH" => [rs: Reg],
            /// POP rd ; rd = pop()
            Pop = 0x31, "POP" => [rd: Reg],
            /// SETSP rs ; stack pointer = rs
            SetSp = 0x32, "SETSP" => [rs: Reg],
            // =========================
            // Heap
            // =========================
            /// LDH rd, ra ; rd = heap[ra]
            LoadHeap = 0x40, "LDH" => [rd: Reg, ra: Reg],
            /// STH ra, rs ; heap[ra] = low byte of rs
            StoreHeap = 0x41, "STH" => [ra: Reg, rs: Reg],
            // =========================
            // Control Flow
            // =========================
            /// JMP label ; ip = flag(label)
            Jump = 0x50, "JMP" => [label: Label],
            /// JZ rs, label ; if rs == 0 then ip = flag(label)
            JumpZero = 0x51, "JZ" => [rs: Reg, label: Label],
            /// JNZ rs, label ; if rs != 0 then ip = flag(label)
            JumpNotZero = 0x52, "JNZ" => [rs: Reg, label: Label],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        #[repr(u8)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Instruction {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::UnknownOpcode {
                        opcode: value,
                        index: 0,
                    }),
                }
            }
        }

        impl Instruction {
            /// Every instruction in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns the number of operand bytes following the opcode.
            pub const fn operand_size(&self) -> usize {
                match self {
                    $( Instruction::$name => 0 $( + $crate::define_instructions!(@size $kind) )*, )*
                }
            }
        }
    };

    // ---------- sizes ----------
    (@size Reg)    => { 1 };
    (@size ImmU8)  => { 1 };
    (@size Label)  => { 1 };
    (@size ImmU32) => { 4 };
}

for_each_instruction!(define_instructions);
