use super::registers::{REGISTER_COUNT, REGISTER_NAMES};
use crate::virtual_machine::errors::FaultKind;
use std::fmt;

/// Lifecycle of a machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineState {
    /// Initialized, not yet run (or re-initialized).
    Ready,
    /// Inside the fetch-execute loop.
    Running,
    /// Stopped by a nonzero halt signal.
    Halted(u8),
    /// Stopped by a fault of the given kind.
    Faulted(FaultKind),
}

/// Read-only copy of the machine's observable state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub state: MachineState,
    pub registers: [u64; REGISTER_COUNT],
    pub stack_pointer: usize,
    pub instruction_pointer: usize,
    pub cycles: u64,
    pub halt_signal: u8,
    /// `(label, frame index)` pairs in label order.
    pub flags: Vec<(u8, usize)>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state  {:?}", self.state)?;
        for (name, value) in REGISTER_NAMES.iter().zip(self.registers) {
            writeln!(f, "{name}    0x{value:08X} ({value})")?;
        }
        writeln!(f, "ip     {}", self.instruction_pointer)?;
        writeln!(f, "sp     {}", self.stack_pointer)?;
        writeln!(f, "cycles {}", self.cycles)?;
        write!(f, "flags  [")?;
        for (i, (label, index)) in self.flags.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "0x{label:02X} -> {index}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_registers_and_flags() {
        let snapshot = Snapshot {
            state: MachineState::Halted(1),
            registers: [1, 2, 3, 4],
            stack_pointer: 2,
            instruction_pointer: 5,
            cycles: 9,
            halt_signal: 1,
            flags: vec![(0x01, 1), (0x02, 4)],
        };
        let text = snapshot.to_string();
        assert!(text.contains("EAX    0x00000001 (1)"));
        assert!(text.contains("EDX    0x00000004 (4)"));
        assert!(text.contains("cycles 9"));
        assert!(text.ends_with("flags  [0x01 -> 1, 0x02 -> 4]"));
    }
}
