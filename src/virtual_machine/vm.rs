//! Core virtual machine implementation.
//!
//! The VM executes a [`Program`] frame by frame against four registers, a byte
//! stack and a byte heap. Each cycle fetches the frame at the instruction
//! pointer, dispatches it, and advances to the next frame unless the handler
//! branched. Execution stops when a handler sets a nonzero halt signal or when
//! any operation faults; a fault leaves the machine exactly as it was when
//! the fault was detected.

mod heap;
mod registers;
mod snapshot;
mod stack;


pub use registers::{REGISTER_COUNT, REGISTER_NAMES};
pub use snapshot::{MachineState, Snapshot};

use crate::virtual_machine::config::Config;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::flags::{FlagTable, is_flag_frame};
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::program::Program;
use crate::{debug, warn};
use heap::Heap;
use registers::Registers;
use stack::Stack;

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        instr = $instr:ident,
        operands = $ops:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $instr {
            $(
                Instruction::$variant => {
                    $( let $field = exec_vm!(@read $ops, $kind); )*
                    $vm.$handler($( $field ),*)
                }
            ),*
        }
    }};

    // Register index, u8 immediate and flag label are all single bytes
    (@read $ops:ident, Reg) => {{ $ops.read_u8() }};
    (@read $ops:ident, ImmU8) => {{ $ops.read_u8() }};
    (@read $ops:ident, Label) => {{ $ops.read_u8() }};

    // Decode a u32 immediate (little-endian, 4 bytes)
    (@read $ops:ident, ImmU32) => {{ $ops.read_u32() }};
}

/// Cursor over a frame's operand bytes.
///
/// The frame length is validated against [`Instruction::operand_size`]
/// before a cursor is created, so reads never run past the end.
struct Operands<'a> {
    bytes: &'a [u8],
}

impl Operands<'_> {
    fn read_u8(&mut self) -> u8 {
        let value = self.bytes[0];
        self.bytes = &self.bytes[1..];
        value
    }

    fn read_u32(&mut self) -> u32 {
        let value = u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]);
        self.bytes = &self.bytes[4..];
        value
    }
}

/// Frame-based bytecode virtual machine.
///
/// A machine is built from a [`Config`], given a program with
/// [`VM::attach_program`] and driven with [`VM::run`]. Instances share nothing,
/// so independent machines can run on separate threads without coordination.
pub struct VM {
    config: Config,
    /// Attached program. Taken out for the duration of a run.
    program: Option<Program>,
    /// Flag label -> frame index for the attached program.
    flags: FlagTable,
    /// Instruction pointer (index of the frame executed next).
    ip: usize,
    /// Branch target set by a jump handler during the current cycle.
    branch: Option<usize>,
    /// Completed cycles since initialization.
    cycles: u64,
    /// Zero while running; the exit status once halted.
    halt: u8,
    registers: Registers,
    stack: Stack,
    heap: Heap,
    state: MachineState,
}

impl Default for VM {
    fn default() -> Self {
        Self::build(Config::default())
    }
}

impl VM {
    /// Creates an initialized machine with no program attached.
    pub fn new(config: Config) -> Result<Self, VMError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Creates a machine and attaches `program` in one step.
    pub fn with_program(config: Config, program: Program) -> Result<Self, VMError> {
        let mut vm = Self::new(config)?;
        vm.attach_program(program)?;
        Ok(vm)
    }

    fn build(config: Config) -> Self {
        Self {
            config,
            program: None,
            flags: FlagTable::new(),
            ip: 0,
            branch: None,
            cycles: 0,
            halt: 0,
            registers: Registers::new(&config),
            stack: Stack::new(config.stack_size),
            heap: Heap::new(config.heap_size),
            state: MachineState::Ready,
        }
    }

    /// Resets pointers, cycle counter, registers and halt signal, and
    /// reallocates the heap and stack with the sizes in `config`.
    ///
    /// An attached program stays attached; the flag table is not touched.
    pub fn initialize(&mut self, config: Config) -> Result<(), VMError> {
        config.validate()?;
        let program = self.program.take();
        let flags = std::mem::take(&mut self.flags);
        *self = Self::build(config);
        self.program = program;
        self.flags = flags;
        Ok(())
    }

    /// Replaces the program, rebuilds the flag table and resets the
    /// instruction pointer.
    ///
    /// A program with malformed flag declarations is rejected and the
    /// previously attached program is kept.
    pub fn attach_program(&mut self, program: Program) -> Result<(), VMError> {
        let flags = FlagTable::build(&program)?;
        self.program = Some(program);
        self.flags = flags;
        self.ip = 0;
        self.state = MachineState::Ready;
        Ok(())
    }

    /// Rebuilds the flag table from the attached program.
    ///
    /// Does nothing when no program is attached.
    pub fn rebuild_flag_table(&mut self) -> Result<(), VMError> {
        match &self.program {
            Some(program) => self.flags.rebuild(program),
            None => Ok(()),
        }
    }

    /// Attaches `program` and runs it.
    pub fn run_program(&mut self, program: Program) -> Result<u8, VMError> {
        if program.is_empty() {
            return Err(VMError::EmptyProgram);
        }
        self.attach_program(program)
            .map_err(|err| self.record_fault(err))?;
        self.run()
    }

    /// Executes the attached program until it halts or faults.
    ///
    /// Returns the halt signal on success. Faults are returned as errors and
    /// leave the machine in [`MachineState::Faulted`].
    pub fn run(&mut self) -> Result<u8, VMError> {
        let program = match self.program.take() {
            Some(program) if !program.is_empty() => program,
            other => {
                self.program = other;
                return Err(VMError::EmptyProgram);
            }
        };

        let result = self.execute(&program);
        self.program = Some(program);
        result.map_err(|err| self.record_fault(err))
    }

    fn execute(&mut self, program: &Program) -> Result<u8, VMError> {
        self.stack.set_pointer(0)?;
        self.ip = 0;
        self.branch = None;
        self.halt = 0;
        self.flags.rebuild(program)?;
        self.state = MachineState::Running;

        debug!(
            "run started ({} frames, {} flags)",
            program.len(),
            self.flags.len()
        );

        while self.halt == 0 {
            self.cycle(program)?;
        }

        self.state = MachineState::Halted(self.halt);
        debug!(
            "program finished with exit code : {} after {} cycles",
            self.halt, self.cycles
        );
        Ok(self.halt)
    }

    /// Runs one fetch-execute cycle.
    fn cycle(&mut self, program: &Program) -> Result<(), VMError> {
        let index = self.ip;
        let frame = program.get(index).ok_or(VMError::InvalidIP {
            ip: index,
            len: program.len(),
        })?;

        // Empty frames and flag declarations only advance the pointer.
        if !frame.is_empty() && !is_flag_frame(frame) {
            let opcode = frame[0];
            let instr = Instruction::try_from(opcode)
                .map_err(|_| VMError::UnknownOpcode { opcode, index })?;
            let operands = &frame[1..];
            if operands.len() != instr.operand_size() {
                return Err(VMError::MalformedFrame {
                    instruction: instr.mnemonic(),
                    index,
                    expected: instr.operand_size(),
                    actual: operands.len(),
                });
            }
            self.exec(instr, Operands { bytes: operands })?;
        }

        self.cycles += 1;
        if self.halt != 0 {
            return Ok(());
        }

        let next = self.branch.take().unwrap_or(index + 1);
        if next >= program.len() {
            return Err(VMError::InvalidIP {
                ip: next,
                len: program.len(),
            });
        }
        self.ip = next;
        Ok(())
    }

    /// Executes a single instruction.
    fn exec(&mut self, instruction: Instruction, mut operands: Operands) -> Result<(), VMError> {
        exec_vm! {
            vm = self,
            instr = instruction,
            operands = operands,
            {
                // Machine control
                Nop => op_nop(),
                Halt => op_halt(status: ImmU8),
                // Registers
                Load => op_load(rd: Reg, imm: ImmU32),
                Move => op_move(rd: Reg, rs: Reg),
                // Arithmetic
                Add => op_add(rd: Reg, rs1: Reg, rs2: Reg),
                Sub => op_sub(rd: Reg, rs1: Reg, rs2: Reg),
                Inc => op_inc(rd: Reg),
                Dec => op_dec(rd: Reg),
                // Stack
                Push => op_push(rs: Reg),
                Pop => op_pop(rd: Reg),
                SetSp => op_set_sp(rs: Reg),
                // Heap
                LoadHeap => op_load_heap(rd: Reg, ra: Reg),
                StoreHeap => op_store_heap(ra: Reg, rs: Reg),
                // Control Flow
                Jump => op_jump(label: Label),
                JumpZero => op_jump_zero(rs: Reg, label: Label),
                JumpNotZero => op_jump_not_zero(rs: Reg, label: Label),
            }
        }
    }

    fn record_fault(&mut self, err: VMError) -> VMError {
        self.state = MachineState::Faulted(err.kind());
        warn!(
            "fault {} at frame {} after {} cycles: {}",
            err.kind(),
            self.ip,
            self.cycles,
            err
        );
        err
    }

    // ==================== Memory and registers ====================

    /// Pushes `value`, faulting with `StackOverflow` when the stack is full.
    pub fn push(&mut self, value: u8) -> Result<(), VMError> {
        self.stack.push(value)
    }

    /// Pops the top value, faulting with `StackUnderflow` at the bottom.
    pub fn pop(&mut self) -> Result<u8, VMError> {
        self.stack.pop()
    }

    /// Moves the stack pointer, faulting with a segmentation fault when
    /// `value` is negative or not below the stack capacity.
    pub fn set_stack_pointer(&mut self, value: i64) -> Result<(), VMError> {
        self.stack.set_pointer(value)
    }

    /// Writes register `index` (0 = EAX .. 3 = EDX).
    pub fn set_register(&mut self, index: u8, value: u64) -> Result<(), VMError> {
        self.registers.set(index, value)
    }

    /// Reads register `index`.
    pub fn register(&self, index: u8) -> Result<u64, VMError> {
        self.registers.get(index)
    }

    pub fn heap_read(&self, address: u64) -> Result<u8, VMError> {
        self.heap.read(address)
    }

    pub fn heap_write(&mut self, address: u64, value: u8) -> Result<(), VMError> {
        self.heap.write(address, value)
    }

    // ==================== Inspection ====================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn flag_table(&self) -> &FlagTable {
        &self.flags
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn halt_signal(&self) -> u8 {
        self.halt
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn stack(&self) -> &[u8] {
        self.stack.as_slice()
    }

    pub fn heap(&self) -> &[u8] {
        self.heap.as_slice()
    }

    /// Returns a copy of the observable machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            registers: self.registers.values(),
            stack_pointer: self.stack.pointer(),
            instruction_pointer: self.ip,
            cycles: self.cycles,
            halt_signal: self.halt,
            flags: self.flags.iter().collect(),
        }
    }

    // ==================== Handlers ====================

    fn op_nop(&mut self) -> Result<(), VMError> {
        Ok(())
    }

    fn op_halt(&mut self, status: u8) -> Result<(), VMError> {
        self.halt = status;
        Ok(())
    }

    fn op_load(&mut self, dst: u8, imm: u32) -> Result<(), VMError> {
        self.registers.set(dst, imm as u64)
    }

    fn op_move(&mut self, dst: u8, src: u8) -> Result<(), VMError> {
        let value = self.registers.get(src)?;
        self.registers.set(dst, value)
    }

    fn op_add(&mut self, dst: u8, a: u8, b: u8) -> Result<(), VMError> {
        let va = self.registers.get(a)?;
        let vb = self.registers.get(b)?;
        self.registers
            .set(dst, self.config.truncate(va.wrapping_add(vb)))
    }

    fn op_sub(&mut self, dst: u8, a: u8, b: u8) -> Result<(), VMError> {
        let va = self.registers.get(a)?;
        let vb = self.registers.get(b)?;
        self.registers
            .set(dst, self.config.truncate(va.wrapping_sub(vb)))
    }

    fn op_inc(&mut self, dst: u8) -> Result<(), VMError> {
        let value = self.registers.get(dst)?;
        self.registers
            .set(dst, self.config.truncate(value.wrapping_add(1)))
    }

    fn op_dec(&mut self, dst: u8) -> Result<(), VMError> {
        let value = self.registers.get(dst)?;
        self.registers
            .set(dst, self.config.truncate(value.wrapping_sub(1)))
    }

    fn op_push(&mut self, src: u8) -> Result<(), VMError> {
        let value = self.registers.get(src)?;
        self.stack.push(value as u8)
    }

    fn op_pop(&mut self, dst: u8) -> Result<(), VMError> {
        // Register write is validated before the pointer moves.
        let value = self.stack.peek()?;
        self.registers.set(dst, value as u64)?;
        self.stack.pop().map(|_| ())
    }

    fn op_set_sp(&mut self, src: u8) -> Result<(), VMError> {
        let value = self.registers.get(src)?;
        self.stack
            .set_pointer(i64::try_from(value).unwrap_or(i64::MAX))
    }

    fn op_load_heap(&mut self, dst: u8, addr: u8) -> Result<(), VMError> {
        let address = self.registers.get(addr)?;
        let value = self.heap.read(address)?;
        self.registers.set(dst, value as u64)
    }

    fn op_store_heap(&mut self, addr: u8, src: u8) -> Result<(), VMError> {
        let address = self.registers.get(addr)?;
        let value = self.registers.get(src)?;
        self.heap.write(address, value as u8)
    }

    fn op_jump(&mut self, label: u8) -> Result<(), VMError> {
        self.branch = Some(self.flags.resolve(label)?);
        Ok(())
    }

    fn op_jump_zero(&mut self, src: u8, label: u8) -> Result<(), VMError> {
        if self.registers.get(src)? == 0 {
            self.branch = Some(self.flags.resolve(label)?);
        }
        Ok(())
    }

    fn op_jump_not_zero(&mut self, src: u8, label: u8) -> Result<(), VMError> {
        if self.registers.get(src)? != 0 {
            self.branch = Some(self.flags.resolve(label)?);
        }
        Ok(())
    }
}
