use crate::virtual_machine::errors::VMError;

/// Fixed-capacity byte stack.
///
/// `0 <= pointer < capacity` holds at all times. `push` pre-increments, so
/// slot 0 is never written by a push and at most `capacity - 1` values fit.
#[derive(Clone, Debug)]
pub(super) struct Stack {
    memory: Vec<u8>,
    pointer: usize,
}

impl Stack {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            memory: vec![0; capacity],
            pointer: 0,
        }
    }

    pub(super) fn capacity(&self) -> usize {
        self.memory.len()
    }

    pub(super) fn pointer(&self) -> usize {
        self.pointer
    }

    /// Moves the stack pointer, rejecting values outside `0..capacity`.
    pub(super) fn set_pointer(&mut self, value: i64) -> Result<(), VMError> {
        if value < 0 {
            return Err(VMError::StackPointerUnderflow { value });
        }
        if value as u64 >= self.capacity() as u64 {
            return Err(VMError::StackPointerOverflow {
                value,
                capacity: self.capacity(),
            });
        }
        self.pointer = value as usize;
        Ok(())
    }

    /// Increments the pointer and writes `value` at the new position.
    pub(super) fn push(&mut self, value: u8) -> Result<(), VMError> {
        let next = self.pointer + 1;
        if next >= self.capacity() {
            return Err(VMError::StackOverflow {
                pointer: next,
                capacity: self.capacity(),
            });
        }
        self.pointer = next;
        self.memory[next] = value;
        Ok(())
    }

    /// Returns the value `pop` would return, without moving the pointer.
    pub(super) fn peek(&self) -> Result<u8, VMError> {
        if self.pointer == 0 {
            return Err(VMError::StackUnderflow);
        }
        Ok(self.memory[self.pointer])
    }

    /// Returns the value at the pointer and decrements it.
    pub(super) fn pop(&mut self) -> Result<u8, VMError> {
        if self.pointer == 0 {
            return Err(VMError::StackUnderflow);
        }
        let value = self.memory[self.pointer];
        self.pointer -= 1;
        Ok(value)
    }

    pub(super) fn as_slice(&self) -> &[u8] {
        &self.memory
    }
}
