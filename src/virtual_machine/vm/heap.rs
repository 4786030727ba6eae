use crate::virtual_machine::errors::VMError;

/// Flat byte-addressed heap.
///
/// Bounds are checked against the heap's own capacity on every access,
/// independent of the stack.
#[derive(Clone, Debug)]
pub(super) struct Heap {
    memory: Vec<u8>,
}

impl Heap {
    /// Creates a zero-filled heap of `capacity` bytes.
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            memory: vec![0; capacity],
        }
    }

    pub(super) fn capacity(&self) -> usize {
        self.memory.len()
    }

    fn check(&self, address: u64) -> Result<usize, VMError> {
        usize::try_from(address)
            .ok()
            .filter(|&addr| addr < self.capacity())
            .ok_or(VMError::HeapOutOfBounds {
                address,
                capacity: self.capacity(),
            })
    }

    /// Reads the byte at `address`.
    pub(super) fn read(&self, address: u64) -> Result<u8, VMError> {
        let addr = self.check(address)?;
        Ok(self.memory[addr])
    }

    /// Writes `value` at `address`.
    pub(super) fn write(&mut self, address: u64, value: u8) -> Result<(), VMError> {
        let addr = self.check(address)?;
        self.memory[addr] = value;
        Ok(())
    }

    pub(super) fn as_slice(&self) -> &[u8] {
        &self.memory
    }
}
