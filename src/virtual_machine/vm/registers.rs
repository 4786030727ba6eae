use crate::virtual_machine::config::Config;
use crate::virtual_machine::errors::VMError;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 4;

/// Register names by index.
pub const REGISTER_NAMES: [&str; REGISTER_COUNT] = ["EAX", "EBX", "ECX", "EDX"];

/// Register bank: EAX, EBX, ECX and EDX.
///
/// Every stored value is below `2^arch_bits`.
#[derive(Clone, Debug)]
pub(super) struct Registers {
    regs: [u64; REGISTER_COUNT],
    config: Config,
}

impl Registers {
    /// Creates a zeroed bank for the given width.
    pub(super) fn new(config: &Config) -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            config: *config,
        }
    }

    /// Returns the value in register `idx`.
    ///
    /// Returns [`VMError::InvalidRegister`] if `idx` is not in `0..=3`.
    pub(super) fn get(&self, idx: u8) -> Result<u64, VMError> {
        self.regs
            .get(idx as usize)
            .copied()
            .ok_or(VMError::InvalidRegister { index: idx })
    }

    /// Stores `value` into register `idx`.
    ///
    /// The index is checked first, then the width; nothing is written on error.
    pub(super) fn set(&mut self, idx: u8, value: u64) -> Result<(), VMError> {
        let config = self.config;
        let slot = self
            .regs
            .get_mut(idx as usize)
            .ok_or(VMError::InvalidRegister { index: idx })?;
        if !config.fits(value) {
            return Err(VMError::RegisterOverflow {
                value,
                arch_bits: config.arch_bits,
            });
        }
        *slot = value;
        Ok(())
    }

    pub(super) fn values(&self) -> [u64; REGISTER_COUNT] {
        self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(arch_bits: u32) -> Registers {
        Registers::new(&Config::new(arch_bits, 1, 1))
    }

    #[test]
    fn starts_zeroed() {
        assert_eq!(bank(32).values(), [0; REGISTER_COUNT]);
    }

    #[test]
    fn set_then_get() {
        let mut regs = bank(32);
        for idx in 0..REGISTER_COUNT as u8 {
            regs.set(idx, 100 + idx as u64).unwrap();
        }
        assert_eq!(regs.values(), [100, 101, 102, 103]);
        assert_eq!(regs.get(2), Ok(102));
    }

    #[test]
    fn rejects_bad_index() {
        let mut regs = bank(32);
        for idx in [4u8, 5, 200, 255] {
            assert_eq!(regs.set(idx, 1), Err(VMError::InvalidRegister { index: idx }));
            assert_eq!(regs.get(idx), Err(VMError::InvalidRegister { index: idx }));
        }
    }

    #[test]
    fn rejects_values_wider_than_arch() {
        let mut regs = bank(8);
        assert_eq!(
            regs.set(0, 256),
            Err(VMError::RegisterOverflow {
                value: 256,
                arch_bits: 8
            })
        );
        assert_eq!(regs.get(0), Ok(0));
        regs.set(0, 255).unwrap();
        assert_eq!(regs.get(0), Ok(255));
    }

    #[test]
    fn default_arch_ceiling_is_two_to_the_32() {
        let mut regs = bank(32);
        assert!(regs.set(1, u32::MAX as u64).is_ok());
        assert!(matches!(
            regs.set(1, 1 << 32),
            Err(VMError::RegisterOverflow { .. })
        ));
    }

    #[test]
    fn sixty_four_bit_accepts_everything() {
        let mut regs = bank(64);
        regs.set(3, u64::MAX).unwrap();
        assert_eq!(regs.get(3), Ok(u64::MAX));
    }
}
