//! Machine configuration.
//!
//! Values come from [`Config::default`], optionally overridden by the
//! environment ([`Config::from_env`]) and then by the driver's flags.

use crate::virtual_machine::errors::VMError;

/// Default register width in bits.
pub const DEFAULT_ARCH_BITS: u32 = 32;
/// Default heap capacity in bytes.
pub const DEFAULT_HEAP_SIZE: usize = 1 << 8;
/// Default stack capacity in bytes.
pub const DEFAULT_STACK_SIZE: usize = 1 << 8;
/// Widest supported register (register slots are `u64`).
pub const MAX_ARCH_BITS: u32 = 64;

pub const ARCH_BITS_ENV: &str = "FRAMEVM_ARCH_BITS";
pub const HEAP_SIZE_ENV: &str = "FRAMEVM_HEAP_SIZE";
pub const STACK_SIZE_ENV: &str = "FRAMEVM_STACK_SIZE";

/// Sizes the machine is initialized with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Register value ceiling: every register holds a value `< 2^arch_bits`.
    pub arch_bits: u32,
    /// Heap capacity in bytes.
    pub heap_size: usize,
    /// Stack capacity in bytes.
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arch_bits: DEFAULT_ARCH_BITS,
            heap_size: DEFAULT_HEAP_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl Config {
    pub const fn new(arch_bits: u32, heap_size: usize, stack_size: usize) -> Self {
        Self {
            arch_bits,
            heap_size,
            stack_size,
        }
    }

    /// Builds the default config with any `FRAMEVM_*` overrides applied.
    pub fn from_env() -> Result<Self, VMError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VMError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(ARCH_BITS_ENV) {
            config.arch_bits = parse_setting(ARCH_BITS_ENV, &v)?;
        }
        if let Some(v) = lookup(HEAP_SIZE_ENV) {
            config.heap_size = parse_setting(HEAP_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(STACK_SIZE_ENV) {
            config.stack_size = parse_setting(STACK_SIZE_ENV, &v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects widths and sizes the machine cannot be built with.
    pub fn validate(&self) -> Result<(), VMError> {
        if self.arch_bits == 0 || self.arch_bits > MAX_ARCH_BITS {
            return Err(VMError::InvalidConfig {
                reason: format!(
                    "architecture must be between 1 and {MAX_ARCH_BITS} bits, got {}",
                    self.arch_bits
                ),
            });
        }
        if self.heap_size == 0 {
            return Err(VMError::InvalidConfig {
                reason: "heap size must be at least 1 byte".to_string(),
            });
        }
        if self.stack_size == 0 {
            return Err(VMError::InvalidConfig {
                reason: "stack size must be at least 1 byte".to_string(),
            });
        }
        Ok(())
    }

    /// Returns true if `value` fits in `arch_bits` bits.
    #[inline]
    pub const fn fits(&self, value: u64) -> bool {
        self.arch_bits >= MAX_ARCH_BITS || value >> self.arch_bits == 0
    }

    /// Reduces `value` modulo `2^arch_bits`.
    #[inline]
    pub const fn truncate(&self, value: u64) -> u64 {
        if self.arch_bits >= MAX_ARCH_BITS {
            value
        } else {
            value & ((1u64 << self.arch_bits) - 1)
        }
    }
}

fn parse_setting<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, VMError> {
    value.trim().parse().map_err(|_| VMError::InvalidConfig {
        reason: format!("{name}: '{value}' is not a valid number"),
    })
}
