//! Flag table: resolution of symbolic jump targets.
//!
//! A flag frame `[FLAG_IDENTIFIER, label]` declares that `label` names the
//! frame's own index. The table is rebuilt from scratch on every attach and
//! at the start of every run; when a label is declared twice the later
//! declaration wins.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::FLAG_IDENTIFIER;
use crate::virtual_machine::program::Program;
use std::collections::BTreeMap;

/// Returns true if `frame` is a flag declaration.
#[inline]
pub fn is_flag_frame(frame: &[u8]) -> bool {
    frame.first() == Some(&FLAG_IDENTIFIER)
}

/// Mapping from flag label to the index of the frame that declared it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagTable {
    entries: BTreeMap<u8, usize>,
}

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `program` once and builds its table.
    pub fn build(program: &Program) -> Result<Self, VMError> {
        let mut table = Self::new();
        table.rebuild(program)?;
        Ok(table)
    }

    /// Clears the table and re-scans `program`.
    ///
    /// A flag frame must carry a label byte and must not be directly followed
    /// by another flag frame. On error the table is left empty.
    pub fn rebuild(&mut self, program: &Program) -> Result<(), VMError> {
        self.clear();
        let frames = program.frames();
        for (index, frame) in frames.iter().enumerate() {
            if !is_flag_frame(frame) {
                continue;
            }
            let Some(&label) = frame.get(1) else {
                self.clear();
                return Err(VMError::MissingFlagLabel { index });
            };
            if frames.get(index + 1).is_some_and(|next| is_flag_frame(next)) {
                self.clear();
                return Err(VMError::DoubledFlagMarker { index });
            }
            self.entries.insert(label, index);
        }
        Ok(())
    }

    /// Returns the frame index declared for `label`.
    pub fn resolve(&self, label: u8) -> Result<usize, VMError> {
        self.entries
            .get(&label)
            .copied()
            .ok_or(VMError::UndefinedFlag { label })
    }

    pub fn get(&self, label: u8) -> Option<usize> {
        self.entries.get(&label).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates `(label, index)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.entries.iter().map(|(&label, &index)| (label, index))
    }
}
