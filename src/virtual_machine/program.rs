//! Frame-based program representation and serialization.
//!
//! A [`Program`] is an ordered list of frames; each frame is an opcode byte
//! followed by its operands, or a flag declaration `[FLAG_IDENTIFIER, label]`.
//! Programs are produced elsewhere and only consumed here, either directly
//! as frames or from the binary file format written by [`Program::to_bytes`].

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{FLAG_IDENTIFIER, Instruction};
use std::fs;
use std::path::Path;

/// Magic bytes identifying a serialized frame program.
const MAGIC: &[u8; 5] = b"FRAME";

/// Current program file format version.
const CURRENT_VERSION: Version = Version::new(0, 1, 0);

/// Semantic version for file format compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    const fn to_bytes(self) -> [u8; 3] {
        [self.major, self.minor, self.patch]
    }
}

/// One instruction-sized unit of a program.
pub type Frame = Vec<u8>;

/// Ordered sequence of frames indexed from zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    frames: Vec<Frame>,
}

impl Program {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Serializes the program to the portable binary format.
    ///
    /// Layout: magic, version, frame count (`u32` LE), then each frame as a
    /// `u32` LE length followed by its bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let body: usize = self.frames.iter().map(|f| 4 + f.len()).sum();
        let mut out = Vec::with_capacity(MAGIC.len() + 3 + 4 + body);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&CURRENT_VERSION.to_bytes());
        out.extend_from_slice(&(self.frames.len() as u32).to_le_bytes());
        for frame in &self.frames {
            out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            out.extend_from_slice(frame);
        }
        out
    }

    /// Deserializes a program from its binary representation.
    ///
    /// Rejects truncated input, a bad magic header, other format versions and
    /// trailing bytes.
    pub fn from_bytes(input: &[u8]) -> Result<Self, VMError> {
        let mut reader = Reader { input };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(decode_error("bad magic"));
        }

        let version = reader.take(3)?;
        if Version::new(version[0], version[1], version[2]) != CURRENT_VERSION {
            return Err(decode_error("unsupported version"));
        }

        let count = reader.read_u32()? as usize;
        // Every frame needs at least its 4-byte length prefix.
        if count > reader.input.len() / 4 {
            return Err(decode_error("frame count exceeds input"));
        }

        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let len = reader.read_u32()? as usize;
            frames.push(reader.take(len)?.to_vec());
        }

        if !reader.input.is_empty() {
            return Err(decode_error("trailing bytes"));
        }
        Ok(Self { frames })
    }

    /// Reads and decodes a program file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Encodes and writes the program to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<Vec<Frame>> for Program {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

impl FromIterator<Frame> for Program {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Helpers for building frames in code.
pub mod frame {
    use super::*;

    /// `[FLAG_IDENTIFIER, label]`
    pub fn flag(label: u8) -> Frame {
        vec![FLAG_IDENTIFIER, label]
    }

    /// Opcode byte followed by raw operand bytes.
    pub fn op(instr: Instruction, operands: &[u8]) -> Frame {
        let mut frame = Vec::with_capacity(1 + operands.len());
        frame.push(instr as u8);
        frame.extend_from_slice(operands);
        frame
    }

    /// `LOAD rd, imm` with the immediate encoded little-endian.
    pub fn load(rd: u8, imm: u32) -> Frame {
        let mut frame = vec![Instruction::Load as u8, rd];
        frame.extend_from_slice(&imm.to_le_bytes());
        frame
    }

    pub fn halt(status: u8) -> Frame {
        op(Instruction::Halt, &[status])
    }
}

fn decode_error(reason: &str) -> VMError {
    VMError::DecodeError {
        reason: reason.to_string(),
    }
}

/// Cursor over the encoded input.
struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VMError> {
        if self.input.len() < n {
            return Err(decode_error("truncated"));
        }
        let (head, rest) = self.input.split_at(n);
        self.input = rest;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32, VMError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
