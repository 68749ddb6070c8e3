use std::ops::{Index, IndexMut};

use anyhow::{Result, ensure};

pub const NO_OF_REGISTERS: usize = 13;
pub const REG_SIZE_BYTES: usize = 8;

/// The 13 general purpose 64-bit registers.
///
/// Indexing takes the raw operand value from the instruction stream; anything
/// past the last register resolves to the last register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [u64; NO_OF_REGISTERS],
}

impl Registers {
    pub const fn new(regs: [u64; NO_OF_REGISTERS]) -> Self {
        Self { regs }
    }

    #[inline]
    fn slot(index: u32) -> usize {
        (index as usize).min(NO_OF_REGISTERS - 1)
    }

    #[inline]
    pub fn get(&self, index: u32) -> u64 {
        self.regs[Self::slot(index)]
    }

    #[inline]
    pub fn set(&mut self, index: u32, value: u64) {
        self.regs[Self::slot(index)] = value;
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.regs
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.regs.to_vec()
    }

    /// Build from a slice that must hold exactly [`NO_OF_REGISTERS`] values.
    pub fn from_slice(values: &[u64]) -> Result<Self> {
        ensure!(
            values.len() == NO_OF_REGISTERS,
            "mismatching registers count, got: {}, expected: {}",
            values.len(),
            NO_OF_REGISTERS
        );
        let mut regs = [0u64; NO_OF_REGISTERS];
        regs.copy_from_slice(values);
        Ok(Self { regs })
    }

    /// Parse little-endian 8-byte slots.
    pub fn from_flat(flat: &[u8]) -> Result<Self> {
        let expected = NO_OF_REGISTERS * REG_SIZE_BYTES;
        ensure!(
            flat.len() == expected,
            "mismatching registers size, got: {}, expected: {}",
            flat.len(),
            expected
        );
        let mut regs = [0u64; NO_OF_REGISTERS];
        for (reg, chunk) in regs.iter_mut().zip(flat.chunks_exact(REG_SIZE_BYTES)) {
            let mut buf = [0u8; REG_SIZE_BYTES];
            buf.copy_from_slice(chunk);
            *reg = u64::from_le_bytes(buf);
        }
        Ok(Self { regs })
    }

    pub fn to_flat(&self) -> Vec<u8> {
        self.regs.iter().flat_map(|r| r.to_le_bytes()).collect()
    }
}

impl Index<u32> for Registers {
    type Output = u64;

    #[inline]
    fn index(&self, index: u32) -> &u64 {
        &self.regs[Self::slot(index)]
    }
}

impl IndexMut<u32> for Registers {
    #[inline]
    fn index_mut(&mut self, index: u32) -> &mut u64 {
        &mut self.regs[Self::slot(index)]
    }
}
