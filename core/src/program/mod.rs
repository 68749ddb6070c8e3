//! Program container decoding.
//!
//! Layout (little-endian):
//!
//! ```text
//! [varint jump table count][u8 jump table item width][varint code length]
//! [count * width jump table bytes][code bytes][ceil(code length / 8) mask bytes]
//! ```

pub mod build;
pub mod spi;

use anyhow::{Context, Result};
use tracing::debug;

use crate::codec::Decoder;
use crate::isa::{Args, Instruction, lookup};

pub type ProgramCounter = u32;

/// Instruction boundaries, unpacked from the container bitmap.
///
/// `bytes_to_skip[i]` is 0 at the first byte of an instruction and counts up
/// over its argument bytes, read backwards from the next boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    bytes_to_skip: Vec<u8>,
}

impl Mask {
    /// Bit `b` of packed byte `i` marks code offset `8 * i + b`.
    pub fn new(packed: &[u8], code_len: usize) -> Self {
        let mut bytes_to_skip = vec![0u8; code_len];
        let mut distance: u8 = 0;
        for (i, bits) in packed.iter().enumerate().rev() {
            for b in (0..8).rev() {
                let offset = i * 8 + b;
                if offset < code_len {
                    let is_set = bits & (1 << b) != 0;
                    distance = if is_set { 0 } else { distance.saturating_add(1) };
                    bytes_to_skip[offset] = distance;
                }
            }
        }
        Self { bytes_to_skip }
    }

    pub fn len(&self) -> usize {
        self.bytes_to_skip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_to_skip.is_empty()
    }

    #[inline]
    pub fn is_instruction(&self, index: ProgramCounter) -> bool {
        self.bytes_to_skip.get(index as usize).is_some_and(|skip| *skip == 0)
    }

    /// Number of argument bytes of the instruction starting at `index`.
    #[inline]
    pub fn args_len(&self, index: ProgramCounter) -> u32 {
        let next = index as usize + 1;
        self.bytes_to_skip.get(next).map_or(0, |skip| u32::from(*skip))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockMark(u8);

impl BlockMark {
    pub const NONE: BlockMark = BlockMark(0);
    pub const START: BlockMark = BlockMark(1 << 1);
    pub const END: BlockMark = BlockMark(1 << 2);

    #[inline]
    pub const fn contains(self, other: BlockMark) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    fn insert(&mut self, other: BlockMark) {
        self.0 |= other.0;
    }
}

/// START/END tags for every code offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlocks {
    marks: Vec<BlockMark>,
}

impl BasicBlocks {
    pub fn new(code: &[u8], mask: &Mask) -> Self {
        let mut marks = vec![BlockMark::NONE; code.len()];
        let mut in_block = false;
        for (i, opcode) in code.iter().enumerate() {
            if !mask.is_instruction(i as ProgramCounter) {
                continue;
            }
            if !in_block {
                in_block = true;
                marks[i].insert(BlockMark::START);
            }
            // a single instruction block is both START and END
            if lookup(*opcode).terminating {
                in_block = false;
                marks[i].insert(BlockMark::END);
            }
        }
        Self { marks }
    }

    #[inline]
    pub fn is_start(&self, pc: ProgramCounter) -> bool {
        self.mark(pc).contains(BlockMark::START)
    }

    #[inline]
    pub fn is_end(&self, pc: ProgramCounter) -> bool {
        self.mark(pc).contains(BlockMark::END)
    }

    #[inline]
    pub fn mark(&self, pc: ProgramCounter) -> BlockMark {
        self.marks.get(pc as usize).copied().unwrap_or_default()
    }
}

/// Dynamic jump targets. Address `2 * (i + 1)` resolves to entry `i`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JumpTable {
    jumps: Vec<ProgramCounter>,
}

impl JumpTable {
    pub fn new(item_bytes: u8, data: &[u8]) -> Self {
        if item_bytes == 0 {
            return Self::default();
        }
        let jumps = data
            .chunks_exact(usize::from(item_bytes))
            .map(|item| item.iter().rev().fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
            .collect();
        Self { jumps }
    }

    pub fn from_targets(jumps: Vec<ProgramCounter>) -> Self {
        Self { jumps }
    }

    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<ProgramCounter> {
        self.jumps.get(index as usize).copied()
    }

    pub fn targets(&self) -> &[ProgramCounter] {
        &self.jumps
    }
}

/// Decoded, immutable program.
#[derive(Debug, Clone)]
pub struct Program {
    pub code: Vec<u8>,
    pub mask: Mask,
    pub jump_table: JumpTable,
    pub basic_blocks: BasicBlocks,
}

impl Program {
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(raw);
        let jump_table_len = decoder.var_u32().context("reading jump table length")?;
        let item_bytes = decoder.u8().context("reading jump table item length")?;
        let code_len = decoder.var_u32().context("reading code length")?;

        let jump_table_bytes = (jump_table_len as usize)
            .checked_mul(usize::from(item_bytes))
            .context("jump table size overflows")?;
        let raw_jump_table = decoder.bytes(jump_table_bytes).context("reading jump table")?;
        let code = decoder.bytes(code_len as usize).context("reading code")?;
        let packed_mask = decoder
            .bytes((code_len as usize).div_ceil(8))
            .context("reading instruction mask")?;

        let mask = Mask::new(packed_mask, code.len());
        let jump_table = JumpTable::new(item_bytes, raw_jump_table);
        let basic_blocks = BasicBlocks::new(code, &mask);
        debug!(
            target: "pvm::program",
            code_len,
            jump_table = jump_table.len(),
            trailing = decoder.remaining(),
            "program.decode"
        );
        Ok(Self {
            code: code.to_vec(),
            mask,
            jump_table,
            basic_blocks,
        })
    }

    /// Walk every instruction boundary in order.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { program: self, pc: 0 }
    }
}

/// One decoded instruction as produced by [`Program::instructions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub pc: ProgramCounter,
    pub opcode: u8,
    pub instruction: &'static Instruction,
    /// `None` when the argument bytes are missing or run past the code.
    pub args: Option<Args>,
    pub args_len: u32,
}

pub struct Instructions<'a> {
    program: &'a Program,
    pc: ProgramCounter,
}

impl Iterator for Instructions<'_> {
    type Item = DecodedInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        let code = &self.program.code;
        let mask = &self.program.mask;
        while (self.pc as usize) < code.len() && !mask.is_instruction(self.pc) {
            self.pc += 1;
        }
        let pc = self.pc;
        let opcode = *code.get(pc as usize)?;
        let instruction = lookup(opcode);
        let args_len = mask.args_len(pc);
        let start = pc as usize + 1;
        let end = start + args_len as usize;
        let args = code.get(start..end).and_then(|data| instruction.shape.decode(data));
        self.pc = pc + 1 + args_len;
        Some(DecodedInstruction {
            pc,
            opcode,
            instruction,
            args,
            args_len,
        })
    }
}
