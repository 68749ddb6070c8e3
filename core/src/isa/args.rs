//! Instruction argument shapes and their byte layouts.
//!
//! Every opcode has one [`ArgShape`]. The bytes following the opcode byte are
//! split according to that shape into up to four operand values. Register
//! operands are 4-bit nibbles; immediates are little-endian and sign-extended
//! from their most significant present byte.

use serde::{Deserialize, Serialize};

/// Longest immediate, in bytes.
pub const MAX_IMM_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ArgShape {
    Zero = 0,
    OneImm = 1,
    TwoImm = 2,
    OneOff = 3,
    OneRegOneImm = 4,
    OneRegOneExtImm = 5,
    OneRegTwoImm = 6,
    OneRegOneImmOneOff = 7,
    TwoReg = 8,
    TwoRegOneImm = 9,
    TwoRegOneOff = 10,
    TwoRegTwoImm = 11,
    ThreeReg = 12,
}

impl ArgShape {
    pub const ALL: [ArgShape; 13] = [
        ArgShape::Zero,
        ArgShape::OneImm,
        ArgShape::TwoImm,
        ArgShape::OneOff,
        ArgShape::OneRegOneImm,
        ArgShape::OneRegOneExtImm,
        ArgShape::OneRegTwoImm,
        ArgShape::OneRegOneImmOneOff,
        ArgShape::TwoReg,
        ArgShape::TwoRegOneImm,
        ArgShape::TwoRegOneOff,
        ArgShape::TwoRegTwoImm,
        ArgShape::ThreeReg,
    ];

    /// Minimum number of trailing bytes the shape needs to decode.
    pub const fn required_bytes(self) -> usize {
        match self {
            ArgShape::Zero | ArgShape::OneImm | ArgShape::TwoImm | ArgShape::OneOff => 0,
            ArgShape::OneRegOneExtImm => 9,
            ArgShape::ThreeReg => 2,
            _ => 1,
        }
    }

    /// How many of the four [`Args`] slots carry meaning for this shape.
    pub const fn relevant_args(self) -> usize {
        match self {
            ArgShape::Zero => 0,
            ArgShape::OneImm | ArgShape::OneOff => 1,
            ArgShape::TwoImm | ArgShape::OneRegOneImm | ArgShape::TwoReg => 2,
            ArgShape::TwoRegTwoImm => 4,
            _ => 3,
        }
    }

    /// Decode the operands from the trailing bytes of an instruction.
    ///
    /// Returns `None` when `data` is shorter than [`ArgShape::required_bytes`].
    pub fn decode(self, data: &[u8]) -> Option<Args> {
        if data.len() < self.required_bytes() {
            return None;
        }
        let args = match self {
            ArgShape::Zero => Args::default(),
            ArgShape::OneImm | ArgShape::OneOff => Args::new(decode_imm(data), 0, 0, 0),
            ArgShape::TwoImm => {
                let (first, second) = two_imm(data);
                Args::new(first, second, 0, 0)
            }
            ArgShape::OneRegOneImm => {
                let n = Nibbles::of(data[0]);
                Args::new(n.low, decode_imm(&data[1..]), 0, 0)
            }
            ArgShape::OneRegOneExtImm => {
                let n = Nibbles::of(data[0]);
                Args::new(n.low, decode_u32(&data[1..5]), decode_u32(&data[5..9]), 0)
            }
            ArgShape::OneRegTwoImm | ArgShape::OneRegOneImmOneOff => {
                let n = Nibbles::of(data[0]);
                let split = 1 + clamp_len(n.high);
                let (imm, rest) = split_at_clamped(data, split);
                Args::new(n.low, decode_imm(&imm[1..]), decode_imm(rest), 0)
            }
            ArgShape::TwoReg => {
                let n = Nibbles::of(data[0]);
                Args::new(n.high, n.low, 0, 0)
            }
            ArgShape::TwoRegOneImm | ArgShape::TwoRegOneOff => {
                let n = Nibbles::of(data[0]);
                Args::new(n.high, n.low, decode_imm(&data[1..]), 0)
            }
            ArgShape::TwoRegTwoImm => {
                let n = Nibbles::of(data[0]);
                let (first, second) = two_imm(&data[1..]);
                Args::new(n.high, n.low, first, second)
            }
            ArgShape::ThreeReg => {
                let ab = Nibbles::of(data[0]);
                let c = Nibbles::of(data[1]);
                Args::new(ab.high, ab.low, c.low, 0)
            }
        };
        Some(args)
    }

    /// Number of trailing bytes an instruction of this shape occupies when
    /// `data` holds everything after the opcode byte. Immediates are greedy up
    /// to [`MAX_IMM_BYTES`]. Used to rebuild a mask for raw code.
    pub fn skip_bytes(self, data: &[u8]) -> usize {
        let greedy = |from: usize| data.len().saturating_sub(from).min(MAX_IMM_BYTES);
        match self {
            ArgShape::Zero => 0,
            ArgShape::OneImm | ArgShape::OneOff => greedy(0),
            ArgShape::TwoImm => match data.first() {
                None => 0,
                Some(&b) => {
                    let fixed = 1 + clamp_len(Nibbles::of(b).low);
                    fixed.min(data.len()) + greedy(fixed)
                }
            },
            ArgShape::OneRegOneImm | ArgShape::TwoRegOneImm | ArgShape::TwoRegOneOff => 1 + greedy(1),
            ArgShape::OneRegOneExtImm => 9,
            ArgShape::OneRegTwoImm | ArgShape::OneRegOneImmOneOff => match data.first() {
                None => 0,
                Some(&b) => {
                    let fixed = 1 + clamp_len(Nibbles::of(b).high);
                    fixed.min(data.len()) + greedy(fixed)
                }
            },
            ArgShape::TwoReg => 1,
            ArgShape::TwoRegTwoImm => match data.get(1) {
                None => data.len(),
                Some(&b) => {
                    let fixed = 2 + clamp_len(Nibbles::of(b).low);
                    fixed.min(data.len()) + greedy(fixed)
                }
            },
            ArgShape::ThreeReg => 2,
        }
    }
}

/// Decoded operand values. Register slots hold raw nibble values (0..=15);
/// clamping to the register file happens on access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Args {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl Args {
    pub const fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

#[derive(Debug, Clone, Copy)]
struct Nibbles {
    low: u32,
    high: u32,
}

impl Nibbles {
    #[inline]
    fn of(byte: u8) -> Self {
        Self {
            low: u32::from(byte & 0x0f),
            high: u32::from(byte >> 4),
        }
    }
}

#[inline]
fn clamp_len(nibble: u32) -> usize {
    (nibble as usize).min(MAX_IMM_BYTES)
}

#[inline]
fn split_at_clamped(data: &[u8], at: usize) -> (&[u8], &[u8]) {
    data.split_at(at.min(data.len()))
}

/// `[len nibble][first imm][second imm]`; an empty slice decodes to zeros.
fn two_imm(data: &[u8]) -> (u32, u32) {
    let Some(&first) = data.first() else {
        return (0, 0);
    };
    let split = 1 + clamp_len(Nibbles::of(first).low);
    let (head, rest) = split_at_clamped(data, split);
    (decode_imm(&head[1..]), decode_imm(rest))
}

/// Little-endian immediate of up to four bytes, sign-extended from the last
/// present byte. Extra bytes are ignored.
pub fn decode_imm(data: &[u8]) -> u32 {
    let data = &data[..data.len().min(MAX_IMM_BYTES)];
    let mut num = 0u32;
    for (i, byte) in data.iter().enumerate() {
        num |= u32::from(*byte) << (i * 8);
    }
    let negative = data.last().is_some_and(|b| b & 0x80 != 0);
    if negative {
        for i in data.len()..MAX_IMM_BYTES {
            num |= 0xff << (i * 8);
        }
    }
    num
}

fn decode_u32(data: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[..4]);
    u32::from_le_bytes(buf)
}
