//! Instruction set: argument layouts and the opcode table.

pub mod args;
pub mod table;

pub use args::{ArgShape, Args, decode_imm};
pub use table::{INSTRUCTIONS, INVALID, Instruction, defined, lookup, opcode};
