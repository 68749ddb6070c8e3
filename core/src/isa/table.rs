//! Static per-opcode metadata.
//!
//! [`for_each_instruction!`] holds the canonical list. It expands into the
//! [`opcode`] constants and into the rows of the lookup table, so the byte
//! values and the table can never disagree.

use once_cell::sync::Lazy;

use super::args::ArgShape;
use crate::vm::gas::Gas;

/// Metadata of a single opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub name: &'static str,
    pub shape: ArgShape,
    pub gas: Gas,
    /// Ends a basic block: control does not simply fall through.
    pub terminating: bool,
}

impl Instruction {
    #[inline]
    pub fn is_invalid(&self) -> bool {
        std::ptr::eq(self, &INVALID)
    }
}

/// Record for every byte value without an assigned operation.
pub static INVALID: Instruction = Instruction {
    name: "INVALID",
    shape: ArgShape::Zero,
    gas: 1,
    terminating: true,
};

/// Invokes `$callback` with `NAME = opcode, Shape, terminating?;` rows.
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            TRAP = 0, Zero, true;
            FALLTHROUGH = 1, Zero, true;

            ECALLI = 10, OneImm, false;

            LOAD_IMM_64 = 20, OneRegOneExtImm, false;

            STORE_IMM_U8 = 30, TwoImm, false;
            STORE_IMM_U16 = 31, TwoImm, false;
            STORE_IMM_U32 = 32, TwoImm, false;
            STORE_IMM_U64 = 33, TwoImm, false;

            JUMP = 40, OneOff, true;

            JUMP_IND = 50, OneRegOneImm, true;
            LOAD_IMM = 51, OneRegOneImm, false;
            LOAD_U8 = 52, OneRegOneImm, false;
            LOAD_I8 = 53, OneRegOneImm, false;
            LOAD_U16 = 54, OneRegOneImm, false;
            LOAD_I16 = 55, OneRegOneImm, false;
            LOAD_U32 = 56, OneRegOneImm, false;
            LOAD_I32 = 57, OneRegOneImm, false;
            LOAD_U64 = 58, OneRegOneImm, false;
            STORE_U8 = 59, OneRegOneImm, false;
            STORE_U16 = 60, OneRegOneImm, false;
            STORE_U32 = 61, OneRegOneImm, false;
            STORE_U64 = 62, OneRegOneImm, false;

            STORE_IMM_IND_U8 = 70, OneRegTwoImm, false;
            STORE_IMM_IND_U16 = 71, OneRegTwoImm, false;
            STORE_IMM_IND_U32 = 72, OneRegTwoImm, false;
            STORE_IMM_IND_U64 = 73, OneRegTwoImm, false;

            LOAD_IMM_JUMP = 80, OneRegOneImmOneOff, true;
            BRANCH_EQ_IMM = 81, OneRegOneImmOneOff, true;
            BRANCH_NE_IMM = 82, OneRegOneImmOneOff, true;
            BRANCH_LT_U_IMM = 83, OneRegOneImmOneOff, true;
            BRANCH_LE_U_IMM = 84, OneRegOneImmOneOff, true;
            BRANCH_GE_U_IMM = 85, OneRegOneImmOneOff, true;
            BRANCH_GT_U_IMM = 86, OneRegOneImmOneOff, true;
            BRANCH_LT_S_IMM = 87, OneRegOneImmOneOff, true;
            BRANCH_LE_S_IMM = 88, OneRegOneImmOneOff, true;
            BRANCH_GE_S_IMM = 89, OneRegOneImmOneOff, true;
            BRANCH_GT_S_IMM = 90, OneRegOneImmOneOff, true;

            MOVE_REG = 100, TwoReg, false;
            SBRK = 101, TwoReg, false;

            STORE_IND_U8 = 110, TwoRegOneImm, false;
            STORE_IND_U16 = 111, TwoRegOneImm, false;
            STORE_IND_U32 = 112, TwoRegOneImm, false;
            STORE_IND_U64 = 113, TwoRegOneImm, false;
            LOAD_IND_U8 = 114, TwoRegOneImm, false;
            LOAD_IND_I8 = 115, TwoRegOneImm, false;
            LOAD_IND_U16 = 116, TwoRegOneImm, false;
            LOAD_IND_I16 = 117, TwoRegOneImm, false;
            LOAD_IND_U32 = 118, TwoRegOneImm, false;
            LOAD_IND_I32 = 119, TwoRegOneImm, false;
            LOAD_IND_U64 = 120, TwoRegOneImm, false;
            ADD_IMM_32 = 121, TwoRegOneImm, false;
            AND_IMM = 122, TwoRegOneImm, false;
            XOR_IMM = 123, TwoRegOneImm, false;
            OR_IMM = 124, TwoRegOneImm, false;
            MUL_IMM_32 = 125, TwoRegOneImm, false;
            SET_LT_U_IMM = 126, TwoRegOneImm, false;
            SET_LT_S_IMM = 127, TwoRegOneImm, false;
            SHLO_L_IMM_32 = 128, TwoRegOneImm, false;
            SHLO_R_IMM_32 = 129, TwoRegOneImm, false;
            SHAR_R_IMM_32 = 130, TwoRegOneImm, false;
            NEG_ADD_IMM_32 = 131, TwoRegOneImm, false;
            SET_GT_U_IMM = 132, TwoRegOneImm, false;
            SET_GT_S_IMM = 133, TwoRegOneImm, false;
            SHLO_L_IMM_ALT_32 = 134, TwoRegOneImm, false;
            SHLO_R_IMM_ALT_32 = 135, TwoRegOneImm, false;
            SHAR_R_IMM_ALT_32 = 136, TwoRegOneImm, false;
            CMOV_IZ_IMM = 137, TwoRegOneImm, false;
            CMOV_NZ_IMM = 138, TwoRegOneImm, false;
            ADD_IMM_64 = 139, TwoRegOneImm, false;
            MUL_IMM_64 = 140, TwoRegOneImm, false;
            SHLO_L_IMM_64 = 141, TwoRegOneImm, false;
            SHLO_R_IMM_64 = 142, TwoRegOneImm, false;
            SHAR_R_IMM_64 = 143, TwoRegOneImm, false;
            NEG_ADD_IMM_64 = 144, TwoRegOneImm, false;
            SHLO_L_IMM_ALT_64 = 145, TwoRegOneImm, false;
            SHLO_R_IMM_ALT_64 = 146, TwoRegOneImm, false;
            SHAR_R_IMM_ALT_64 = 147, TwoRegOneImm, false;

            BRANCH_EQ = 150, TwoRegOneOff, true;
            BRANCH_NE = 151, TwoRegOneOff, true;
            BRANCH_LT_U = 152, TwoRegOneOff, true;
            BRANCH_LT_S = 153, TwoRegOneOff, true;
            BRANCH_GE_U = 154, TwoRegOneOff, true;
            BRANCH_GE_S = 155, TwoRegOneOff, true;

            LOAD_IMM_JUMP_IND = 160, TwoRegTwoImm, true;

            ADD_32 = 170, ThreeReg, false;
            SUB_32 = 171, ThreeReg, false;
            MUL_32 = 172, ThreeReg, false;
            DIV_U_32 = 173, ThreeReg, false;
            DIV_S_32 = 174, ThreeReg, false;
            REM_U_32 = 175, ThreeReg, false;
            REM_S_32 = 176, ThreeReg, false;
            SHLO_L_32 = 177, ThreeReg, false;
            SHLO_R_32 = 178, ThreeReg, false;
            SHAR_R_32 = 179, ThreeReg, false;
            ADD_64 = 180, ThreeReg, false;
            SUB_64 = 181, ThreeReg, false;
            MUL_64 = 182, ThreeReg, false;
            DIV_U_64 = 183, ThreeReg, false;
            DIV_S_64 = 184, ThreeReg, false;
            REM_U_64 = 185, ThreeReg, false;
            REM_S_64 = 186, ThreeReg, false;
            SHLO_L_64 = 187, ThreeReg, false;
            SHLO_R_64 = 188, ThreeReg, false;
            SHAR_R_64 = 189, ThreeReg, false;
            AND = 190, ThreeReg, false;
            XOR = 191, ThreeReg, false;
            OR = 192, ThreeReg, false;
            MUL_UPPER_S_S = 193, ThreeReg, false;
            MUL_UPPER_U_U = 194, ThreeReg, false;
            MUL_UPPER_S_U = 195, ThreeReg, false;
            SET_LT_U = 196, ThreeReg, false;
            SET_LT_S = 197, ThreeReg, false;
            CMOV_IZ = 198, ThreeReg, false;
            CMOV_NZ = 199, ThreeReg, false;
        }
    };
}

macro_rules! define_opcodes {
    ($($name:ident = $code:literal, $shape:ident, $term:literal;)*) => {
        /// Opcode byte values.
        pub mod opcode {
            $(pub const $name: u8 = $code;)*
        }

        const DEFINED: &[(u8, Instruction)] = &[
            $((
                $code,
                Instruction {
                    name: stringify!($name),
                    shape: ArgShape::$shape,
                    gas: 1,
                    terminating: $term,
                },
            ),)*
        ];
    };
}

for_each_instruction!(define_opcodes);

/// One row per byte value; unassigned slots hold [`INVALID`].
pub static INSTRUCTIONS: Lazy<[&'static Instruction; 256]> = Lazy::new(|| {
    let mut table: [&'static Instruction; 256] = [&INVALID; 256];
    for (code, instruction) in DEFINED {
        table[usize::from(*code)] = instruction;
    }
    table
});

/// Metadata for `opcode`; never fails.
#[inline]
pub fn lookup(opcode: u8) -> &'static Instruction {
    INSTRUCTIONS[usize::from(opcode)]
}

/// Every assigned opcode with its metadata, in ascending order.
pub fn defined() -> impl Iterator<Item = (u8, &'static Instruction)> {
    DEFINED.iter().map(|(code, instruction)| (*code, instruction))
}
