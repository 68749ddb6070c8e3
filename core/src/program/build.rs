//! Turn raw code into a program container.

use crate::codec::encode_var_u32;
use crate::isa::lookup;

/// Wrap `code` into a container with an empty jump table and a mask rebuilt
/// from the opcodes.
pub fn wrap_as_program(code: &[u8]) -> Vec<u8> {
    let mask = build_mask(code);
    let code_len = encode_var_u32(code.len() as u32);

    let mut out = Vec::with_capacity(2 + code_len.len() + code.len() + mask.len());
    // jump table count, jump table item width
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&code_len);
    out.extend_from_slice(code);
    out.extend_from_slice(&mask);
    out
}

/// Packed instruction-boundary bitmap for `code`.
///
/// Each opcode consumes the argument bytes its shape needs, with immediates
/// taken greedily up to four bytes. When fewer bytes than the shape requires
/// remain, the next byte is treated as a new instruction.
pub fn build_mask(code: &[u8]) -> Vec<u8> {
    let mut packed = vec![0u8; code.len().div_ceil(8)];
    let mut i = 0;
    while i < code.len() {
        packed[i / 8] |= 1 << (i % 8);
        let shape = lookup(code[i]).shape;
        let rest = &code[i + 1..];
        if rest.len() >= shape.required_bytes() {
            i += shape.skip_bytes(rest).min(rest.len());
        }
        i += 1;
    }
    packed
}
