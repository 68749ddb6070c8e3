pub(super) use std::sync::Arc;

pub(super) use crate::{
    codec::encode_var_u32,
    isa::opcode,
    memory::{Access, Memory, MemoryBuilder},
    program::{Program, build::build_mask, build::wrap_as_program},
    vm::{Interpreter, Registers, Status},
};

pub(super) const STEP_LIMIT: u64 = 10_000;

pub(super) fn imm(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// `[op]`
pub(super) fn bare(op: u8) -> Vec<u8> {
    vec![op]
}

/// `[op][imm]`, shapes `OneImm` and `OneOff`.
pub(super) fn one_imm(op: u8, value: u32) -> Vec<u8> {
    let mut out = vec![op];
    out.extend(imm(value));
    out
}

/// `[op][reg][imm]`
pub(super) fn reg_imm(op: u8, reg: u8, value: u32) -> Vec<u8> {
    let mut out = vec![op, reg];
    out.extend(imm(value));
    out
}

/// `[op][4 << 4 | reg][imm][offset]`
pub(super) fn reg_imm_off(op: u8, reg: u8, value: u32, offset: u32) -> Vec<u8> {
    let mut out = vec![op, (4 << 4) | reg];
    out.extend(imm(value));
    out.extend(imm(offset));
    out
}

/// `[op][a << 4 | b]`
pub(super) fn two_reg(op: u8, a: u8, b: u8) -> Vec<u8> {
    vec![op, (a << 4) | b]
}

/// `[op][a << 4 | b][imm]`, shapes `TwoRegOneImm` and `TwoRegOneOff`.
pub(super) fn two_reg_imm(op: u8, a: u8, b: u8, value: u32) -> Vec<u8> {
    let mut out = two_reg(op, a, b);
    out.extend(imm(value));
    out
}

/// `[op][a << 4 | b][4][first][second]`
pub(super) fn two_reg_two_imm(op: u8, a: u8, b: u8, first: u32, second: u32) -> Vec<u8> {
    let mut out = two_reg(op, a, b);
    out.push(4);
    out.extend(imm(first));
    out.extend(imm(second));
    out
}

/// `[op][a << 4 | b][c]`
pub(super) fn three_reg(op: u8, a: u8, b: u8, c: u8) -> Vec<u8> {
    vec![op, (a << 4) | b, c]
}

/// Jump to the exit address through r12.
pub(super) fn halt() -> Vec<u8> {
    [reg_imm(opcode::LOAD_IMM, 12, 0xffff_0000), reg_imm(opcode::JUMP_IND, 12, 0)].concat()
}

pub(super) fn program(code: &[u8]) -> Arc<Program> {
    Arc::new(Program::decode(&wrap_as_program(code)).unwrap())
}

/// Program with a 4-byte wide jump table.
pub(super) fn program_with_jumps(targets: &[u32], code: &[u8]) -> Arc<Program> {
    let mut raw = encode_var_u32(targets.len() as u32);
    raw.push(4);
    raw.extend(encode_var_u32(code.len() as u32));
    for target in targets {
        raw.extend(target.to_le_bytes());
    }
    raw.extend_from_slice(code);
    raw.extend(build_mask(code));
    Arc::new(Program::decode(&raw).unwrap())
}

pub(super) fn regs(values: &[(u32, u64)]) -> Registers {
    let mut regs = Registers::default();
    for &(index, value) in values {
        regs[index] = value;
    }
    regs
}

pub(super) fn interpreter(program: Arc<Program>, regs: Registers, memory: Memory, gas: i64) -> Interpreter {
    Interpreter::new(program, regs, memory, gas)
}

pub(super) fn run_code(code: &[u8], regs: Registers, gas: i64) -> Interpreter {
    run_program(program(code), regs, Memory::default(), gas)
}

pub(super) fn run_program(program: Arc<Program>, regs: Registers, memory: Memory, gas: i64) -> Interpreter {
    let mut int = interpreter(program, regs, memory, gas);
    int.run(Some(STEP_LIMIT));
    int
}

mod arithmetic;
mod control_flow;
mod host;
mod memory_access;
