//! Per-opcode semantics and the dispatch table.
//!
//! Operand naming follows the decoded [`Args`] slots. Immediates are
//! sign-extended to 64 bits; memory addresses are computed modulo 2^32.

use once_cell::sync::Lazy;

use crate::isa::{Args, opcode};
use crate::memory::{Fault, Memory};

use super::math::*;
use super::outcome::Outcome;
use super::registers::Registers;

pub type Handler = fn(Args, &mut Registers, &mut Memory) -> Outcome;

/// Handlers indexed by opcode byte. Unassigned opcodes panic.
pub static HANDLERS: Lazy<[Handler; 256]> = Lazy::new(|| std::array::from_fn(|code| handler_for(code as u8)));

#[inline]
pub fn dispatch(opcode: u8, args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    HANDLERS[usize::from(opcode)](args, regs, memory)
}

#[inline]
fn address(regs: &Registers, base: u32, offset: u32) -> u32 {
    low32(regs[base]).wrapping_add(offset)
}

#[inline]
fn load(regs: &mut Registers, dst: u32, value: Result<u64, Fault>) -> Outcome {
    match value {
        Ok(v) => {
            regs[dst] = v;
            Outcome::Ok
        }
        Err(fault) => Outcome::fault(fault),
    }
}

/// `regs[c] = f(regs[b], regs[a])`
macro_rules! three_reg {
    ($($name:ident => |$lhs:ident, $rhs:ident| $body:expr;)*) => {$(
        fn $name(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
            let ($lhs, $rhs) = (regs[args.b], regs[args.a]);
            regs[args.c] = $body;
            Outcome::Ok
        }
    )*};
}

/// `regs[b] = f(regs[a], sext(c))`
macro_rules! reg_imm {
    ($($name:ident => |$reg:ident, $imm:ident| $body:expr;)*) => {$(
        fn $name(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
            let ($reg, $imm) = (regs[args.a], sext32(args.c));
            regs[args.b] = $body;
            Outcome::Ok
        }
    )*};
}

/// Branch by `c` when `cond(regs[a], sext(b))` holds.
macro_rules! branch_imm {
    ($($name:ident => |$reg:ident, $imm:ident| $cond:expr;)*) => {$(
        fn $name(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
            let ($reg, $imm) = (regs[args.a], sext32(args.b));
            Outcome::branch($cond, args.c)
        }
    )*};
}

/// Branch by `c` when `cond(regs[b], regs[a])` holds.
macro_rules! branch_reg {
    ($($name:ident => |$lhs:ident, $rhs:ident| $cond:expr;)*) => {$(
        fn $name(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
            let ($lhs, $rhs) = (regs[args.b], regs[args.a]);
            Outcome::branch($cond, args.c)
        }
    )*};
}

fn trap(_: Args, _: &mut Registers, _: &mut Memory) -> Outcome {
    Outcome::panic()
}

fn fallthrough(_: Args, _: &mut Registers, _: &mut Memory) -> Outcome {
    Outcome::Ok
}

fn ecalli(args: Args, _: &mut Registers, _: &mut Memory) -> Outcome {
    Outcome::host_call(args.a)
}

fn load_imm_64(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    regs[args.a] = u64::from(args.b) | (u64::from(args.c) << 32);
    Outcome::Ok
}

fn store_imm_u8(args: Args, _: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u8(args.a, args.b as u8))
}

fn store_imm_u16(args: Args, _: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u16(args.a, args.b as u16))
}

fn store_imm_u32(args: Args, _: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u32(args.a, args.b))
}

fn store_imm_u64(args: Args, _: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u64(args.a, sext32(args.b)))
}

fn jump(args: Args, _: &mut Registers, _: &mut Memory) -> Outcome {
    Outcome::StaticJump(args.a as i32)
}

fn jump_ind(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    Outcome::DynamicJump(address(regs, args.a, args.b))
}

fn load_imm(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    regs[args.a] = sext32(args.b);
    Outcome::Ok
}

fn load_u8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u8(args.b).map(u64::from))
}

fn load_i8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u8(args.b).map(sext8))
}

fn load_u16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u16(args.b).map(u64::from))
}

fn load_i16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u16(args.b).map(sext16))
}

fn load_u32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u32(args.b).map(u64::from))
}

fn load_i32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u32(args.b).map(sext32))
}

fn load_u64(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    load(regs, args.a, memory.get_u64(args.b))
}

fn store_u8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u8(args.b, regs[args.a] as u8))
}

fn store_u16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u16(args.b, regs[args.a] as u16))
}

fn store_u32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u32(args.b, regs[args.a] as u32))
}

fn store_u64(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u64(args.b, regs[args.a]))
}

fn store_imm_ind_u8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u8(address(regs, args.a, args.b), args.c as u8))
}

fn store_imm_ind_u16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u16(address(regs, args.a, args.b), args.c as u16))
}

fn store_imm_ind_u32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u32(address(regs, args.a, args.b), args.c))
}

fn store_imm_ind_u64(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u64(address(regs, args.a, args.b), sext32(args.c)))
}

fn load_imm_jump(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    regs[args.a] = sext32(args.b);
    Outcome::StaticJump(args.c as i32)
}

branch_imm! {
    branch_eq_imm => |reg, imm| reg == imm;
    branch_ne_imm => |reg, imm| reg != imm;
    branch_lt_u_imm => |reg, imm| reg < imm;
    branch_le_u_imm => |reg, imm| reg <= imm;
    branch_ge_u_imm => |reg, imm| reg >= imm;
    branch_gt_u_imm => |reg, imm| reg > imm;
    branch_lt_s_imm => |reg, imm| (reg as i64) < (imm as i64);
    branch_le_s_imm => |reg, imm| (reg as i64) <= (imm as i64);
    branch_ge_s_imm => |reg, imm| (reg as i64) >= (imm as i64);
    branch_gt_s_imm => |reg, imm| (reg as i64) > (imm as i64);
}

fn move_reg(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    regs[args.b] = regs[args.a];
    Outcome::Ok
}

fn sbrk(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    regs[args.b] = u64::from(memory.sbrk(low32(regs[args.a])));
    Outcome::Ok
}

fn store_ind_u8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u8(address(regs, args.a, args.c), regs[args.b] as u8))
}

fn store_ind_u16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u16(address(regs, args.a, args.c), regs[args.b] as u16))
}

fn store_ind_u32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u32(address(regs, args.a, args.c), regs[args.b] as u32))
}

fn store_ind_u64(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    Outcome::ok_or_fault(memory.set_u64(address(regs, args.a, args.c), regs[args.b]))
}

fn load_ind_u8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u8(address(regs, args.a, args.c)).map(u64::from);
    load(regs, args.b, value)
}

fn load_ind_i8(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u8(address(regs, args.a, args.c)).map(sext8);
    load(regs, args.b, value)
}

fn load_ind_u16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u16(address(regs, args.a, args.c)).map(u64::from);
    load(regs, args.b, value)
}

fn load_ind_i16(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u16(address(regs, args.a, args.c)).map(sext16);
    load(regs, args.b, value)
}

fn load_ind_u32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u32(address(regs, args.a, args.c)).map(u64::from);
    load(regs, args.b, value)
}

fn load_ind_i32(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u32(address(regs, args.a, args.c)).map(sext32);
    load(regs, args.b, value)
}

fn load_ind_u64(args: Args, regs: &mut Registers, memory: &mut Memory) -> Outcome {
    let value = memory.get_u64(address(regs, args.a, args.c));
    load(regs, args.b, value)
}

reg_imm! {
    add_imm_32 => |reg, imm| sext32(low32(reg).wrapping_add(low32(imm)));
    and_imm => |reg, imm| reg & imm;
    xor_imm => |reg, imm| reg ^ imm;
    or_imm => |reg, imm| reg | imm;
    mul_imm_32 => |reg, imm| sext32(low32(reg).wrapping_mul(low32(imm)));
    set_lt_u_imm => |reg, imm| u64::from(reg < imm);
    set_lt_s_imm => |reg, imm| u64::from((reg as i64) < (imm as i64));
    shlo_l_imm_32 => |reg, imm| shl32(reg, imm);
    shlo_r_imm_32 => |reg, imm| shr32(reg, imm);
    shar_r_imm_32 => |reg, imm| sar32(reg, imm);
    neg_add_imm_32 => |reg, imm| sext32(low32(imm).wrapping_sub(low32(reg)));
    set_gt_u_imm => |reg, imm| u64::from(reg > imm);
    set_gt_s_imm => |reg, imm| u64::from((reg as i64) > (imm as i64));
    shlo_l_imm_alt_32 => |reg, imm| shl32(imm, reg);
    shlo_r_imm_alt_32 => |reg, imm| shr32(imm, reg);
    shar_r_imm_alt_32 => |reg, imm| sar32(imm, reg);
    add_imm_64 => |reg, imm| reg.wrapping_add(imm);
    mul_imm_64 => |reg, imm| reg.wrapping_mul(imm);
    shlo_l_imm_64 => |reg, imm| shl64(reg, imm);
    shlo_r_imm_64 => |reg, imm| shr64(reg, imm);
    shar_r_imm_64 => |reg, imm| sar64(reg, imm);
    neg_add_imm_64 => |reg, imm| imm.wrapping_sub(reg);
    shlo_l_imm_alt_64 => |reg, imm| shl64(imm, reg);
    shlo_r_imm_alt_64 => |reg, imm| shr64(imm, reg);
    shar_r_imm_alt_64 => |reg, imm| sar64(imm, reg);
}

fn cmov_iz_imm(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    if regs[args.a] == 0 {
        regs[args.b] = sext32(args.c);
    }
    Outcome::Ok
}

fn cmov_nz_imm(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    if regs[args.a] != 0 {
        regs[args.b] = sext32(args.c);
    }
    Outcome::Ok
}

branch_reg! {
    branch_eq => |lhs, rhs| lhs == rhs;
    branch_ne => |lhs, rhs| lhs != rhs;
    branch_lt_u => |lhs, rhs| lhs < rhs;
    branch_lt_s => |lhs, rhs| (lhs as i64) < (rhs as i64);
    branch_ge_u => |lhs, rhs| lhs >= rhs;
    branch_ge_s => |lhs, rhs| (lhs as i64) >= (rhs as i64);
}

fn load_imm_jump_ind(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    // the target is read before `a` is overwritten, `a` and `b` may alias
    let target = address(regs, args.b, args.d);
    regs[args.a] = sext32(args.c);
    Outcome::DynamicJump(target)
}

three_reg! {
    add_32 => |lhs, rhs| sext32(low32(lhs).wrapping_add(low32(rhs)));
    sub_32 => |lhs, rhs| sext32(low32(lhs).wrapping_sub(low32(rhs)));
    mul_32 => |lhs, rhs| sext32(low32(lhs).wrapping_mul(low32(rhs)));
    div_u_32 => |lhs, rhs| div_u32(lhs, rhs);
    div_s_32 => |lhs, rhs| div_s32(lhs, rhs);
    rem_u_32 => |lhs, rhs| rem_u32(lhs, rhs);
    rem_s_32 => |lhs, rhs| rem_s32(lhs, rhs);
    shlo_l_32 => |lhs, rhs| shl32(lhs, rhs);
    shlo_r_32 => |lhs, rhs| shr32(lhs, rhs);
    shar_r_32 => |lhs, rhs| sar32(lhs, rhs);
    add_64 => |lhs, rhs| lhs.wrapping_add(rhs);
    sub_64 => |lhs, rhs| lhs.wrapping_sub(rhs);
    mul_64 => |lhs, rhs| lhs.wrapping_mul(rhs);
    div_u_64 => |lhs, rhs| div_u64(lhs, rhs);
    div_s_64 => |lhs, rhs| div_s64(lhs, rhs);
    rem_u_64 => |lhs, rhs| rem_u64(lhs, rhs);
    rem_s_64 => |lhs, rhs| rem_s64(lhs, rhs);
    shlo_l_64 => |lhs, rhs| shl64(lhs, rhs);
    shlo_r_64 => |lhs, rhs| shr64(lhs, rhs);
    shar_r_64 => |lhs, rhs| sar64(lhs, rhs);
    and => |lhs, rhs| lhs & rhs;
    xor => |lhs, rhs| lhs ^ rhs;
    or => |lhs, rhs| lhs | rhs;
    mul_upper_s_s => |lhs, rhs| super::math::mul_upper_s_s(rhs, lhs);
    mul_upper_u_u => |lhs, rhs| super::math::mul_upper_u_u(rhs, lhs);
    mul_upper_s_u => |lhs, rhs| super::math::mul_upper_s_u(rhs, lhs);
    set_lt_u => |lhs, rhs| u64::from(lhs < rhs);
    set_lt_s => |lhs, rhs| u64::from((lhs as i64) < (rhs as i64));
}

fn cmov_iz(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    if regs[args.a] == 0 {
        regs[args.c] = regs[args.b];
    }
    Outcome::Ok
}

fn cmov_nz(args: Args, regs: &mut Registers, _: &mut Memory) -> Outcome {
    if regs[args.a] != 0 {
        regs[args.c] = regs[args.b];
    }
    Outcome::Ok
}

fn handler_for(code: u8) -> Handler {
    use opcode::*;
    match code {
        TRAP => trap,
        FALLTHROUGH => fallthrough,
        ECALLI => ecalli,
        LOAD_IMM_64 => load_imm_64,
        STORE_IMM_U8 => store_imm_u8,
        STORE_IMM_U16 => store_imm_u16,
        STORE_IMM_U32 => store_imm_u32,
        STORE_IMM_U64 => store_imm_u64,
        JUMP => jump,
        JUMP_IND => jump_ind,
        LOAD_IMM => load_imm,
        LOAD_U8 => load_u8,
        LOAD_I8 => load_i8,
        LOAD_U16 => load_u16,
        LOAD_I16 => load_i16,
        LOAD_U32 => load_u32,
        LOAD_I32 => load_i32,
        LOAD_U64 => load_u64,
        STORE_U8 => store_u8,
        STORE_U16 => store_u16,
        STORE_U32 => store_u32,
        STORE_U64 => store_u64,
        STORE_IMM_IND_U8 => store_imm_ind_u8,
        STORE_IMM_IND_U16 => store_imm_ind_u16,
        STORE_IMM_IND_U32 => store_imm_ind_u32,
        STORE_IMM_IND_U64 => store_imm_ind_u64,
        LOAD_IMM_JUMP => load_imm_jump,
        BRANCH_EQ_IMM => branch_eq_imm,
        BRANCH_NE_IMM => branch_ne_imm,
        BRANCH_LT_U_IMM => branch_lt_u_imm,
        BRANCH_LE_U_IMM => branch_le_u_imm,
        BRANCH_GE_U_IMM => branch_ge_u_imm,
        BRANCH_GT_U_IMM => branch_gt_u_imm,
        BRANCH_LT_S_IMM => branch_lt_s_imm,
        BRANCH_LE_S_IMM => branch_le_s_imm,
        BRANCH_GE_S_IMM => branch_ge_s_imm,
        BRANCH_GT_S_IMM => branch_gt_s_imm,
        MOVE_REG => move_reg,
        SBRK => sbrk,
        STORE_IND_U8 => store_ind_u8,
        STORE_IND_U16 => store_ind_u16,
        STORE_IND_U32 => store_ind_u32,
        STORE_IND_U64 => store_ind_u64,
        LOAD_IND_U8 => load_ind_u8,
        LOAD_IND_I8 => load_ind_i8,
        LOAD_IND_U16 => load_ind_u16,
        LOAD_IND_I16 => load_ind_i16,
        LOAD_IND_U32 => load_ind_u32,
        LOAD_IND_I32 => load_ind_i32,
        LOAD_IND_U64 => load_ind_u64,
        ADD_IMM_32 => add_imm_32,
        AND_IMM => and_imm,
        XOR_IMM => xor_imm,
        OR_IMM => or_imm,
        MUL_IMM_32 => mul_imm_32,
        SET_LT_U_IMM => set_lt_u_imm,
        SET_LT_S_IMM => set_lt_s_imm,
        SHLO_L_IMM_32 => shlo_l_imm_32,
        SHLO_R_IMM_32 => shlo_r_imm_32,
        SHAR_R_IMM_32 => shar_r_imm_32,
        NEG_ADD_IMM_32 => neg_add_imm_32,
        SET_GT_U_IMM => set_gt_u_imm,
        SET_GT_S_IMM => set_gt_s_imm,
        SHLO_L_IMM_ALT_32 => shlo_l_imm_alt_32,
        SHLO_R_IMM_ALT_32 => shlo_r_imm_alt_32,
        SHAR_R_IMM_ALT_32 => shar_r_imm_alt_32,
        CMOV_IZ_IMM => cmov_iz_imm,
        CMOV_NZ_IMM => cmov_nz_imm,
        ADD_IMM_64 => add_imm_64,
        MUL_IMM_64 => mul_imm_64,
        SHLO_L_IMM_64 => shlo_l_imm_64,
        SHLO_R_IMM_64 => shlo_r_imm_64,
        SHAR_R_IMM_64 => shar_r_imm_64,
        NEG_ADD_IMM_64 => neg_add_imm_64,
        SHLO_L_IMM_ALT_64 => shlo_l_imm_alt_64,
        SHLO_R_IMM_ALT_64 => shlo_r_imm_alt_64,
        SHAR_R_IMM_ALT_64 => shar_r_imm_alt_64,
        BRANCH_EQ => branch_eq,
        BRANCH_NE => branch_ne,
        BRANCH_LT_U => branch_lt_u,
        BRANCH_LT_S => branch_lt_s,
        BRANCH_GE_U => branch_ge_u,
        BRANCH_GE_S => branch_ge_s,
        LOAD_IMM_JUMP_IND => load_imm_jump_ind,
        ADD_32 => add_32,
        SUB_32 => sub_32,
        MUL_32 => mul_32,
        DIV_U_32 => div_u_32,
        DIV_S_32 => div_s_32,
        REM_U_32 => rem_u_32,
        REM_S_32 => rem_s_32,
        SHLO_L_32 => shlo_l_32,
        SHLO_R_32 => shlo_r_32,
        SHAR_R_32 => shar_r_32,
        ADD_64 => add_64,
        SUB_64 => sub_64,
        MUL_64 => mul_64,
        DIV_U_64 => div_u_64,
        DIV_S_64 => div_s_64,
        REM_U_64 => rem_u_64,
        REM_S_64 => rem_s_64,
        SHLO_L_64 => shlo_l_64,
        SHLO_R_64 => shlo_r_64,
        SHAR_R_64 => shar_r_64,
        AND => and,
        XOR => xor,
        OR => or,
        MUL_UPPER_S_S => mul_upper_s_s,
        MUL_UPPER_U_U => mul_upper_u_u,
        MUL_UPPER_S_U => mul_upper_s_u,
        SET_LT_U => set_lt_u,
        SET_LT_S => set_lt_s,
        CMOV_IZ => cmov_iz,
        CMOV_NZ => cmov_nz,
        _ => trap,
    }
}
