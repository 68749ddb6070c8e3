use super::*;

const MIN64: u64 = i64::MIN as u64;
const MINUS_ONE: u64 = u64::MAX;

/// Run `op` as the only instruction before halting.
fn exec(op: Vec<u8>, init: &[(u32, u64)]) -> Interpreter {
    let code = [op, halt()].concat();
    let int = run_code(&code, regs(init), 100);
    assert_eq!(int.status(), Status::Halt, "{int:?}");
    int
}

#[test]
fn load_add_trap_scenario() {
    let code = [
        reg_imm(opcode::LOAD_IMM, 0, 5),
        reg_imm(opcode::LOAD_IMM, 1, 7),
        three_reg(opcode::ADD_32, 0, 1, 2),
        bare(opcode::TRAP),
    ]
    .concat();
    let int = run_code(&code, Registers::default(), 10);

    assert_eq!(int.registers()[2], 12);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.gas(), 6);
    assert_eq!(int.pc(), 15);
}

#[test]
fn three_reg_operand_order() {
    // SUB: c = b - a
    let int = exec(three_reg(opcode::SUB_64, 0, 1, 2), &[(0, 3), (1, 10)]);
    assert_eq!(int.registers()[2], 7);

    // shifts: value in b, amount in a, amount taken modulo the width
    let int = exec(three_reg(opcode::SHLO_L_64, 0, 1, 2), &[(0, 68), (1, 1)]);
    assert_eq!(int.registers()[2], 16);

    let int = exec(three_reg(opcode::SET_LT_U, 0, 1, 2), &[(0, 5), (1, 4)]);
    assert_eq!(int.registers()[2], 1);

    let int = exec(three_reg(opcode::DIV_U_64, 0, 1, 2), &[(0, 4), (1, 17)]);
    assert_eq!(int.registers()[2], 4);
}

#[test]
fn signed_division_edge_cases() {
    let init = [(0, MINUS_ONE), (1, MIN64)];
    let int = exec(three_reg(opcode::DIV_S_64, 0, 1, 2), &init);
    assert_eq!(int.registers()[2], MIN64);
    let int = exec(three_reg(opcode::REM_S_64, 0, 1, 2), &init);
    assert_eq!(int.registers()[2], 0);

    let init = [(0, MINUS_ONE), (1, 0x8000_0000)];
    let int = exec(three_reg(opcode::DIV_S_32, 0, 1, 2), &init);
    assert_eq!(int.registers()[2], 0xffff_ffff_8000_0000);
    let int = exec(three_reg(opcode::REM_S_32, 0, 1, 2), &init);
    assert_eq!(int.registers()[2], 0);
}

#[test]
fn division_by_zero_does_not_trap() {
    let init = [(0, 0), (1, 42)];
    assert_eq!(exec(three_reg(opcode::DIV_U_64, 0, 1, 2), &init).registers()[2], u64::MAX);
    assert_eq!(exec(three_reg(opcode::REM_U_64, 0, 1, 2), &init).registers()[2], 42);
    assert_eq!(exec(three_reg(opcode::DIV_S_64, 0, 1, 2), &init).registers()[2], u64::MAX);
    assert_eq!(exec(three_reg(opcode::REM_S_32, 0, 1, 2), &init).registers()[2], 42);
}

#[test]
fn word_ops_sign_extend_results() {
    let int = exec(three_reg(opcode::ADD_32, 0, 1, 2), &[(0, 0x7fff_ffff), (1, 1)]);
    assert_eq!(int.registers()[2], 0xffff_ffff_8000_0000);

    // upper half of the operands is ignored
    let int = exec(three_reg(opcode::MUL_32, 0, 1, 2), &[(0, 0x1_0000_0003), (1, 5)]);
    assert_eq!(int.registers()[2], 15);

    let int = exec(two_reg_imm(opcode::ADD_IMM_32, 0, 1, 1), &[(0, 0xffff_ffff)]);
    assert_eq!(int.registers()[1], 0);
}

#[test]
fn upper_multiplication() {
    let int = exec(three_reg(opcode::MUL_UPPER_U_U, 0, 1, 2), &[(0, u64::MAX), (1, 2)]);
    assert_eq!(int.registers()[2], 1);

    let int = exec(three_reg(opcode::MUL_UPPER_S_S, 0, 1, 2), &[(0, MIN64), (1, 2)]);
    assert_eq!(int.registers()[2], u64::MAX);

    // signed a, unsigned b: |-1| * MAX has a zero upper word
    let int = exec(three_reg(opcode::MUL_UPPER_S_U, 0, 1, 2), &[(0, MINUS_ONE), (1, u64::MAX)]);
    assert_eq!(int.registers()[2], 0);

    let int = exec(three_reg(opcode::MUL_UPPER_S_U, 0, 1, 2), &[(0, -2i64 as u64), (1, 1 << 63)]);
    assert_eq!(int.registers()[2], u64::MAX);
}

#[test]
fn immediate_forms() {
    let int = exec(two_reg_imm(opcode::NEG_ADD_IMM_64, 0, 1, 2), &[(0, 5)]);
    assert_eq!(int.registers()[1], (-3i64) as u64);

    // ALT shifts move the immediate by the register
    let int = exec(two_reg_imm(opcode::SHLO_L_IMM_ALT_64, 0, 1, 1), &[(0, 3)]);
    assert_eq!(int.registers()[1], 8);

    let int = exec(two_reg_imm(opcode::SHAR_R_IMM_64, 0, 1, 4), &[(0, (-64i64) as u64)]);
    assert_eq!(int.registers()[1], (-4i64) as u64);

    let int = exec(two_reg_imm(opcode::SET_GT_S_IMM, 0, 1, (-2i32) as u32), &[(0, MINUS_ONE)]);
    assert_eq!(int.registers()[1], 1);

    let int = exec(two_reg_imm(opcode::SET_LT_U_IMM, 0, 1, (-2i32) as u32), &[(0, 7)]);
    assert_eq!(int.registers()[1], 1);

    let int = exec(two_reg_imm(opcode::AND_IMM, 0, 1, 0xff00_00f0), &[(0, u64::MAX)]);
    assert_eq!(int.registers()[1], 0xffff_ffff_ff00_00f0);
}

#[test]
fn conditional_moves() {
    let init = [(0, 0), (1, 9), (2, 1)];
    assert_eq!(exec(three_reg(opcode::CMOV_IZ, 0, 1, 2), &init).registers()[2], 9);
    assert_eq!(exec(three_reg(opcode::CMOV_NZ, 0, 1, 2), &init).registers()[2], 1);

    let init = [(0, 3), (1, 1)];
    assert_eq!(exec(two_reg_imm(opcode::CMOV_NZ_IMM, 0, 1, 77), &init).registers()[1], 77);
    assert_eq!(exec(two_reg_imm(opcode::CMOV_IZ_IMM, 0, 1, 77), &init).registers()[1], 1);
}

#[test]
fn register_loads() {
    let mut op = vec![opcode::LOAD_IMM_64, 3];
    op.extend([0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    assert_eq!(exec(op, &[]).registers()[3], 0x1122_3344_5566_7788);

    assert_eq!(exec(reg_imm(opcode::LOAD_IMM, 4, 0xffff_fffe), &[]).registers()[4], (-2i64) as u64);

    // MOVE_REG copies a into b
    assert_eq!(exec(two_reg(opcode::MOVE_REG, 0, 5), &[(0, 31)]).registers()[5], 31);
}

#[test]
fn register_operands_past_the_file_alias_the_last_register() {
    let code = [reg_imm(opcode::LOAD_IMM, 15, 6), bare(opcode::TRAP)].concat();
    let int = run_code(&code, Registers::default(), 10);
    assert_eq!(int.registers()[12], 6);
}
