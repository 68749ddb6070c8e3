use super::*;

#[test]
fn jump_into_arguments_panics_without_moving() {
    // JUMP +4 lands inside its own immediate
    let code = [one_imm(opcode::JUMP, 4), bare(opcode::TRAP)].concat();
    let int = run_code(&code, Registers::default(), 10);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.pc(), 0);
    assert_eq!(int.gas(), 9);
}

#[test]
fn jump_to_block_start() {
    let code = [
        one_imm(opcode::JUMP, 6),
        bare(opcode::TRAP),
        reg_imm(opcode::LOAD_IMM, 0, 42),
        halt(),
    ]
    .concat();
    let int = run_code(&code, Registers::default(), 10);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[0], 42);
}

#[test]
fn jump_past_code_panics() {
    let code = [one_imm(opcode::JUMP, 100), bare(opcode::TRAP)].concat();
    let int = run_code(&code, Registers::default(), 10);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.pc(), 0);
}

fn branch_imm_program(op: u8, value: u32) -> Vec<u8> {
    // 0: LOAD_IMM r0, value
    // 6: branch r0 vs 5 to 17
    // 16: TRAP
    // 17: LOAD_IMM r1, 222 ; halt
    [
        reg_imm(opcode::LOAD_IMM, 0, value),
        reg_imm_off(op, 0, 5, 11),
        bare(opcode::TRAP),
        reg_imm(opcode::LOAD_IMM, 1, 222),
        halt(),
    ]
    .concat()
}

#[test]
fn immediate_branches() {
    let taken = run_code(&branch_imm_program(opcode::BRANCH_LT_U_IMM, 1), Registers::default(), 20);
    assert_eq!(taken.status(), Status::Halt);
    assert_eq!(taken.registers()[1], 222);

    let fallen = run_code(&branch_imm_program(opcode::BRANCH_LT_U_IMM, 9), Registers::default(), 20);
    assert_eq!(fallen.status(), Status::Panic);
    assert_eq!(fallen.pc(), 16);

    // -1 is below 5 only when compared signed
    let signed = run_code(&branch_imm_program(opcode::BRANCH_LT_S_IMM, u32::MAX), Registers::default(), 20);
    assert_eq!(signed.status(), Status::Halt);
    let unsigned = run_code(&branch_imm_program(opcode::BRANCH_LT_U_IMM, u32::MAX), Registers::default(), 20);
    assert_eq!(unsigned.status(), Status::Panic);

    let equal = run_code(&branch_imm_program(opcode::BRANCH_EQ_IMM, 5), Registers::default(), 20);
    assert_eq!(equal.status(), Status::Halt);
}

#[test]
fn register_branches_compare_b_against_a() {
    // 0: branch r1 vs r0 to 7 ; 6: TRAP ; 7: LOAD_IMM r2, 1 ; halt
    let code = |op| {
        [
            two_reg_imm(op, 0, 1, 7),
            bare(opcode::TRAP),
            reg_imm(opcode::LOAD_IMM, 2, 1),
            halt(),
        ]
        .concat()
    };
    let init = regs(&[(0, 1), (1, u64::MAX)]);

    let int = run_code(&code(opcode::BRANCH_LT_S), init, 20);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[2], 1);

    let int = run_code(&code(opcode::BRANCH_LT_U), init, 20);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.pc(), 6);

    let int = run_code(&code(opcode::BRANCH_GE_U), init, 20);
    assert_eq!(int.status(), Status::Halt);
}

#[test]
fn load_imm_jump_sets_register_then_jumps() {
    // 0: LOAD_IMM_JUMP r3, 9, +10 ; 10: TRAP ; 11: halt
    let code = [reg_imm_off(opcode::LOAD_IMM_JUMP, 3, 9, 11), bare(opcode::TRAP), halt()].concat();
    let int = run_code(&code, Registers::default(), 20);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[3], 9);
}

#[test]
fn dynamic_jump_to_exit_halts() {
    let int = run_code(&halt(), Registers::default(), 10);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.pc(), 6);
    assert_eq!(int.gas(), 8);
}

#[test]
fn dynamic_jump_rejects_bad_addresses() {
    // JUMP_IND r0 + 0 ; TRAP ; LOAD_IMM r1, 9 ; halt
    let code = [
        reg_imm(opcode::JUMP_IND, 0, 0),
        bare(opcode::TRAP),
        reg_imm(opcode::LOAD_IMM, 1, 9),
        halt(),
    ]
    .concat();

    let cases: [(Vec<u32>, u64); 4] = [
        // zero
        (vec![7], 0),
        // odd
        (vec![7], 3),
        // past the table
        (vec![7], 4),
        // target inside an instruction
        (vec![8], 2),
    ];
    for (targets, address) in cases {
        let program = program_with_jumps(&targets, &code);
        let int = run_program(program, regs(&[(0, address)]), Memory::default(), 10);
        assert_eq!(int.status(), Status::Panic, "address {address} with table {targets:?}");
        assert_eq!(int.pc(), 0);
    }

    let program = program_with_jumps(&[7], &code);
    let int = run_program(program, regs(&[(0, 2)]), Memory::default(), 10);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[1], 9);
}

#[test]
fn load_imm_jump_ind_reads_target_before_writing() {
    // a and b are both r0: the jump uses the old value
    let code = [two_reg_two_imm(opcode::LOAD_IMM_JUMP_IND, 0, 0, 99, 0), halt()].concat();
    let program = program_with_jumps(&[11], &code);
    let int = run_program(program, regs(&[(0, 2)]), Memory::default(), 10);
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[0], 99);
}

#[test]
fn invalid_opcode_charges_gas_then_panics() {
    let int = run_code(&[2], Registers::default(), 5);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.gas(), 4);
}

#[test]
fn start_outside_instruction_boundary() {
    let code = reg_imm(opcode::LOAD_IMM, 0, 1);

    let mut int = interpreter(program(&code), Registers::default(), Memory::default(), 3).with_pc(1);
    assert!(!int.next_step());
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.gas(), 2);

    let mut int = interpreter(program(&code), Registers::default(), Memory::default(), 0).with_pc(1);
    assert!(!int.next_step());
    assert_eq!(int.status(), Status::Oog);
}

#[test]
fn truncated_arguments_panic() {
    let int = run_code(&[opcode::ADD_64, 0x12], Registers::default(), 5);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.pc(), 0);
}

#[test]
fn running_off_the_end_panics() {
    let code = [reg_imm(opcode::LOAD_IMM, 0, 1), bare(opcode::FALLTHROUGH)].concat();
    let int = run_code(&code, Registers::default(), 10);
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.pc(), 7);
    assert_eq!(int.gas(), 7);
}

#[test]
fn terminal_status_is_sticky() {
    let mut int = interpreter(program(&bare(opcode::TRAP)), Registers::default(), Memory::default(), 10);
    assert!(!int.next_step());
    assert!(!int.next_step());
    assert_eq!(int.status(), Status::Panic);
    assert_eq!(int.gas(), 9);
}
