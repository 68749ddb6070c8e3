use super::*;

#[test]
fn ecalli_suspends_with_call_id() {
    let code = [one_imm(opcode::ECALLI, 7), reg_imm(opcode::LOAD_IMM, 0, 3), halt()].concat();
    let mut int = interpreter(program(&code), Registers::default(), Memory::default(), 10);
    int.run(Some(STEP_LIMIT));

    assert_eq!(int.status(), Status::Host);
    assert_eq!(int.exit_code(), 7);
    assert_eq!(int.pc(), 0);
    assert_eq!(int.gas(), 9);

    // the host services the call, adjusts state and resumes after ECALLI
    int.registers_mut()[1] = 55;
    int.set_gas(20);
    int.resume(5);
    assert!(int.next_step(), "installing the next pc is a free step");
    assert_eq!(int.pc(), 5);
    assert_eq!(int.gas(), 20);

    int.run(Some(STEP_LIMIT));
    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.exit_code(), 0);
    assert_eq!(int.registers()[0], 3);
    assert_eq!(int.registers()[1], 55);
    assert_eq!(int.gas(), 17);
}

#[test]
fn next_pc_override_is_consumed_once() {
    let code = [bare(opcode::TRAP), bare(opcode::FALLTHROUGH), halt()].concat();
    let mut int = interpreter(program(&code), Registers::default(), Memory::default(), 10);
    int.set_next_pc(1);

    assert!(int.next_step());
    assert_eq!(int.pc(), 1);
    assert_eq!(int.gas(), 10);
    assert!(int.next_step());
    assert_eq!(int.pc(), 2);
    assert_eq!(int.gas(), 9);
}

#[test]
fn out_of_gas_stops_at_the_expensive_instruction() {
    let code = [
        reg_imm(opcode::LOAD_IMM, 0, 1),
        reg_imm(opcode::LOAD_IMM, 1, 2),
        bare(opcode::TRAP),
    ]
    .concat();
    let int = run_code(&code, Registers::default(), 1);

    assert_eq!(int.status(), Status::Oog);
    assert_eq!(int.pc(), 6);
    assert_eq!(int.gas(), -1);
    assert_eq!(int.registers()[0], 1);
    assert_eq!(int.registers()[1], 0);
}

#[test]
fn bounded_run_leaves_interpreter_running() {
    // 0: FALLTHROUGH ; 1: JUMP -1 back to 0
    let code = [bare(opcode::FALLTHROUGH), one_imm(opcode::JUMP, u32::MAX)].concat();
    let mut int = interpreter(program(&code), Registers::default(), Memory::default(), 1_000);

    assert_eq!(int.run(Some(10)), 10);
    assert_eq!(int.status(), Status::Ok);
    assert_eq!(int.gas(), 990);

    // the loop burns the budget eventually
    int.run(None);
    assert_eq!(int.status(), Status::Oog);
}

#[test]
fn status_codes() {
    let codes: Vec<(i8, u8, &str)> = [Status::Ok, Status::Halt, Status::Panic, Status::Fault, Status::Host, Status::Oog]
        .into_iter()
        .map(|s| (s.code(), s.as_u8(), s.name()))
        .collect();
    assert_eq!(
        codes,
        vec![
            (-1, 255, "ok"),
            (0, 0, "halt"),
            (1, 1, "panic"),
            (2, 2, "fault"),
            (3, 3, "host"),
            (4, 4, "oog"),
        ]
    );
}
