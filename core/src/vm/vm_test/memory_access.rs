use super::*;

const DATA: u32 = 0x2_0000;

fn memory_with(access: Access, address: u32, data: &[u8]) -> Memory {
    let mut builder = MemoryBuilder::new();
    builder.set_data(access, address, data).unwrap();
    builder.build(0)
}

fn run_with_memory(code: &[u8], init: &[(u32, u64)], memory: Memory, gas: i64) -> Interpreter {
    run_program(program(code), regs(init), memory, gas)
}

#[test]
fn load_from_missing_page_faults_and_keeps_register() {
    let code = [reg_imm(opcode::LOAD_U32, 0, 0x1_0000), halt()].concat();
    let int = run_with_memory(&code, &[(0, 77)], Memory::default(), 10);

    assert_eq!(int.status(), Status::Fault);
    assert_eq!(int.exit_code(), 0x1_0000);
    assert_eq!(int.registers()[0], 77);
    assert_eq!(int.pc(), 0);
    // instruction plus the fault surcharge
    assert_eq!(int.gas(), 8);
}

#[test]
fn fault_wins_over_exhausted_gas() {
    let code = reg_imm(opcode::LOAD_U8, 0, 0x1_0000);
    let int = run_with_memory(&code, &[], Memory::default(), 1);
    assert_eq!(int.status(), Status::Fault);
    assert_eq!(int.gas(), -1);
}

#[test]
fn read_only_pages_reject_stores() {
    let memory = memory_with(Access::Read, DATA, &[1, 2, 3, 4]);
    let code = [
        reg_imm(opcode::LOAD_U8, 1, DATA + 1),
        reg_imm(opcode::STORE_U32, 0, DATA),
        halt(),
    ]
    .concat();
    let int = run_with_memory(&code, &[(0, 0xaabb_ccdd)], memory, 10);

    assert_eq!(int.status(), Status::Fault);
    assert_eq!(int.exit_code(), DATA);
    assert_eq!(int.registers()[1], 2);
    assert_eq!(int.memory().get_u32(DATA), Ok(0x0403_0201));
}

#[test]
fn indirect_store_then_load() {
    let memory = memory_with(Access::Write, DATA, &[0; 64]);
    let code = [
        two_reg_imm(opcode::STORE_IND_U32, 1, 2, 8),
        two_reg_imm(opcode::LOAD_IND_I32, 1, 3, 8),
        two_reg_imm(opcode::LOAD_IND_U16, 1, 4, 8),
        // mem[r1 + 16] = -1 as u64
        reg_imm_off(opcode::STORE_IMM_IND_U64, 1, 16, u32::MAX),
        halt(),
    ]
    .concat();
    let int = run_with_memory(&code, &[(1, u64::from(DATA)), (2, 0xdead_beef)], memory, 20);

    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[3], 0xffff_ffff_dead_beef);
    assert_eq!(int.registers()[4], 0xbeef);
    assert_eq!(int.memory().get_u64(DATA + 16), Ok(u64::MAX));
}

#[test]
fn indirect_addresses_wrap_at_32_bits() {
    let memory = memory_with(Access::Write, DATA, &[9]);
    // r1 = DATA + 16 with garbage in the upper word, offset -16
    let base = (0xffff_u64 << 32) | u64::from(DATA + 16);
    let code = [two_reg_imm(opcode::LOAD_IND_U8, 1, 2, (-16i32) as u32), halt()].concat();
    let int = run_with_memory(&code, &[(1, base)], memory, 10);

    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[2], 9);
}

#[test]
fn immediate_store_to_fixed_address() {
    let memory = memory_with(Access::Write, DATA, &[0; 8]);
    let mut store = vec![opcode::STORE_IMM_U16, 4];
    store.extend(imm(DATA + 2));
    store.extend(imm(0x1234));
    let code = [store, halt()].concat();
    let int = run_with_memory(&code, &[], memory, 10);

    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.memory().get_u32(DATA), Ok(0x1234_0000));
}

#[test]
fn spanning_store_is_atomic() {
    let memory = memory_with(Access::Write, DATA, &[0; 4]);
    let code = [reg_imm(opcode::STORE_U32, 0, DATA + 0xffe), halt()].concat();
    let int = run_with_memory(&code, &[(0, u64::MAX)], memory, 10);

    assert_eq!(int.status(), Status::Fault);
    assert_eq!(int.exit_code(), DATA + 0x1000);
    assert_eq!(int.memory().get_u16(DATA + 0xffe), Ok(0));
}

#[test]
fn sbrk_grows_the_heap() {
    let memory = MemoryBuilder::new().build(0x3_0000);
    let code = [
        two_reg(opcode::SBRK, 0, 1),
        reg_imm(opcode::STORE_U8, 0, 0x3_0000),
        two_reg(opcode::SBRK, 5, 2),
        halt(),
    ]
    .concat();
    let int = run_with_memory(&code, &[(0, 100)], memory, 20);

    assert_eq!(int.status(), Status::Halt);
    assert_eq!(int.registers()[1], 0x3_0000);
    // zero-sized growth reports the current pointer
    assert_eq!(int.registers()[2], 0x3_0064);
    assert_eq!(int.memory().get_u8(0x3_0000), Ok(100));
    assert_eq!(int.memory().heap_pointer(), 0x3_0064);
}
