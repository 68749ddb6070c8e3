use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::isa::lookup;
use crate::memory::Memory;
use crate::program::{Program, ProgramCounter};

use super::exec::dispatch;
use super::gas::{Gas, GasCounter};
use super::outcome::{ExitKind, Outcome};
use super::registers::Registers;

/// Dynamic jump address that halts the machine.
pub const EXIT_ADDRESS: u32 = 0xffff_0000;
/// Dynamic jump addresses are multiples of this factor.
pub const JUMP_ALIGNMENT: u32 = 2;

/// Execution status. Everything but [`Status::Ok`] is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Ok,
    Halt,
    Panic,
    Fault,
    Host,
    Oog,
}

impl Status {
    /// Numeric code; `Ok` is -1.
    pub const fn code(self) -> i8 {
        match self {
            Status::Ok => -1,
            Status::Halt => 0,
            Status::Panic => 1,
            Status::Fault => 2,
            Status::Host => 3,
            Status::Oog => 4,
        }
    }

    /// Code as seen through an unsigned byte, `Ok` becomes 255.
    pub const fn as_u8(self) -> u8 {
        self.code() as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Halt => "halt",
            Status::Panic => "panic",
            Status::Fault => "fault",
            Status::Host => "host",
            Status::Oog => "oog",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fetch-decode-execute state of one program execution.
pub struct Interpreter {
    program: Arc<Program>,
    registers: Registers,
    memory: Memory,
    gas: GasCounter,
    pc: ProgramCounter,
    next_pc: Option<ProgramCounter>,
    status: Status,
    exit_code: u32,
}

impl Interpreter {
    pub fn new(program: Arc<Program>, registers: Registers, memory: Memory, gas: Gas) -> Self {
        Self {
            program,
            registers,
            memory,
            gas: GasCounter::new(gas),
            pc: 0,
            next_pc: None,
            status: Status::Ok,
            exit_code: 0,
        }
    }

    /// Start at `pc` instead of 0.
    pub fn with_pc(mut self, pc: ProgramCounter) -> Self {
        self.pc = pc;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn into_memory(self) -> Memory {
        self.memory
    }

    pub fn gas(&self) -> Gas {
        self.gas.get()
    }

    pub fn set_gas(&mut self, gas: Gas) {
        self.gas.set(gas);
    }

    pub fn pc(&self) -> ProgramCounter {
        self.pc
    }

    /// Arm a program counter that the next step installs without executing.
    pub fn set_next_pc(&mut self, pc: ProgramCounter) {
        self.next_pc = Some(pc);
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Host call id or faulting address of the last step.
    pub fn exit_code(&self) -> u32 {
        self.exit_code
    }

    /// Resume after a host call. The caller has already serviced the call.
    pub fn resume(&mut self, pc: ProgramCounter) {
        self.status = Status::Ok;
        self.exit_code = 0;
        self.next_pc = Some(pc);
    }

    /// Execute one instruction. Returns `false` once the status is terminal.
    pub fn next_step(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if let Some(pc) = self.next_pc.take() {
            self.pc = pc;
            return true;
        }
        self.exit_code = 0;

        let pc = self.pc;
        let program = Arc::clone(&self.program);
        if !program.mask.is_instruction(pc) {
            let status = if self.gas.sub(1) { Status::Oog } else { Status::Panic };
            return self.finish(status);
        }

        let opcode = program.code[pc as usize];
        let instruction = lookup(opcode);
        if self.gas.sub(instruction.gas) {
            return self.finish(Status::Oog);
        }
        if instruction.is_invalid() {
            return self.finish(Status::Panic);
        }

        let args_len = program.mask.args_len(pc);
        let start = pc as usize + 1;
        let end = start + args_len as usize;
        if end > program.code.len() {
            return self.finish(Status::Panic);
        }
        let Some(args) = instruction.shape.decode(&program.code[start..end]) else {
            return self.finish(Status::Panic);
        };

        trace!(
            target: "pvm::vm",
            pc,
            name = instruction.name,
            a = args.a,
            b = args.b,
            c = args.c,
            d = args.d,
            gas = self.gas.get(),
            "step"
        );

        match dispatch(opcode, args, &mut self.registers, &mut self.memory) {
            Outcome::Ok => {
                self.pc = end as ProgramCounter;
                true
            }
            Outcome::StaticJump(offset) => {
                let target = pc.wrapping_add_signed(offset);
                if !program.basic_blocks.is_start(target) {
                    return self.finish(Status::Panic);
                }
                self.pc = target;
                true
            }
            Outcome::DynamicJump(address) => self.dynamic_jump(&program, address),
            Outcome::Result(ExitKind::Host, id) => {
                self.exit_code = id;
                self.finish(Status::Host)
            }
            Outcome::Result(ExitKind::Fault, address) => {
                // the extra unit is charged but the fault wins over exhaustion
                self.gas.sub(1);
                self.exit_code = address;
                self.finish(Status::Fault)
            }
            Outcome::Result(ExitKind::Panic, _) => self.finish(Status::Panic),
        }
    }

    /// Step until the status is terminal or `max_steps` steps were taken.
    /// Returns the number of steps executed.
    pub fn run(&mut self, max_steps: Option<u64>) -> u64 {
        let mut steps = 0;
        while max_steps.is_none_or(|max| steps < max) {
            if !self.next_step() {
                break;
            }
            steps += 1;
        }
        steps
    }

    fn dynamic_jump(&mut self, program: &Program, address: u32) -> bool {
        if address == EXIT_ADDRESS {
            return self.finish(Status::Halt);
        }
        if address == 0 || address % JUMP_ALIGNMENT != 0 {
            return self.finish(Status::Panic);
        }
        let index = address / JUMP_ALIGNMENT - 1;
        match program.jump_table.get(index) {
            Some(target) if program.basic_blocks.is_start(target) => {
                self.pc = target;
                true
            }
            _ => self.finish(Status::Panic),
        }
    }

    fn finish(&mut self, status: Status) -> bool {
        self.status = status;
        debug!(
            target: "pvm::vm",
            pc = self.pc,
            status = status.name(),
            exit_code = self.exit_code,
            gas = self.gas.get(),
            "execution stopped"
        );
        false
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("pc", &self.pc)
            .field("next_pc", &self.next_pc)
            .field("status", &self.status)
            .field("exit_code", &self.exit_code)
            .field("gas", &self.gas.get())
            .field("registers", &self.registers)
            .finish()
    }
}
