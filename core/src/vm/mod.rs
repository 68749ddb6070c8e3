//! Register machine: registers, gas, per-opcode semantics and the step loop.

pub mod exec;
pub mod gas;
pub mod interpreter;
pub mod math;
pub mod outcome;
pub mod registers;

pub use gas::{Gas, GasCounter};
pub use interpreter::{EXIT_ADDRESS, Interpreter, Status};
pub use outcome::{ExitKind, Outcome};
pub use registers::{NO_OF_REGISTERS, REG_SIZE_BYTES, Registers};

#[cfg(test)]
mod vm_test;
