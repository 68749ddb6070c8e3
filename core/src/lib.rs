//! Deterministic register-machine interpreter.
//!
//! [`program::Program::decode`] turns a container into code, mask, basic
//! blocks and jump table; [`vm::Interpreter`] steps it against a paged
//! [`memory::Memory`] under a gas budget. [`api`] wraps both for host
//! bindings and conformance fixtures.

pub mod api;
pub mod codec;
pub mod isa;
pub mod memory;
pub mod program;
pub mod util;
pub mod vm;
