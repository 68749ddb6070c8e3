//! Host-binding surface: whole-run fixtures ([`run_vm`]) and the stepwise
//! [`Session`] handle.

mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::memory::{Access, Memory, MemoryBuilder, MemoryConfig, PAGE_SIZE, PageIndex, page_start};
use crate::program::{Program, ProgramCounter};
use crate::vm::{Gas, Interpreter, Registers, Status};

pub use session::{NOT_STARTED, Session, read_chunks, read_page_map};

/// Access rights for `length` bytes starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PageDescriptor {
    pub address: u32,
    pub length: u32,
    pub is_writable: bool,
}

impl PageDescriptor {
    pub fn access(&self) -> Access {
        if self.is_writable { Access::Write } else { Access::Read }
    }
}

/// Contiguous bytes at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Chunk {
    pub address: u32,
    pub contents: Vec<u8>,
}

/// Status names used by conformance fixtures. Panics and faults both map to
/// `trap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    Halt,
    Trap,
    Host,
    Oog,
    Ok,
}

impl From<Status> for ExitStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ExitStatus::Ok,
            Status::Halt => ExitStatus::Halt,
            Status::Panic | Status::Fault => ExitStatus::Trap,
            Status::Host => ExitStatus::Host,
            Status::Oog => ExitStatus::Oog,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInput {
    #[serde(rename = "initial-regs")]
    pub registers: Vec<u64>,
    #[serde(rename = "initial-pc", default)]
    pub pc: ProgramCounter,
    #[serde(rename = "initial-gas")]
    pub gas: Gas,
    pub program: Vec<u8>,
    #[serde(rename = "initial-page-map", default)]
    pub page_map: Vec<PageDescriptor>,
    #[serde(rename = "initial-memory", default)]
    pub memory: Vec<Chunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmOutput {
    #[serde(rename = "expected-status")]
    pub status: ExitStatus,
    #[serde(rename = "expected-regs")]
    pub registers: Vec<u64>,
    #[serde(rename = "expected-pc")]
    pub pc: ProgramCounter,
    #[serde(rename = "expected-memory", default)]
    pub memory: Vec<Chunk>,
    #[serde(rename = "expected-gas")]
    pub gas: Gas,
    #[serde(rename = "expected-exit-code", default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<u32>,
}

impl VmOutput {
    fn from_interpreter(int: &Interpreter) -> Self {
        let exit_code = matches!(int.status(), Status::Fault | Status::Host).then(|| int.exit_code());
        Self {
            status: int.status().into(),
            registers: int.registers().to_vec(),
            pc: int.pc(),
            memory: output_chunks(int.memory()),
            gas: int.gas(),
            exit_code,
        }
    }
}

/// Knobs of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    pub memory: MemoryConfig,
    /// Stop after this many steps even if the program is still running.
    pub max_steps: Option<u64>,
    /// Log registers before every step.
    pub trace_steps: bool,
}

pub fn run_vm(input: &VmInput) -> Result<VmOutput> {
    run_vm_with(input, &RunConfig::default())
}

/// Decode, run until a terminal status (or the step bound) and collect the
/// final state.
pub fn run_vm_with(input: &VmInput, config: &RunConfig) -> Result<VmOutput> {
    let program = Program::decode(&input.program).context("decoding program")?;
    let registers = Registers::from_slice(&input.registers)?;
    let mut builder = MemoryBuilder::with_config(&config.memory);
    apply_page_map(&mut builder, &input.page_map)?;
    apply_chunks(&mut builder, &input.memory)?;
    let memory = builder.build(config.memory.heap_start);

    let mut int = Interpreter::new(Arc::new(program), registers, memory, input.gas).with_pc(input.pc);
    let mut steps = 0u64;
    while config.max_steps.is_none_or(|max| steps < max) {
        if config.trace_steps {
            info!(
                target: "pvm::vm",
                pc = int.pc(),
                gas = int.gas(),
                registers = ?int.registers().as_slice(),
                "state"
            );
        }
        if !int.next_step() {
            break;
        }
        steps += 1;
    }
    info!(target: "pvm::vm", steps, status = int.status().name(), "run finished");
    Ok(VmOutput::from_interpreter(&int))
}

/// Split `[address, address + length)` into pieces that stay within one page.
fn page_segments(address: u32, length: u32) -> impl Iterator<Item = (u32, u32)> {
    let end = u64::from(address) + u64::from(length);
    let mut cursor = u64::from(address);
    std::iter::from_fn(move || {
        if cursor >= end {
            return None;
        }
        let page_end = (cursor / u64::from(PAGE_SIZE) + 1) * u64::from(PAGE_SIZE);
        let next = page_end.min(end);
        let segment = (cursor as u32, (next - cursor) as u32);
        cursor = next;
        Some(segment)
    })
}

pub(crate) fn apply_page_map(builder: &mut MemoryBuilder, pages: &[PageDescriptor]) -> Result<()> {
    for page in pages {
        let zeros = [0u8; PAGE_SIZE as usize];
        for (address, length) in page_segments(page.address, page.length) {
            builder
                .set_data(page.access(), address, &zeros[..length as usize])
                .with_context(|| format!("mapping page at {:#x}", page.address))?;
        }
    }
    Ok(())
}

pub(crate) fn apply_chunks(builder: &mut MemoryBuilder, chunks: &[Chunk]) -> Result<()> {
    for chunk in chunks {
        let mut rest = chunk.contents.as_slice();
        for (address, length) in page_segments(chunk.address, rest.len() as u32) {
            let (head, tail) = rest.split_at(length as usize);
            // pages already exist, so the access passed here is not applied
            builder
                .set_data(Access::None, address, head)
                .with_context(|| format!("writing chunk at {:#x}", chunk.address))?;
            rest = tail;
        }
    }
    Ok(())
}

/// Non-zero byte runs of `memory` in address order. Runs continue across
/// adjacent pages and break at zero bytes and at unmapped gaps.
pub fn output_chunks(memory: &Memory) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Option<Chunk> = None;
    let mut previous: Option<PageIndex> = None;
    for index in memory.page_indices() {
        if previous.is_some_and(|p| p.checked_add(1) != Some(index)) {
            chunks.extend(current.take());
        }
        previous = Some(index);
        let Some(data) = memory.page_dump(index) else {
            continue;
        };
        let base = page_start(index);
        for (offset, &byte) in data.iter().enumerate() {
            if byte == 0 {
                chunks.extend(current.take());
                continue;
            }
            match current.as_mut() {
                Some(chunk) => chunk.contents.push(byte),
                None => {
                    current = Some(Chunk {
                        address: base + offset as u32,
                        contents: vec![byte],
                    })
                }
            }
        }
    }
    chunks.extend(current);
    chunks
}
