use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::codec::Decoder;
use crate::memory::{Arena, Memory, MemoryBuilder, MemoryConfig, PAGE_SIZE, PageIndex};
use crate::program::{Program, ProgramCounter};
use crate::vm::{Gas, Interpreter, NO_OF_REGISTERS, REG_SIZE_BYTES, Registers};

use super::{Chunk, PageDescriptor, apply_chunks, apply_page_map};

/// Status reported by a [`Session`] that was never reset.
pub const NOT_STARTED: u8 = 0xfe;

/// Stepwise driver for host bindings.
///
/// Holds at most one interpreter. Resetting replaces it and hands the previous
/// memory's pages back to the arena for reuse.
#[derive(Debug, Default)]
pub struct Session {
    interpreter: Option<Interpreter>,
    config: MemoryConfig,
    spare_arena: Option<Arena>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_started(&self) -> bool {
        self.interpreter.is_some()
    }

    /// Start `program` with empty memory.
    pub fn reset(&mut self, program: &[u8], flat_registers: &[u8], gas: Gas) -> Result<()> {
        let (program, registers) = decode_entry(program, flat_registers)?;
        let builder = self.builder();
        self.start(program, registers, builder.build(self.config.heap_start), gas);
        Ok(())
    }

    /// Start `program` with memory described by the binary page map and chunk
    /// payloads (see [`read_page_map`] and [`read_chunks`]).
    pub fn reset_with_memory(
        &mut self,
        program: &[u8],
        flat_registers: &[u8],
        page_map: &[u8],
        chunks: &[u8],
        gas: Gas,
    ) -> Result<()> {
        let (program, registers) = decode_entry(program, flat_registers)?;
        let pages = read_page_map(page_map)?;
        let chunks = read_chunks(chunks)?;
        let mut builder = self.builder();
        apply_page_map(&mut builder, &pages)?;
        apply_chunks(&mut builder, &chunks)?;
        self.start(program, registers, builder.build(self.config.heap_start), gas);
        Ok(())
    }

    fn builder(&mut self) -> MemoryBuilder {
        let arena = match self.interpreter.take() {
            Some(previous) => previous.into_memory().into_arena(),
            None => self.spare_arena.take().unwrap_or_else(|| Arena::new(self.config.arena_pages)),
        };
        MemoryBuilder::with_arena(arena)
    }

    fn start(&mut self, program: Program, registers: Registers, memory: Memory, gas: Gas) {
        debug!(target: "pvm::vm", code = program.code.len(), gas, "session reset");
        let mut int = Interpreter::new(Arc::new(program), registers, memory, gas);
        // the first step after a reset only installs pc 0
        int.set_next_pc(0);
        self.interpreter = Some(int);
    }

    /// Drop the interpreter, keeping its pages for the next reset.
    pub fn clear(&mut self) {
        if let Some(previous) = self.interpreter.take() {
            self.spare_arena = Some(previous.into_memory().into_arena());
        }
    }

    pub fn next_step(&mut self) -> bool {
        self.interpreter.as_mut().is_some_and(Interpreter::next_step)
    }

    pub fn run(&mut self, max_steps: Option<u64>) -> u64 {
        self.interpreter.as_mut().map_or(0, |int| int.run(max_steps))
    }

    pub fn program_counter(&self) -> ProgramCounter {
        self.interpreter.as_ref().map_or(0, Interpreter::pc)
    }

    pub fn set_next_program_counter(&mut self, pc: ProgramCounter) {
        if let Some(int) = self.interpreter.as_mut() {
            int.set_next_pc(pc);
        }
    }

    /// Continue after a host call at `pc`.
    pub fn resume(&mut self, pc: ProgramCounter) {
        if let Some(int) = self.interpreter.as_mut() {
            int.resume(pc);
        }
    }

    /// Status code, or [`NOT_STARTED`].
    pub fn status(&self) -> u8 {
        self.interpreter.as_ref().map_or(NOT_STARTED, |int| int.status().as_u8())
    }

    pub fn exit_arg(&self) -> u32 {
        self.interpreter.as_ref().map_or(0, Interpreter::exit_code)
    }

    pub fn gas_left(&self) -> Gas {
        self.interpreter.as_ref().map_or(0, Interpreter::gas)
    }

    pub fn set_gas_left(&mut self, gas: Gas) {
        if let Some(int) = self.interpreter.as_mut() {
            int.set_gas(gas);
        }
    }

    pub fn registers_flat(&self) -> Vec<u8> {
        match &self.interpreter {
            Some(int) => int.registers().to_flat(),
            None => vec![0; NO_OF_REGISTERS * REG_SIZE_BYTES],
        }
    }

    /// Contents of page `index`; unmapped pages read as zeros.
    pub fn page_dump(&self, index: PageIndex) -> Vec<u8> {
        self.interpreter
            .as_ref()
            .and_then(|int| int.memory().page_dump(index))
            .map_or_else(|| vec![0; PAGE_SIZE as usize], <[u8]>::to_vec)
    }

    pub fn interpreter(&self) -> Option<&Interpreter> {
        self.interpreter.as_ref()
    }
}

fn decode_entry(program: &[u8], flat_registers: &[u8]) -> Result<(Program, Registers)> {
    let program = Program::decode(program).context("decoding program")?;
    let registers = Registers::from_flat(flat_registers)?;
    Ok((program, registers))
}

/// Parse repeated `[u32 address][u32 length][u8 writable]` records.
pub fn read_page_map(bytes: &[u8]) -> Result<Vec<PageDescriptor>> {
    let mut decoder = Decoder::new(bytes);
    let mut pages = Vec::new();
    while !decoder.is_exhausted() {
        let entry = pages.len();
        let address = decoder.u32().with_context(|| format!("reading page map entry {entry} address"))?;
        let length = decoder.u32().with_context(|| format!("reading page map entry {entry} length"))?;
        let writable = decoder.u8().with_context(|| format!("reading page map entry {entry} access"))?;
        pages.push(PageDescriptor {
            address,
            length,
            is_writable: writable > 0,
        });
    }
    Ok(pages)
}

/// Parse repeated `[u32 address][u32 length][bytes]` records.
pub fn read_chunks(bytes: &[u8]) -> Result<Vec<Chunk>> {
    let mut decoder = Decoder::new(bytes);
    let mut chunks = Vec::new();
    while !decoder.is_exhausted() {
        let entry = chunks.len();
        let address = decoder.u32().with_context(|| format!("reading chunk {entry} address"))?;
        let length = decoder.u32().with_context(|| format!("reading chunk {entry} length"))?;
        let contents = decoder
            .bytes(length as usize)
            .with_context(|| format!("reading chunk {entry} contents"))?;
        chunks.push(Chunk {
            address,
            contents: contents.to_vec(),
        });
    }
    Ok(chunks)
}
