//! Standard program interface container.
//!
//! ```text
//! [u24 ro length][u24 rw length][u16 heap pages][u24 stack size]
//! [ro bytes][rw bytes][u32 code length][code bytes]
//! ```
//!
//! The code blob is itself a program container understood by
//! [`Program::decode`](super::Program::decode).

use anyhow::{Context, Result, ensure};

use crate::codec::Decoder;

use super::Program;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiProgram {
    pub ro_data: Vec<u8>,
    pub rw_data: Vec<u8>,
    pub heap_pages: u16,
    pub stack_size: u32,
    pub code: Vec<u8>,
}

impl SpiProgram {
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(raw);
        let ro_len = decoder.u24().context("reading read-only data length")?;
        let rw_len = decoder.u24().context("reading read-write data length")?;
        let heap_pages = decoder.u16().context("reading heap pages")?;
        let stack_size = decoder.u24().context("reading stack size")?;
        let ro_data = decoder.bytes(ro_len as usize).context("reading read-only data")?;
        let rw_data = decoder.bytes(rw_len as usize).context("reading read-write data")?;
        let code_len = decoder.u32().context("reading code length")?;
        let code = decoder.bytes(code_len as usize).context("reading code")?;
        ensure!(
            decoder.is_exhausted(),
            "unexpected {} trailing bytes after code",
            decoder.remaining()
        );
        Ok(Self {
            ro_data: ro_data.to_vec(),
            rw_data: rw_data.to_vec(),
            heap_pages,
            stack_size,
            code: code.to_vec(),
        })
    }

    /// Decode the embedded code blob.
    pub fn program(&self) -> Result<Program> {
        Program::decode(&self.code).context("decoding embedded program")
    }
}
