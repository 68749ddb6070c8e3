//! Variable-length integer codec and a bounds-checked byte reader.
//!
//! Length fields inside a program container use a self-describing prefix
//! encoding: the number of leading one bits in the first byte tells how many
//! little-endian continuation bytes follow. The remaining low bits of the first
//! byte carry the most significant part of the value.

use anyhow::{Result, bail, ensure};

/// Largest number of continuation bytes; signalled by a `0xFF` first byte.
const MAX_CONTINUATION: usize = 8;

/// Number of continuation bytes announced by `first` (its leading one bits).
#[inline]
pub fn continuation_len(first: u8) -> usize {
    first.leading_ones() as usize
}

/// Decode a variable-length value from the start of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_var_u64(data: &[u8]) -> Result<(u64, usize)> {
    let Some(&first) = data.first() else {
        bail!("not enough bytes to decode varint: input is empty");
    };
    let len = continuation_len(first);
    if len == 0 {
        return Ok((u64::from(first), 1));
    }
    ensure!(
        data.len() > len,
        "not enough bytes to decode varint: need {}, got {}",
        1 + len,
        data.len()
    );

    let mut number: u64 = 0;
    for i in (0..len).rev() {
        number = (number << 8) | u64::from(data[1 + i]);
    }
    if len == MAX_CONTINUATION {
        return Ok((number, 1 + len));
    }
    // low bits of the first byte, with the length prefix removed
    let bias = 256u64 - (1u64 << (8 - len));
    let msb = (u64::from(first) - bias) << (len * 8);
    Ok((number + msb, 1 + len))
}

/// Decode a variable-length value that must fit into 32 bits.
pub fn read_var_u32(data: &[u8]) -> Result<(u32, usize)> {
    let (value, consumed) = read_var_u64(data)?;
    let value = u32::try_from(value).map_err(|_| anyhow::anyhow!("varint value {value} does not fit into u32"))?;
    Ok((value, consumed))
}

/// Encode `value` with the smallest representation that fits.
pub fn encode_var_u64(value: u64) -> Vec<u8> {
    for len in 0..MAX_CONTINUATION {
        if value < 1u64 << (7 * (len + 1)) {
            let mut out = Vec::with_capacity(1 + len);
            let prefix = (256u64 - (1u64 << (8 - len))) as u8;
            out.push(prefix + (value >> (8 * len)) as u8);
            out.extend_from_slice(&value.to_le_bytes()[..len]);
            return out;
        }
    }
    let mut out = Vec::with_capacity(1 + MAX_CONTINUATION);
    out.push(0xff);
    out.extend_from_slice(&value.to_le_bytes());
    out
}

#[inline]
pub fn encode_var_u32(value: u32) -> Vec<u8> {
    encode_var_u64(u64::from(value))
}

/// Sequential reader over a byte slice; every read fails instead of running
/// past the end of the input.
#[derive(Debug)]
pub struct Decoder<'a> {
    source: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.source.len().saturating_sub(self.offset)
    }

    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.source.len()
    }

    fn ensure_bytes(&self, need: usize) -> Result<()> {
        ensure!(
            need <= self.remaining(),
            "not enough bytes left: need {}, left {}",
            need,
            self.remaining()
        );
        Ok(())
    }

    pub fn var_u32(&mut self) -> Result<u32> {
        self.ensure_bytes(1)?;
        let (value, consumed) = read_var_u32(&self.source[self.offset..])?;
        self.offset += consumed;
        Ok(value)
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure_bytes(1)?;
        let value = self.source[self.offset];
        self.offset += 1;
        Ok(value)
    }

    pub fn u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.bytes(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    pub fn u24(&mut self) -> Result<u32> {
        let raw = self.bytes(3)?;
        Ok(u32::from(raw[0]) | u32::from(raw[1]) << 8 | u32::from(raw[2]) << 16)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_bytes(len)?;
        let slice = &self.source[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }
}
