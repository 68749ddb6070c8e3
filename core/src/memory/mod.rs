//! Paged, access-controlled memory.
//!
//! Pages are 4096 bytes and only exist once they were set up by a
//! [`MemoryBuilder`] or installed by heap growth ([`Memory::sbrk`]). Touching a
//! missing page, or writing to a page without `Write` access, yields a
//! [`Fault`] carrying the offending address. Accesses that straddle two pages
//! check both pages before any byte is written.

mod page;

use std::fmt;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

pub use page::{
    Access, Arena, ArenaId, PAGE_SIZE, PAGE_SIZE_SHIFT, Page, PageIndex, RawPage, page_index, page_offset, page_start,
};
use page::PAGE_BYTES;

pub const DEFAULT_ARENA_PAGES: u32 = 128;

/// Sizing of the page pool and the initial heap pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MemoryConfig {
    pub arena_pages: u32,
    pub heap_start: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            arena_pages: DEFAULT_ARENA_PAGES,
            heap_start: 0,
        }
    }
}

/// A rejected memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fault {
    pub address: u32,
}

impl Fault {
    #[inline]
    pub const fn at(address: u32) -> Self {
        Self { address }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page fault at 0x{:08x}", self.address)
    }
}

impl std::error::Error for Fault {}

/// Collects the initial pages and their contents.
#[derive(Debug)]
pub struct MemoryBuilder {
    pages: FastHashMap<PageIndex, Page>,
    arena: Arena,
}

impl Default for MemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBuilder {
    pub fn new() -> Self {
        Self::with_arena(Arena::default())
    }

    pub fn with_config(config: &MemoryConfig) -> Self {
        Self::with_arena(Arena::new(config.arena_pages))
    }

    /// Reuse the buffers of an arena released by an earlier session.
    pub fn with_arena(arena: Arena) -> Self {
        Self {
            pages: fast_hash_map_new(),
            arena,
        }
    }

    /// Copy `data` to `address`, creating the page with `access` when absent.
    /// An existing page keeps its access. The write must stay within one page.
    pub fn set_data(&mut self, access: Access, address: u32, data: &[u8]) -> Result<&mut Self> {
        let offset = page_offset(address);
        ensure!(
            offset + data.len() <= PAGE_BYTES,
            "cannot write {} bytes at 0x{:08x}: data crosses a page boundary",
            data.len(),
            address
        );
        let index = page_index(address);
        let arena = &mut self.arena;
        let page = self
            .pages
            .entry(index)
            .or_insert_with(|| Page::new(access, arena.acquire()));
        page.data_mut()[offset..offset + data.len()].copy_from_slice(data);
        Ok(self)
    }

    pub fn build(self, sbrk_start: u32) -> Memory {
        trace!(target: "pvm::memory", pages = self.pages.len(), sbrk = sbrk_start, "memory.build");
        Memory {
            pages: self.pages,
            sbrk: sbrk_start,
            arena: self.arena,
        }
    }
}

#[derive(Debug)]
pub struct Memory {
    pages: FastHashMap<PageIndex, Page>,
    sbrk: u32,
    arena: Arena,
}

impl Default for Memory {
    fn default() -> Self {
        MemoryBuilder::new().build(0)
    }
}

impl Memory {
    /// Current heap pointer.
    pub fn heap_pointer(&self) -> u32 {
        self.sbrk
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mapped page indices in ascending order.
    pub fn page_indices(&self) -> Vec<PageIndex> {
        let mut indices: Vec<PageIndex> = self.pages.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn page(&self, index: PageIndex) -> Option<&Page> {
        self.pages.get(&index)
    }

    /// Raw contents of a mapped page, regardless of its access.
    pub fn page_dump(&self, index: PageIndex) -> Option<&[u8]> {
        self.pages.get(&index).map(|p| &p.data()[..])
    }

    fn resolve(&self, address: u32, access: Access) -> Result<&Page, Fault> {
        match self.pages.get(&page_index(address)) {
            Some(page) if page.can(access) => Ok(page),
            _ => Err(Fault::at(address)),
        }
    }

    fn read<const N: usize>(&self, address: u32) -> Result<[u8; N], Fault> {
        let offset = page_offset(address);
        let first = self.resolve(address, Access::Read)?;
        let mut out = [0u8; N];
        if offset + N <= PAGE_BYTES {
            out.copy_from_slice(&first.data()[offset..offset + N]);
            return Ok(out);
        }
        let split = PAGE_BYTES - offset;
        let next = address.wrapping_add(split as u32);
        let second = self.resolve(next, Access::Read)?;
        out[..split].copy_from_slice(&first.data()[offset..]);
        out[split..].copy_from_slice(&second.data()[..N - split]);
        Ok(out)
    }

    fn write<const N: usize>(&mut self, address: u32, bytes: [u8; N]) -> Result<(), Fault> {
        let offset = page_offset(address);
        self.resolve(address, Access::Write)?;
        if offset + N <= PAGE_BYTES {
            if let Some(page) = self.pages.get_mut(&page_index(address)) {
                page.data_mut()[offset..offset + N].copy_from_slice(&bytes);
            }
            return Ok(());
        }
        let split = PAGE_BYTES - offset;
        let next = address.wrapping_add(split as u32);
        self.resolve(next, Access::Write)?;
        if let Some(page) = self.pages.get_mut(&page_index(address)) {
            page.data_mut()[offset..].copy_from_slice(&bytes[..split]);
        }
        if let Some(page) = self.pages.get_mut(&page_index(next)) {
            page.data_mut()[..N - split].copy_from_slice(&bytes[split..]);
        }
        Ok(())
    }

    pub fn get_u8(&self, address: u32) -> Result<u8, Fault> {
        self.read::<1>(address).map(|b| b[0])
    }

    pub fn get_i8(&self, address: u32) -> Result<i8, Fault> {
        self.get_u8(address).map(|v| v as i8)
    }

    pub fn get_u16(&self, address: u32) -> Result<u16, Fault> {
        self.read(address).map(u16::from_le_bytes)
    }

    pub fn get_i16(&self, address: u32) -> Result<i16, Fault> {
        self.read(address).map(i16::from_le_bytes)
    }

    pub fn get_u32(&self, address: u32) -> Result<u32, Fault> {
        self.read(address).map(u32::from_le_bytes)
    }

    pub fn get_i32(&self, address: u32) -> Result<i32, Fault> {
        self.read(address).map(i32::from_le_bytes)
    }

    pub fn get_u64(&self, address: u32) -> Result<u64, Fault> {
        self.read(address).map(u64::from_le_bytes)
    }

    pub fn set_u8(&mut self, address: u32, value: u8) -> Result<(), Fault> {
        self.write(address, [value])
    }

    pub fn set_u16(&mut self, address: u32, value: u16) -> Result<(), Fault> {
        self.write(address, value.to_le_bytes())
    }

    pub fn set_u32(&mut self, address: u32, value: u32) -> Result<(), Fault> {
        self.write(address, value.to_le_bytes())
    }

    pub fn set_u64(&mut self, address: u32, value: u64) -> Result<(), Fault> {
        self.write(address, value.to_le_bytes())
    }

    /// Grow the heap by `amount` bytes and return the previous heap pointer.
    ///
    /// Only the page holding the new pointer is installed (with `Write`
    /// access) when it is not mapped yet. Pages skipped over by a large
    /// growth stay unmapped.
    pub fn sbrk(&mut self, amount: u32) -> u32 {
        let old = self.sbrk;
        if amount == 0 {
            return old;
        }
        let (new, wrapped) = old.overflowing_add(amount);
        self.sbrk = new;
        if wrapped {
            warn!(target: "pvm::memory", old, amount, new, "heap pointer wrapped around");
        }
        self.install_heap_page(page_index(new));
        trace!(target: "pvm::memory", old, new, pages = self.pages.len(), "memory.sbrk");
        old
    }

    fn install_heap_page(&mut self, index: PageIndex) {
        if self.pages.contains_key(&index) {
            return;
        }
        let raw = self.arena.acquire();
        self.pages.insert(index, Page::new(Access::Write, raw));
    }

    /// Give every page back to the arena and unmap everything.
    pub fn free(&mut self) {
        let arena = &mut self.arena;
        for (_, page) in self.pages.drain() {
            arena.release(page.into_raw());
        }
    }

    /// Free all pages and hand the arena over for another session.
    pub fn into_arena(mut self) -> Arena {
        self.free();
        self.arena
    }
}
