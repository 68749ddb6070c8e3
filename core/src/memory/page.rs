use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

pub type PageIndex = u32;
pub type ArenaId = u32;

pub const PAGE_SIZE: u32 = 4096;
pub const PAGE_SIZE_SHIFT: u32 = 12;
pub(crate) const PAGE_BYTES: usize = PAGE_SIZE as usize;

#[inline]
pub const fn page_index(address: u32) -> PageIndex {
    address >> PAGE_SIZE_SHIFT
}

#[inline]
pub const fn page_offset(address: u32) -> usize {
    (address & (PAGE_SIZE - 1)) as usize
}

#[inline]
pub const fn page_start(index: PageIndex) -> u32 {
    index << PAGE_SIZE_SHIFT
}

/// Access right of a page. `Write` implies `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    None,
    Read,
    Write,
}

/// A page-sized buffer handed out by an [`Arena`].
#[derive(Debug)]
pub struct RawPage {
    id: ArenaId,
    data: Box<[u8; PAGE_BYTES]>,
}

impl RawPage {
    fn zeroed(id: ArenaId) -> Self {
        Self {
            id,
            data: Box::new([0u8; PAGE_BYTES]),
        }
    }

    #[inline]
    pub fn id(&self) -> ArenaId {
        self.id
    }

    #[inline]
    pub fn data(&self) -> &[u8; PAGE_BYTES] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8; PAGE_BYTES] {
        &mut self.data
    }
}

/// A mapped page: an access right plus its backing buffer.
#[derive(Debug)]
pub struct Page {
    access: Access,
    raw: RawPage,
}

impl Page {
    pub fn new(access: Access, raw: RawPage) -> Self {
        Self { access, raw }
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    /// `Write` pages allow everything; other pages only their own access.
    #[inline]
    pub fn can(&self, access: Access) -> bool {
        self.access == Access::Write || self.access == access
    }

    #[inline]
    pub fn data(&self) -> &[u8; PAGE_BYTES] {
        self.raw.data()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8; PAGE_BYTES] {
        self.raw.data_mut()
    }

    pub fn into_raw(self) -> RawPage {
        self.raw
    }
}

/// Pool of reusable page buffers.
///
/// Running out of pooled buffers does not fail: a fresh zeroed buffer with a
/// synthetic id past the pool is handed out and counted in
/// [`Arena::overflow_pages`].
#[derive(Debug)]
pub struct Arena {
    free: Vec<RawPage>,
    capacity: u32,
    next_extra_id: ArenaId,
    overflow: u32,
}

impl Arena {
    pub fn new(page_count: u32) -> Self {
        // popped from the back, so id 0 is handed out first
        let free = (0..page_count).rev().map(RawPage::zeroed).collect();
        Self {
            free,
            capacity: page_count,
            next_extra_id: page_count,
            overflow: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Pooled buffers currently available.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Buffers allocated past the pool since creation.
    pub fn overflow_pages(&self) -> u32 {
        self.overflow
    }

    pub fn acquire(&mut self) -> RawPage {
        if let Some(page) = self.free.pop() {
            trace!(target: "pvm::arena", id = page.id, left = self.free.len(), "arena.acquire");
            return page;
        }
        let id = self.next_extra_id;
        self.next_extra_id = self.next_extra_id.wrapping_add(1);
        self.overflow += 1;
        warn!(
            target: "pvm::arena",
            id,
            capacity = self.capacity,
            overflow = self.overflow,
            "run out of pooled pages, allocating"
        );
        RawPage::zeroed(id)
    }

    /// Return a buffer to the pool. It is zeroed so the next session starts clean.
    pub fn release(&mut self, mut page: RawPage) {
        page.data.fill(0);
        trace!(target: "pvm::arena", id = page.id, "arena.release");
        self.free.push(page);
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(super::DEFAULT_ARENA_PAGES)
    }
}
