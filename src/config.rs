pub type BaseType = usize;

pub type Addr = BaseType;
pub type PageId = BaseType;
pub type BlockId = BaseType;
pub type Counter = BaseType;

pub const CHANNELS: BaseType = 1;
pub const DIES: BaseType = 1;
pub const PLANES: BaseType = 4;
pub const BLOCKS: BaseType = 64;
pub const PAGES_PER_BLOCK: BaseType = 256;

pub const PAGE_SIZE: BaseType = 4096;

pub const FREE_BLOCKS: BaseType = 5;

pub const ALL_DIES: BaseType = CHANNELS * DIES;
pub const ALL_PLANES: BaseType = ALL_DIES * PLANES;
pub const ALL_BLOCKS: BaseType = ALL_PLANES * BLOCKS;
pub const ALL_PAGES: BaseType = ALL_BLOCKS * PAGES_PER_BLOCK;

pub const CAPACITY: usize = ALL_PAGES * PAGE_SIZE;

pub const INVALID_PAGE_ID: PageId = PageId::MAX;

// TLC NAND rated endurance
pub const ERASE_COUNT_MAX: Counter = 3000;
pub const WL_WEIGHT: f64 = 0.05;
pub const CURRENT_PE_AVG: f64 = 500.0;

/// Physical layout of a simulated device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub blocks: BlockId,
    pub pages_per_block: PageId,
    pub page_size: usize,
    /// GC runs whenever the free pool drops below this many blocks.
    pub free_blocks: Counter,
}

impl Geometry {
    pub fn all_pages(&self) -> PageId {
        self.blocks * self.pages_per_block
    }

    pub fn capacity(&self) -> usize {
        self.all_pages() * self.page_size
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            blocks: ALL_BLOCKS,
            pages_per_block: PAGES_PER_BLOCK,
            page_size: PAGE_SIZE,
            free_blocks: FREE_BLOCKS,
        }
    }
}
