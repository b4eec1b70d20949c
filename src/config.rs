pub type BaseType = usize;

pub type Lba = BaseType;
pub type PageId = BaseType;
pub type BlockId = BaseType;
pub type Counter = BaseType;

/// Size of one logical block, which is also the size of one flash page.
pub const PAGE_SIZE: BaseType = 4096;

pub type PageBuf = [u8; PAGE_SIZE];

/// Value every byte of a page holds after its block is erased.
pub const ERASED_BYTE: u8 = 0x00;

/// Largest tolerated gap between the most and least erased block before
/// reclamation cleans the least erased block instead of the usual victim.
pub const WEAR_LEVEL_SPREAD: Counter = 2;

/// Fresh pages tried for one migrated page before giving up on the medium.
pub const PROGRAM_RETRIES: Counter = 3;

// Geometry of the simulated drive driven by the binary.
pub const FLASH_BLOCKS: BaseType = 64;
pub const PAGES_PER_BLOCK: BaseType = 64;
pub const ALL_PAGES: BaseType = FLASH_BLOCKS * PAGES_PER_BLOCK;

pub const CAPACITY: usize = ALL_PAGES * PAGE_SIZE;

/// Over-provisioning of the simulated drive, in percent of raw pages.
pub const OVER_PROVISIONING: f64 = 7.0;
