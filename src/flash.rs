use thiserror::Error;

use crate::config::*;

/// Failures reported by a flash medium.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlashError {
    #[error("address {0} beyond the end of the device")]
    OutOfBounds(BaseType),
    #[error("page {0} programmed since its last erase")]
    NotErased(PageId),
    #[error("device fault")]
    Fault,
}

/// Raw page-programmable, block-erasable flash device.
///
/// Geometry is queried once when a layer is created and must not change
/// afterwards.
pub trait Flash {
    /// Total number of pages on the device.
    fn page_count(&self) -> BaseType;

    /// Number of contiguous pages forming one erase block.
    fn pages_per_block(&self) -> BaseType;

    /// Reads the last programmed contents of `page`, or the erased value if
    /// the page was not programmed since its block's last erase.
    fn read(&mut self, page: PageId, buf: &mut PageBuf) -> Result<(), FlashError>;

    /// Programs `page`. Only defined on a page not programmed since its
    /// block was last erased.
    fn write(&mut self, page: PageId, buf: &PageBuf) -> Result<(), FlashError>;

    /// Returns every page of `block` to the erased value.
    fn erase(&mut self, block: BlockId) -> Result<(), FlashError>;
}

/// Operation counters kept by [`RamFlash`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlashStats {
    pub reads: Counter,
    pub writes: Counter,
    pub erases: Counter,
}

/// In-memory NAND simulation.
///
/// Enforces the program-once-per-erase rule and can be told to fail the
/// next few reads, writes or erases. A failed write leaves the page half
/// programmed: it holds garbage and cannot be written again until erased.
pub struct RamFlash {
    data: Vec<u8>,
    programmed: Vec<bool>,
    pages_per_block: BaseType,
    stats: FlashStats,
    fail_reads: Counter,
    fail_writes: Counter,
    fail_erases: Counter,
}

impl RamFlash {
    pub fn new(blocks: BaseType, pages_per_block: BaseType) -> Self {
        let pages = blocks * pages_per_block;
        RamFlash {
            data: vec![ERASED_BYTE; pages * PAGE_SIZE],
            programmed: vec![false; pages],
            pages_per_block,
            stats: FlashStats::default(),
            fail_reads: 0,
            fail_writes: 0,
            fail_erases: 0,
        }
    }

    pub fn stats(&self) -> FlashStats {
        self.stats
    }

    pub fn fail_next_reads(&mut self, n: Counter) {
        self.fail_reads = n;
    }

    pub fn fail_next_writes(&mut self, n: Counter) {
        self.fail_writes = n;
    }

    pub fn fail_next_erases(&mut self, n: Counter) {
        self.fail_erases = n;
    }

    pub fn is_programmed(&self, page: PageId) -> bool {
        self.programmed.get(page).copied().unwrap_or(false)
    }

    fn page_mut(&mut self, page: PageId) -> &mut [u8] {
        &mut self.data[page * PAGE_SIZE..(page + 1) * PAGE_SIZE]
    }

    fn take_fault(counter: &mut Counter) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

impl Flash for RamFlash {
    fn page_count(&self) -> BaseType {
        self.programmed.len()
    }

    fn pages_per_block(&self) -> BaseType {
        self.pages_per_block
    }

    fn read(&mut self, page: PageId, buf: &mut PageBuf) -> Result<(), FlashError> {
        if page >= self.page_count() {
            return Err(FlashError::OutOfBounds(page));
        }
        if Self::take_fault(&mut self.fail_reads) {
            return Err(FlashError::Fault);
        }
        buf.copy_from_slice(&self.data[page * PAGE_SIZE..(page + 1) * PAGE_SIZE]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write(&mut self, page: PageId, buf: &PageBuf) -> Result<(), FlashError> {
        if page >= self.page_count() {
            return Err(FlashError::OutOfBounds(page));
        }
        if self.programmed[page] {
            return Err(FlashError::NotErased(page));
        }
        self.programmed[page] = true;
        if Self::take_fault(&mut self.fail_writes) {
            // interrupted program: first half landed, the rest is noise
            let half = PAGE_SIZE / 2;
            let dst = self.page_mut(page);
            dst[..half].copy_from_slice(&buf[..half]);
            dst[half..].fill(0xA5);
            return Err(FlashError::Fault);
        }
        self.page_mut(page).copy_from_slice(buf);
        self.stats.writes += 1;
        Ok(())
    }

    fn erase(&mut self, block: BlockId) -> Result<(), FlashError> {
        let first = block * self.pages_per_block;
        if first >= self.page_count() {
            return Err(FlashError::OutOfBounds(block));
        }
        if Self::take_fault(&mut self.fail_erases) {
            return Err(FlashError::Fault);
        }
        let last = first + self.pages_per_block;
        self.data[first * PAGE_SIZE..last * PAGE_SIZE].fill(ERASED_BYTE);
        self.programmed[first..last].fill(false);
        self.stats.erases += 1;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn program_once_per_erase() {
        let mut flash = RamFlash::new(2, 4);
        let buf = [7u8; PAGE_SIZE];

        flash.write(5, &buf).unwrap();
        assert_eq!(flash.write(5, &buf), Err(FlashError::NotErased(5)));

        flash.erase(1).unwrap();
        flash.write(5, &buf).unwrap();
        assert_eq!(flash.stats(), FlashStats { reads: 0, writes: 2, erases: 1 });
    }

    #[test]
    fn erase_restores_erased_value() {
        let mut flash = RamFlash::new(2, 4);
        flash.write(1, &[9u8; PAGE_SIZE]).unwrap();
        flash.erase(0).unwrap();

        let mut out = [0xFFu8; PAGE_SIZE];
        flash.read(1, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == ERASED_BYTE));
        assert!(!flash.is_programmed(1));
    }

    #[test]
    fn failed_write_leaves_page_unusable() {
        let mut flash = RamFlash::new(1, 4);
        flash.fail_next_writes(1);

        assert_eq!(flash.write(0, &[1u8; PAGE_SIZE]), Err(FlashError::Fault));
        assert!(flash.is_programmed(0));
        assert_eq!(flash.write(0, &[1u8; PAGE_SIZE]), Err(FlashError::NotErased(0)));
        flash.write(1, &[1u8; PAGE_SIZE]).unwrap();
    }

    #[test]
    fn rejects_out_of_bounds() {
        let mut flash = RamFlash::new(1, 4);
        let mut out = [0u8; PAGE_SIZE];
        assert_eq!(flash.read(4, &mut out), Err(FlashError::OutOfBounds(4)));
        assert_eq!(flash.erase(1), Err(FlashError::OutOfBounds(1)));
    }
}
