use std::collections::BTreeMap;

use byte_unit::Byte;
use log::{info, trace, warn};

use crate::config::*;
use crate::error::{FtlError, MediumOp, Result};
use crate::flash::Flash;
use crate::map::{PageState, Tables};

/// Operation counters of one layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub reads: Counter,
    pub writes: Counter,
    /// Blocks erased by reclamation, wear-leveling cleans included.
    pub cleans: Counter,
    pub wear_level_cleans: Counter,
    pub migrated_pages: Counter,
}

/// Flash translation layer: a fixed-size array of logical blocks on top of
/// a borrowed flash medium.
pub struct Ftl<'f, F: Flash + ?Sized> {
    pub(crate) flash: &'f mut F,
    pub(crate) tables: Tables,
    /// Live pages that could not be programmed back during a clean.
    pub(crate) parked: BTreeMap<Lba, Box<PageBuf>>,
    pub(crate) stats: Stats,
}

impl<'f, F: Flash + ?Sized> Ftl<'f, F> {
    /// Creates a layer exposing `logical_blocks` blocks, sized from the
    /// geometry the medium reports.
    pub fn new(flash: &'f mut F, logical_blocks: BaseType) -> Result<Self> {
        let page_count = flash.page_count();
        let pages_per_block = flash.pages_per_block();

        if page_count == 0 || pages_per_block == 0 {
            return Err(FtlError::InvalidGeometry(format!(
                "{page_count} pages, {pages_per_block} pages per block"
            )));
        }
        if page_count % pages_per_block != 0 {
            return Err(FtlError::InvalidGeometry(format!(
                "{page_count} pages do not split into blocks of {pages_per_block}"
            )));
        }
        if logical_blocks == 0 || logical_blocks > page_count {
            return Err(FtlError::InvalidGeometry(format!(
                "{logical_blocks} logical blocks on {page_count} pages"
            )));
        }

        info!(
            "Geometry: {} blocks x {} pages, {} logical blocks",
            page_count / pages_per_block,
            pages_per_block,
            logical_blocks
        );
        info!(
            "Physical Capacity: {}, User Capacity: {}",
            Byte::from_bytes((page_count * PAGE_SIZE) as u128).get_appropriate_unit(true),
            Byte::from_bytes((logical_blocks * PAGE_SIZE) as u128).get_appropriate_unit(true)
        );

        Ok(Ftl {
            flash,
            tables: Tables::new(logical_blocks, page_count, pages_per_block),
            parked: BTreeMap::new(),
            stats: Stats::default(),
        })
    }

    /// Creates a layer that keeps `op` percent of the raw pages as spare
    /// area and exposes the rest.
    pub fn new_with_op(flash: &'f mut F, op: f64) -> Result<Self> {
        if !(0.0..100.0).contains(&op) {
            return Err(FtlError::InvalidGeometry(format!("over-provisioning of {op}%")));
        }
        let page_count = flash.page_count();
        let op_pages = (page_count as f64 * (op / 100.)).trunc() as BaseType;

        trace!("op_pages: {}", op_pages);
        Self::new(flash, page_count - op_pages)
    }

    pub fn logical_blocks(&self) -> BaseType {
        self.tables.logical_blocks()
    }

    pub fn get_max_lba(&self) -> Lba {
        self.tables.logical_blocks() - 1
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn lookup(&self, lba: Lba) -> Option<PageId> {
        self.tables.lookup(lba)
    }

    pub fn page_state(&self, page: PageId) -> Option<PageState> {
        self.tables.state(page)
    }

    pub fn erase_counts(&self) -> Vec<Counter> {
        self.tables.blocks().iter().map(|b| b.erase_counter()).collect()
    }

    /// Difference between the most and the least erased block.
    pub fn wear_spread(&self) -> Counter {
        let counts = self.tables.blocks().iter().map(|b| b.erase_counter());
        let max = counts.clone().max().unwrap_or(0);
        let min = counts.min().unwrap_or(0);
        max - min
    }

    /// Number of logical blocks currently held in memory only.
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    fn check_range(&self, lba: Lba) -> Result<()> {
        if lba >= self.tables.logical_blocks() {
            warn!("invalid logical block number {}", lba);
            return Err(FtlError::OutOfRange {
                lba,
                count: self.tables.logical_blocks(),
            });
        }
        Ok(())
    }

    /// Reads logical block `lba` into `out`. A block never written reads as
    /// erased bytes.
    pub fn read(&mut self, lba: Lba, out: &mut PageBuf) -> Result<()> {
        self.check_range(lba)?;

        if let Some(data) = self.parked.get(&lba) {
            *out = **data;
        } else if let Some(page) = self.tables.lookup(lba) {
            match self.tables.state(page) {
                Some(PageState::Valid(owner)) if owner == lba => {}
                found => return Err(FtlError::Consistency { lba, page, found }),
            }
            self.flash
                .read(page, out)
                .map_err(|e| FtlError::medium(MediumOp::Read, page, e))?;
        } else {
            out.fill(ERASED_BYTE);
        }

        self.stats.reads += 1;
        Ok(())
    }

    /// Writes `data` to logical block `lba`.
    ///
    /// The previous copy stays mapped until the new page is programmed, so
    /// a failed write leaves the old contents readable.
    pub fn write(&mut self, lba: Lba, data: &PageBuf) -> Result<()> {
        self.check_range(lba)?;

        let page = match self.tables.allocate(None) {
            Some(page) => page,
            None => self.reclaim()?.ok_or(FtlError::CapacityExhausted)?,
        };

        if let Err(e) = self.flash.write(page, data) {
            warn!("write: page {} failed for logical block {}: {}", page, lba, e);
            self.tables.burn(page);
            return Err(FtlError::medium(MediumOp::Write, page, e));
        }
        self.tables.rebind(lba, page);
        self.parked.remove(&lba);
        self.stats.writes += 1;
        trace!("write: logical block {} -> page {}", lba, page);

        if !self.parked.is_empty() {
            self.drain_parked();
        }
        Ok(())
    }

    /// Tears the layer down and returns its final counters.
    pub fn report(self) -> Stats {
        info!("disk reads: {}", self.stats.reads);
        info!("disk writes: {}", self.stats.writes);
        self.stats
    }
}
