//! Reclamation: victim selection, block cleaning and the wear-leveling
//! fallback used when a write finds no free page.

use std::cmp::Reverse;

use log::{debug, trace, warn};

use crate::config::*;
use crate::error::{FtlError, MediumOp, Result};
use crate::flash::Flash;
use crate::ftl::Ftl;
use crate::map::{PageState, Tables};

impl Tables {
    /// Block with the most invalid pages, lowest id on ties. `None` when no
    /// block has anything to reclaim.
    pub fn select_victim(&self) -> Option<BlockId> {
        self.blocks()
            .iter()
            .filter(|b| b.invalid_counter() > 0)
            .max_by_key(|b| (b.invalid_counter(), Reverse(b.id())))
            .map(|b| b.id())
    }
}

impl<'f, F: Flash + ?Sized> Ftl<'f, F> {
    /// Frees at least one page and returns it, or `None` when every page of
    /// the medium holds live data. Victims are cleaned again while pages
    /// burnt during migration leave something to reclaim.
    pub(crate) fn reclaim(&mut self) -> Result<Option<PageId>> {
        let Some(victim) = self.tables.select_victim() else {
            debug!("reclaim: no invalid page anywhere, medium is full of live data");
            return Ok(None);
        };

        let coldest = self.tables.least_worn_block();
        let victim_erases = self.tables.block(victim).erase_counter();
        let coldest_erases = self.tables.block(coldest).erase_counter();
        if victim_erases + 1 > coldest_erases + WEAR_LEVEL_SPREAD {
            debug!(
                "reclaim: victim {} has {} erases, leveling with block {} ({} erases)",
                victim, victim_erases, coldest, coldest_erases
            );
            // a block of nothing but live data needs somewhere to move to
            if self.tables.block(coldest).valid_counter() == self.tables.pages_per_block() {
                self.clean(victim)?;
            }
            self.clean(coldest)?;
            self.stats.wear_level_cleans += 1;
        } else {
            debug!(
                "reclaim: cleaning victim {} ({} invalid pages)",
                victim,
                self.tables.block(victim).invalid_counter()
            );
            self.clean(victim)?;
        }
        if let Some(page) = self.tables.allocate(None) {
            return Ok(Some(page));
        }

        // pages burnt by a failed migration program are reclaimable again
        for _ in 0..self.tables.blocks().len() {
            let Some(victim) = self.tables.select_victim() else {
                debug!("reclaim: every page holds live data after cleaning");
                return Ok(None);
            };
            debug!("reclaim: no page yet, cleaning victim {} again", victim);
            self.clean(victim)?;
            if let Some(page) = self.tables.allocate(None) {
                return Ok(Some(page));
            }
        }

        let coldest = self.tables.least_worn_block();
        warn!("reclaim: no page after cleaning, forcing clean of block {}", coldest);
        self.clean(coldest)?;
        self.stats.wear_level_cleans += 1;
        Ok(self.tables.allocate(None))
    }

    /// Erases `block` without losing any live page in it.
    ///
    /// Live pages are copied to memory before the erase and programmed onto
    /// fresh pages afterwards, outside `block` when another block has room.
    /// A read or erase failure aborts before any table changes. If a copy
    /// cannot be programmed back it is parked in memory and the first such
    /// error is returned.
    pub(crate) fn clean(&mut self, block: BlockId) -> Result<()> {
        let mut snapshot = Vec::new();
        for page in self.tables.pages_of(block) {
            if let Some(PageState::Valid(lba)) = self.tables.state(page) {
                let mut data = Box::new([ERASED_BYTE; PAGE_SIZE]);
                self.flash
                    .read(page, &mut *data)
                    .map_err(|e| FtlError::medium(MediumOp::Read, page, e))?;
                snapshot.push((lba, data));
            }
        }

        self.flash
            .erase(block)
            .map_err(|e| FtlError::medium(MediumOp::Erase, block, e))?;
        self.tables.erase_block(block);
        self.stats.cleans += 1;
        debug!(
            "clean: erased block {} (erases {}), moving {} live pages",
            block,
            self.tables.block(block).erase_counter(),
            snapshot.len()
        );

        let mut first_error = None;
        for (lba, data) in snapshot {
            match self.program(lba, &data, Some(block)) {
                Ok(page) => {
                    trace!("clean: logical block {} moved to page {}", lba, page);
                    self.stats.migrated_pages += 1;
                }
                Err(e) => {
                    warn!("clean: logical block {} parked in memory: {}", lba, e);
                    self.parked.insert(lba, data);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Programs `data` onto a free page and maps `lba` to it, without ever
    /// reclaiming. `avoid` is only a preference. A page whose program fails is
    /// burnt and the next attempt avoids its block.
    pub(crate) fn program(
        &mut self,
        lba: Lba,
        data: &PageBuf,
        mut avoid: Option<BlockId>,
    ) -> Result<PageId> {
        let mut last_error = FtlError::CapacityExhausted;

        for _ in 0..PROGRAM_RETRIES {
            let Some(page) = self
                .tables
                .allocate(avoid)
                .or_else(|| self.tables.allocate(None))
            else {
                break;
            };

            match self.flash.write(page, data) {
                Ok(()) => {
                    self.tables.rebind(lba, page);
                    return Ok(page);
                }
                Err(e) => {
                    warn!("program: page {} failed for logical block {}: {}", page, lba, e);
                    self.tables.burn(page);
                    avoid = Some(self.tables.locate(page).0);
                    last_error = FtlError::medium(MediumOp::Write, page, e);
                }
            }
        }

        Err(last_error)
    }

    /// Moves parked pages back onto flash while free pages last.
    pub(crate) fn drain_parked(&mut self) {
        while let Some(lba) = self.parked.keys().next().copied() {
            if self.tables.free_pages() == 0 {
                break;
            }
            let Some(data) = self.parked.remove(&lba) else {
                break;
            };
            match self.program(lba, &data, None) {
                Ok(page) => debug!("parked logical block {} restored to page {}", lba, page),
                Err(e) => {
                    warn!("parked logical block {} stays in memory: {}", lba, e);
                    self.parked.insert(lba, data);
                    break;
                }
            }
        }
    }
}
