use std::ops::Range;

use num_integer::Integer;

use crate::block::Block;
use crate::config::*;

/// Forward mapping entry of one logical block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum L2PValue {
    Unmapped,
    Mapped(PageId),
}

/// Status of one physical page. A valid page carries the logical block it
/// holds, so a reverse pointer can only exist on a valid page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    Free,
    Valid(Lba),
    Invalid,
}

/// Translation, page-state and block tables of one layer, indexed by plain
/// integer ids.
pub struct Tables {
    l2p: Vec<L2PValue>,
    pages: Vec<PageState>,
    blocks: Vec<Block>,
    pages_per_block: Counter,
}

impl Tables {
    pub fn new(logical_blocks: BaseType, page_count: BaseType, pages_per_block: BaseType) -> Self {
        let block_count = page_count / pages_per_block;
        Tables {
            l2p: vec![L2PValue::Unmapped; logical_blocks],
            pages: vec![PageState::Free; page_count],
            blocks: (0..block_count).map(|id| Block::new(id, pages_per_block)).collect(),
            pages_per_block,
        }
    }

    pub fn logical_blocks(&self) -> BaseType {
        self.l2p.len()
    }

    pub fn page_count(&self) -> BaseType {
        self.pages.len()
    }

    pub fn pages_per_block(&self) -> Counter {
        self.pages_per_block
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, block: BlockId) -> &Block {
        &self.blocks[block]
    }

    /// Splits a page id into its block and the page index inside that block.
    pub fn locate(&self, page: PageId) -> (BlockId, Counter) {
        page.div_rem(&self.pages_per_block)
    }

    pub fn pages_of(&self, block: BlockId) -> Range<PageId> {
        let first = block * self.pages_per_block;
        first..first + self.pages_per_block
    }

    pub fn lookup(&self, lba: Lba) -> Option<PageId> {
        match self.l2p.get(lba)? {
            L2PValue::Mapped(page) => Some(*page),
            L2PValue::Unmapped => None,
        }
    }

    /// State of `page`, `None` past the end of the medium.
    pub fn state(&self, page: PageId) -> Option<PageState> {
        self.pages.get(page).copied()
    }

    /// Points `lba` at `new_page`, which must be the next free page of its
    /// block and already hold the data. The previous page, if any, becomes
    /// invalid in the same step.
    pub(crate) fn rebind(&mut self, lba: Lba, new_page: PageId) {
        if let L2PValue::Mapped(old) = self.l2p[lba] {
            debug_assert_eq!(self.pages[old], PageState::Valid(lba));
            self.pages[old] = PageState::Invalid;
            let (block, _) = self.locate(old);
            self.blocks[block].invalidate_one_page();
        }

        let (block, offset) = self.locate(new_page);
        debug_assert_eq!(self.pages[new_page], PageState::Free);
        debug_assert_eq!(offset, self.blocks[block].cursor());
        self.pages[new_page] = PageState::Valid(lba);
        self.blocks[block].program_one_page();
        self.l2p[lba] = L2PValue::Mapped(new_page);
    }

    /// Retires a free page whose program failed; it stays invalid until its
    /// block is erased.
    pub(crate) fn burn(&mut self, page: PageId) {
        let (block, offset) = self.locate(page);
        debug_assert_eq!(self.pages[page], PageState::Free);
        debug_assert_eq!(offset, self.blocks[block].cursor());
        self.pages[page] = PageState::Invalid;
        self.blocks[block].burn_one_page();
    }

    /// Records an erase of `block`: every page becomes free and logical
    /// blocks that lived there are left unmapped until re-admitted.
    pub(crate) fn erase_block(&mut self, block: BlockId) {
        for page in self.pages_of(block) {
            if let PageState::Valid(lba) = self.pages[page] {
                self.l2p[lba] = L2PValue::Unmapped;
            }
            self.pages[page] = PageState::Free;
        }
        self.blocks[block].erase();
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, page: PageId, state: PageState) {
        self.pages[page] = state;
    }

    /// Walks every table and reports the first broken invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        for block in &self.blocks {
            let (mut free, mut valid, mut invalid) = (0, 0, 0);
            for (offset, page) in self.pages_of(block.id()).enumerate() {
                match self.pages[page] {
                    PageState::Free => {
                        if offset < block.cursor() {
                            return Err(format!("free page {page} behind cursor of block {}", block.id()));
                        }
                        free += 1;
                    }
                    state => {
                        if offset >= block.cursor() {
                            return Err(format!("{state:?} page {page} past cursor of block {}", block.id()));
                        }
                        if let PageState::Valid(_) = state {
                            valid += 1;
                        } else {
                            invalid += 1;
                        }
                    }
                }
            }
            if free + valid + invalid != self.pages_per_block {
                return Err(format!("block {} accounts for {} pages", block.id(), free + valid + invalid));
            }
            if (free, valid, invalid) != (block.free_counter(), block.valid_counter(), block.invalid_counter()) {
                return Err(format!(
                    "block {} counters {}/{}/{} disagree with pages {free}/{valid}/{invalid}",
                    block.id(),
                    block.free_counter(),
                    block.valid_counter(),
                    block.invalid_counter()
                ));
            }
        }

        for (page, state) in self.pages.iter().enumerate() {
            if let PageState::Valid(lba) = *state {
                if self.l2p.get(lba) != Some(&L2PValue::Mapped(page)) {
                    return Err(format!("valid page {page} claims logical block {lba} which maps elsewhere"));
                }
            }
        }

        for (lba, entry) in self.l2p.iter().enumerate() {
            if let L2PValue::Mapped(page) = *entry {
                if self.pages.get(page) != Some(&PageState::Valid(lba)) {
                    return Err(format!("logical block {lba} maps to page {page} which does not claim it"));
                }
            }
        }

        Ok(())
    }
}
