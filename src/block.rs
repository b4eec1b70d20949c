use crate::config::*;

/// Bookkeeping for one erase block.
///
/// Pages leave the Free state strictly in index order, so the free pages of a
/// block are always the suffix starting at `cursor`.
#[derive(Clone, Debug)]
pub struct Block {
    block_id: BlockId,
    pages: Counter,
    valid_counter: Counter,
    invalid_counter: Counter,
    cursor: Counter, // points to the next free page
    erase_counter: Counter,
}

impl Block {
    pub fn new(block_id: BlockId, pages: Counter) -> Self {
        Block {
            block_id,
            pages,
            valid_counter: 0,
            invalid_counter: 0,
            cursor: 0,
            erase_counter: 0,
        }
    }

    pub fn id(&self) -> BlockId {
        self.block_id
    }

    pub fn valid_counter(&self) -> Counter {
        self.valid_counter
    }

    pub fn invalid_counter(&self) -> Counter {
        self.invalid_counter
    }

    pub fn free_counter(&self) -> Counter {
        self.pages - self.cursor
    }

    pub fn erase_counter(&self) -> Counter {
        self.erase_counter
    }

    pub fn cursor(&self) -> Counter {
        self.cursor
    }

    pub fn full(&self) -> bool {
        self.cursor == self.pages
    }

    /// Next free page consumed, now holding live data.
    pub(crate) fn program_one_page(&mut self) {
        debug_assert!(!self.full(), "program past the end of block {}", self.block_id);

        self.cursor += 1;
        self.valid_counter += 1;
    }

    /// Next free page consumed by a program that did not complete.
    pub(crate) fn burn_one_page(&mut self) {
        debug_assert!(!self.full(), "burn past the end of block {}", self.block_id);

        self.cursor += 1;
        self.invalid_counter += 1;
    }

    /// A live page of this block was superseded.
    pub(crate) fn invalidate_one_page(&mut self) {
        debug_assert!(self.valid_counter > 0, "no valid page left in block {}", self.block_id);

        self.valid_counter -= 1;
        self.invalid_counter += 1;
    }

    pub(crate) fn erase(&mut self) {
        self.cursor = 0;
        self.valid_counter = 0;
        self.invalid_counter = 0;
        self.erase_counter += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters_always_cover_the_block() {
        let mut block = Block::new(3, 4);
        block.program_one_page();
        block.program_one_page();
        block.burn_one_page();
        block.invalidate_one_page();

        assert_eq!(block.valid_counter(), 1);
        assert_eq!(block.invalid_counter(), 2);
        assert_eq!(block.free_counter(), 1);
        assert_eq!(block.cursor(), 3);

        block.program_one_page();
        assert!(block.full());
    }

    #[test]
    fn erase_resets_pages_and_counts_wear() {
        let mut block = Block::new(0, 2);
        block.program_one_page();
        block.program_one_page();
        block.erase();
        block.erase();

        assert_eq!(block.free_counter(), 2);
        assert_eq!(block.valid_counter() + block.invalid_counter(), 0);
        assert_eq!(block.erase_counter(), 2);
    }
}
