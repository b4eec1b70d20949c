use log::trace;

use crate::config::*;
use crate::map::Tables;

impl Tables {
    /// Picks a free page for the next program, steering writes toward the
    /// least erased block that still has room.
    ///
    /// Blocks are ranked by erase count, then block id; within the chosen
    /// block the lowest free page is returned. `avoid` excludes one block
    /// from the search.
    pub fn allocate(&self, avoid: Option<BlockId>) -> Option<PageId> {
        let block = self
            .blocks()
            .iter()
            .filter(|b| Some(b.id()) != avoid && !b.full())
            .min_by_key(|b| (b.erase_counter(), b.id()))?;

        let page = block.id() * self.pages_per_block() + block.cursor();
        trace!(
            "allocate: page {} in block {} (erases {}, avoid {:?})",
            page,
            block.id(),
            block.erase_counter(),
            avoid
        );
        Some(page)
    }

    /// Block with the fewest erases, lowest id on ties.
    pub fn least_worn_block(&self) -> BlockId {
        self.blocks()
            .iter()
            .min_by_key(|b| (b.erase_counter(), b.id()))
            .map_or(0, |b| b.id())
    }

    pub fn free_pages(&self) -> Counter {
        self.blocks().iter().map(|b| b.free_counter()).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fill_block(tables: &mut Tables, block: BlockId, first_lba: Lba) {
        for (i, page) in tables.pages_of(block).enumerate() {
            tables.rebind(first_lba + i, page);
        }
    }

    #[test]
    fn fills_lowest_block_first() {
        let mut tables = Tables::new(16, 16, 4);
        assert_eq!(tables.allocate(None), Some(0));

        tables.rebind(0, 0);
        assert_eq!(tables.allocate(None), Some(1));

        fill_block(&mut tables, 1, 4);
        tables.rebind(1, 1);
        assert_eq!(tables.allocate(None), Some(2));
    }

    #[test]
    fn prefers_least_erased_block() {
        let mut tables = Tables::new(16, 16, 4);
        tables.erase_block(0);
        tables.erase_block(1);
        tables.erase_block(1);

        assert_eq!(tables.allocate(None), Some(8));
        tables.erase_block(2);
        tables.erase_block(3);
        assert_eq!(tables.allocate(None), Some(0));
    }

    #[test]
    fn honours_avoided_block() {
        let tables = Tables::new(16, 16, 4);
        assert_eq!(tables.allocate(Some(0)), Some(4));
    }

    #[test]
    fn none_when_every_page_used() {
        let mut tables = Tables::new(16, 8, 4);
        fill_block(&mut tables, 0, 0);
        assert_eq!(tables.allocate(Some(1)), None);

        fill_block(&mut tables, 1, 4);
        assert_eq!(tables.allocate(None), None);
        assert_eq!(tables.free_pages(), 0);
    }

    #[test]
    fn least_worn_breaks_ties_by_id() {
        let mut tables = Tables::new(16, 16, 4);
        assert_eq!(tables.least_worn_block(), 0);
        tables.erase_block(0);
        tables.erase_block(2);
        assert_eq!(tables.least_worn_block(), 1);
    }
}
