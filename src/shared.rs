use parking_lot::Mutex;

use crate::config::*;
use crate::error::Result;
use crate::flash::Flash;
use crate::ftl::{Ftl, Stats};

/// A layer shared between threads.
///
/// Every operation, including any cleaning a write triggers, runs to
/// completion under one lock, so no caller observes tables mid-update.
pub struct SharedFtl<'f, F: Flash + ?Sized> {
    inner: Mutex<Ftl<'f, F>>,
}

impl<'f, F: Flash + ?Sized> SharedFtl<'f, F> {
    pub fn new(ftl: Ftl<'f, F>) -> Self {
        SharedFtl {
            inner: Mutex::new(ftl),
        }
    }

    pub fn read(&self, lba: Lba, out: &mut PageBuf) -> Result<()> {
        self.inner.lock().read(lba, out)
    }

    pub fn write(&self, lba: Lba, data: &PageBuf) -> Result<()> {
        self.inner.lock().write(lba, data)
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().stats()
    }

    /// Runs `f` with exclusive access to the layer.
    pub fn with<R>(&self, f: impl FnOnce(&mut Ftl<'f, F>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn report(self) -> Stats {
        self.inner.into_inner().report()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flash::RamFlash;

    fn stamp(lba: Lba, round: usize) -> PageBuf {
        let mut buf = [0u8; PAGE_SIZE];
        buf[..8].copy_from_slice(&(lba as u64).to_le_bytes());
        buf[8..16].copy_from_slice(&(round as u64).to_le_bytes());
        buf
    }

    #[test]
    fn threads_share_one_layer() {
        let mut flash = RamFlash::new(8, 8);
        let shared = SharedFtl::new(Ftl::new(&mut flash, 32).unwrap());

        std::thread::scope(|s| {
            for t in 0..4 {
                let shared = &shared;
                s.spawn(move || {
                    for round in 0..50 {
                        for lba in t * 8..t * 8 + 8 {
                            shared.write(lba, &stamp(lba, round)).unwrap();
                        }
                    }
                });
            }
        });

        let mut out = [0u8; PAGE_SIZE];
        for lba in 0..32 {
            shared.read(lba, &mut out).unwrap();
            assert_eq!(out, stamp(lba, 49));
        }
        shared.with(|ftl| ftl.tables().check_invariants()).unwrap();

        let stats = shared.report();
        assert_eq!(stats.writes, 32 * 50);
        assert_eq!(stats.reads, 32);
        assert!(stats.cleans > 0);
    }
}
