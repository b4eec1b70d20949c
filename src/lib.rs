//! Page-mapped flash translation layer.
//!
//! Presents a fixed number of logical blocks on top of a flash medium that
//! programs pages once and erases whole blocks. Writes go to the least
//! erased block with room; when none is left the block with the most stale
//! pages is cleaned, its live pages moved, and erased.

mod alloc;
pub mod block;
pub mod config;
pub mod error;
pub mod flash;
pub mod ftl;
mod gc;
pub mod map;
pub mod shared;

pub use error::{FtlError, MediumOp, Result};
pub use flash::{Flash, FlashError, FlashStats, RamFlash};
pub use ftl::{Ftl, Stats};
pub use map::{L2PValue, PageState, Tables};
pub use shared::SharedFtl;
