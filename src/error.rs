use thiserror::Error;

use crate::config::{BaseType, Lba, PageId};
use crate::flash::FlashError;
use crate::map::PageState;

/// Result type returned by every fallible layer operation.
pub type Result<T> = std::result::Result<T, FtlError>;

/// Which medium primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumOp {
    Read,
    Write,
    Erase,
}

impl std::fmt::Display for MediumOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Erase => write!(f, "erase"),
        }
    }
}

/// Errors surfaced by the translation layer.
///
/// None of them is fatal: after any error the layer stays usable and the
/// data it reported as written stays readable.
#[derive(Debug, Error)]
pub enum FtlError {
    /// Logical block id outside `0..count`.
    #[error("logical block {lba} out of range (0..{count})")]
    OutOfRange { lba: Lba, count: BaseType },

    /// Every physical page holds live data; nothing can be reclaimed.
    #[error("no free page left after reclamation")]
    CapacityExhausted,

    /// The forward mapping of `lba` points at a page whose recorded state
    /// does not claim it, or at no page of the medium at all.
    #[error("logical block {lba} maps to page {page} which is {found:?}")]
    Consistency {
        lba: Lba,
        page: PageId,
        found: Option<PageState>,
    },

    /// A physical read, write or erase failed.
    #[error("flash {op} failed at {index}: {source}")]
    Medium {
        op: MediumOp,
        index: BaseType,
        #[source]
        source: FlashError,
    },

    /// The medium geometry or requested logical size cannot be served.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl FtlError {
    pub(crate) fn medium(op: MediumOp, index: BaseType, source: FlashError) -> Self {
        FtlError::Medium { op, index, source }
    }
}
