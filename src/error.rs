use thiserror::Error;

use crate::config::{BlockId, PageId};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FtlError {
    #[error("LBA {lba} is out of range (max LBA {max_lba})")]
    LbaOutOfRange { lba: PageId, max_lba: PageId },

    #[error("Out of space: no free blocks available")]
    NoFreeBlock,

    #[error("No reclaimable block among {full_blocks} full blocks")]
    NoVictim { full_blocks: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("Over-provisioning of {op_blocks} blocks cannot cover {required} reserved blocks")]
    InsufficientOverProvisioning { op_blocks: BlockId, required: BlockId },
}

pub type Result<T> = std::result::Result<T, FtlError>;
