//! Garbage-collection victim selection for a page-mapped flash translation layer,
//! plus a small FTL simulator that drives it.

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod ftl;
pub mod victim;

pub use error::FtlError;
pub use ftl::{Ftl, FtlStats};
pub use victim::{
    block_cost, select_victim, select_victim_index, wear_leveling_factor, Candidate, Cost,
    SelectionParams,
};
