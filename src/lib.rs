//! squadfeat: Team Statistics Curation Library
//!
//! Turns per-metric team statistics tables (defensive, passing, possession,
//! miscellaneous, ...) from several leagues and seasons into one feature
//! matrix, using season/league key normalisation, staged feature selection,
//! and a collision-safe multi-table merge.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
