//! hgroup - pull-based query execution over hierarchical table groups
//!
//! Tables of a group are stored interleaved in hkey order, so a parent row
//! is followed by its children. The executor composes scans, ordered set
//! operators, hkey lookups, nested loops, sorts and distinct over that
//! layout through a uniform open/next/jump/close cursor protocol.

pub mod cli;
pub mod config;
pub mod executor;
pub mod observability;
pub mod row;
pub mod schema;
pub mod storage;
