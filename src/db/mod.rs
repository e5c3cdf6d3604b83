//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Per-call connections with exactly-once release
//! - Statement execution and table scans
//! - Type mappings
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod gateway;
pub mod types;

pub use gateway::{
    ConnectionStats, DatabaseGateway, DbConnection, LeasedConnection, StatsSnapshot,
};
