//! SQL MCP Server Library
//!
//! An MCP (Model Context Protocol) tool server over stdio that lets an AI
//! assistant query one SQL database (SQLite, PostgreSQL, MySQL) and export
//! tables to CSV files.

pub mod config;
pub mod db;
pub mod encoder;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, DispatchError};
pub use mcp::{Dispatcher, SqlToolService};
