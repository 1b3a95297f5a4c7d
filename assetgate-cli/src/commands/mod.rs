//! CLI command implementations.

pub mod asset;
pub mod config;
pub mod tile;
