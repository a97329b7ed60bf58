//! Subcommand implementations. Each module exposes an `Args` struct and
//! an async `run` entry point.

pub mod cache_clear;
pub mod cache_info;
pub mod ingest;
pub mod query;
pub mod rebuild;
