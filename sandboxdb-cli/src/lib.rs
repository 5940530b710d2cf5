//! # sandboxdb CLI Library
//!
//! Configuration loading and command dispatch for the `sandboxdb` binary.
//!
//! ## Modules
//!
//! - `config`: Environment-driven configuration
//! - `cli`: Argument parsing and command runners

pub mod cli;
pub mod config;
