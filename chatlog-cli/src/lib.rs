//! # chatlog-cli
//!
//! Command-line front end: argument parsing, env config, running the archive bot, file exports.

pub mod cli;
pub mod config;
pub mod export;

pub use cli::{Cli, Commands, ExportFormat};
pub use config::ArchiverConfig;
