//! Command-line interface for Loradex snapshots.
//!
//! # Modules
//!
//! - [`cli`]: clap argument and subcommand definitions
//! - [`config`]: layered configuration (`LoradexConfig`)
//! - [`app`]: logging setup and command dispatch
//! - [`handlers`]: store and query command handlers
//! - [`config_handlers`]: `config path|show`

#![doc = include_str!("../README.md")]

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod handlers;

pub use app::LoradexCli;
pub use cli::{CliArgs, Command};
pub use config::LoradexConfig;
