//! Cadence CLI Library
//!
//! Interactive host for the playback coordinator: configuration loading,
//! line-command parsing, and the driver that applies commands to a running
//! coordinator.
//!
//! This library exposes the components for testing purposes.

pub mod commands;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;

pub use commands::Command;
pub use config::{AppConfig, LibrarySettings};
pub use driver::{Driver, Outcome};
pub use error::{CliError, Result};
