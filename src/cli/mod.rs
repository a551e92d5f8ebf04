//! CLI command implementations

pub mod download;
pub mod error;

pub use download::{Cli, Commands, DailyArgs, MonthlyArgs};
pub use error::CliError;
