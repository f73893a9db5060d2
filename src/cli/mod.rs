//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Output formatting (table, JSON)

mod args;
mod output;

pub use args::{Args, DescriptorKind};
pub use output::{OutputFormat, OutputFormatter, RowWriter};
