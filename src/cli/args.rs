//! Command-line argument definitions.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use netdesc_core::{DescriptorType, HeaderId};

use super::OutputFormat;

/// Descriptor layouts the dissector can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescriptorKind {
    /// Header region plus up to 16 header records (default)
    Type2,
    /// Lengths, timestamp and link type only
    Pcap,
}

impl From<DescriptorKind> for DescriptorType {
    fn from(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Type2 => DescriptorType::Type2,
            DescriptorKind::Pcap => DescriptorType::Pcap,
        }
    }
}

/// Show the header index of every frame in a capture.
#[derive(Parser, Debug)]
#[command(name = "netdesc")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PCAP or PCAPNG file to inspect
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Descriptor layout to build for each frame
    #[arg(long = "descriptor", value_enum, default_value = "type2")]
    pub descriptor: DescriptorKind,

    /// Stop after this many frames
    #[arg(short = 'n', long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Only show frames carrying this header (e.g. tcp, ipv6.fragment)
    #[arg(long = "header", value_name = "NAME", value_parser = parse_header)]
    pub header: Option<HeaderId>,

    /// Output format for stdout
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// List known header names
    #[arg(long = "list-headers")]
    pub list_headers: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_header(name: &str) -> Result<HeaderId, String> {
    HeaderId::from_name(name).ok_or_else(|| format!("unknown header '{name}' (see --list-headers)"))
}
