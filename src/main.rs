//! netdesc CLI entry point.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use netdesc::capture::CaptureReader;
use netdesc::cli::{Args, OutputFormatter};
use netdesc::dissect::Dissector;
use netdesc::inspect::Inspector;
use netdesc_core::header::KNOWN;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    if args.list_headers {
        return list_headers();
    }

    let capture_file = args
        .file
        .context("Capture file required. Use --help for usage.")?;

    let reader = CaptureReader::open(&capture_file)
        .with_context(|| format!("Failed to open capture file: {}", capture_file.display()))?;

    let dissector = Dissector::new(args.descriptor.into());
    let mut inspector = Inspector::new(dissector, args.header)?;

    // JSON rows go out per frame; table rows are held until the end.
    let formatter = OutputFormatter::new(args.format);
    let mut output = formatter.stream(io::stdout().lock());
    for frame in reader.take(args.limit.unwrap_or(usize::MAX)) {
        let frame = frame.context("Failed to read frame")?;
        let row = inspector
            .inspect(&frame)
            .with_context(|| format!("Failed to inspect frame {}", frame.frame_number))?;
        if let Some(row) = row {
            output.push(row)?;
        }
    }
    output.finish()?;
    tracing::info!(
        frames = inspector.frames(),
        shown = inspector.shown(),
        "capture inspected"
    );
    Ok(())
}

fn list_headers() -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Known headers:")?;
    writeln!(stdout, "{:-<50}", "")?;
    for id in KNOWN {
        writeln!(
            stdout,
            "  {:<24} pack {:>2}  protocol {:>2}",
            id.name(),
            id.pack(),
            id.protocol()
        )?;
    }
    Ok(())
}
