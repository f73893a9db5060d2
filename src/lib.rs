//! netdesc - Show the header index of captured packets.
//!
//! This library reads PCAP/PCAPNG files, runs a reference dissector that
//! records every header of a frame in a descriptor, and binds each frame
//! into a [`netdesc_core::Packet`] for lookup.
//!
//! # Example
//!
//! ```no_run
//! use netdesc::capture::CaptureReader;
//! use netdesc::dissect::Dissector;
//! use netdesc::inspect::Inspector;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut inspector = Inspector::new(Dissector::default(), None)?;
//!     for frame in CaptureReader::open("capture.pcap")? {
//!         if let Some(row) = inspector.inspect(&frame?)? {
//!             println!("{} headers in frame {}", row.headers.len(), row.frame);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod cli;
pub mod dissect;
pub mod error;
pub mod inspect;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
