//! # netdesc-core
//!
//! Packet descriptor index: locate and bind protocol headers in a captured
//! frame without re-parsing it.
//!
//! A dissector walks each frame once and records every header it identified
//! (id, offset, length) in a compact descriptor. Consumers then ask the
//! [`Packet`] facade for any header by id and tunnel depth; the lookup is a
//! short scan of at most 16 records, and the header view is bound zero-copy
//! onto the captured bytes.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        netdesc-core                                 |
//! +---------------------------------------------------------------------+
//! |  header/     - HeaderId, HeaderRecord codec, HeaderView             |
//! |  descriptor/ - Pcap/Type2/Ipf layouts, lookup, chain, builders      |
//! |  cache/      - Dense header view cache                              |
//! |  packet      - Packet facade (peek/get/has header)                  |
//! |  config      - PacketConfig                                         |
//! |  error       - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Concurrency
//!
//! Descriptors, packets and caches are confined to one processing context
//! and rebound across frames. To hand a frame to another stage, clone the
//! [`Packet`]: the clone owns copies of the bytes and the descriptor chain.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod packet;
pub mod prelude;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at crate root for convenience
pub use cache::{CacheStats, GenericHeaderFactory, HeaderCache, HeaderFactory};
pub use config::{PacketConfig, TimestampUnit};
pub use descriptor::{
    Descriptor, DescriptorNode, DescriptorType, IpfBuilder, IpfDescriptor, Located,
    OptionsRegion, PacketDescriptor, PcapBuilder, PcapDescriptor, Type2Builder, Type2Descriptor,
};
pub use error::{BindFault, DescriptorError, Error, Result};
pub use header::{ids, GenericHeader, HeaderId, HeaderRecord, HeaderView};
pub use packet::Packet;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
