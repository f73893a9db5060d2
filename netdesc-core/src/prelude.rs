//! Convenient re-exports for common usage.
//!
//! ```rust
//! use netdesc_core::prelude::*;
//!
//! let packet = Packet::new();
//! assert!(!packet.has_header(ids::TCP, 0));
//! ```

// Header types
pub use crate::header::{ids, GenericHeader, HeaderId, HeaderRecord, HeaderView};

// Descriptor types
pub use crate::descriptor::{
    Descriptor, DescriptorType, Located, PacketDescriptor, PcapBuilder, Type2Builder,
};

// Cache types
pub use crate::cache::{HeaderCache, HeaderFactory};

// Packet facade
pub use crate::config::{PacketConfig, TimestampUnit};
pub use crate::packet::Packet;

// Error types
pub use crate::error::{Error, Result};
