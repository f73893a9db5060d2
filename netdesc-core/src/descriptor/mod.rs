//! Packet descriptors.
//!
//! This module provides:
//! - [`PacketDescriptor`] trait implemented by the two layouts that can head a packet
//! - [`PcapDescriptor`] - fixed 24-byte layout, no header records
//! - [`Type2Descriptor`] - 28-byte header region followed by up to 16 records
//! - [`IpfDescriptor`] - auxiliary IP fragmentation metadata
//! - [`Descriptor`] / [`DescriptorNode`] - the closed set of descriptor kinds and
//!   the singly-linked chain bound to one frame
//! - builders that encode descriptor bytes for dissectors
//!
//! Every descriptor is allocated once and rebound across many frames.
//! Binding validates the layout; lookups afterwards are total and never fail.

mod builder;
mod chain;
mod ipf;
mod lookup;
mod pcap;
mod type2;

pub use builder::{IpfBuilder, PcapBuilder, Type2Builder};
pub use chain::{ChainIter, DescriptorNode};
pub use ipf::{ipf_flags, IpfDescriptor};
pub use lookup::{find_option, options_run, scan};
pub use pcap::PcapDescriptor;
pub use type2::{type2_flags, HashInfo, HashType, L2FrameType, Type2Descriptor};

use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use crate::error::DescriptorError;
use crate::header::{HeaderId, HeaderRecord};

/// Descriptor kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DescriptorType {
    /// Fixed capture-header layout.
    Pcap = 0,
    /// Record-array layout.
    Type2 = 1,
    /// IP fragmentation metadata.
    Ipf = 2,
}

impl DescriptorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptorType::Pcap => "pcap",
            DescriptorType::Type2 => "type2",
            DescriptorType::Ipf => "ipf",
        }
    }

    /// Whether this kind can head a packet's descriptor chain.
    pub fn is_packet(&self) -> bool {
        matches!(self, DescriptorType::Pcap | DescriptorType::Type2)
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a header was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Byte offset in the captured frame.
    pub offset: usize,
    /// Header length in bytes.
    pub length: usize,
    /// Index of the matching record; `None` for synthesized frame/payload ranges.
    pub record_index: Option<usize>,
    /// Descriptor that resolved the header.
    pub descriptor_type: DescriptorType,
}

impl Located {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Run of option records following a parent header's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionsRegion {
    /// Index of the first option record.
    pub first_record: usize,
    /// Number of option records in the run.
    pub count: usize,
    /// Byte offset of the first option.
    pub offset: usize,
    /// Bytes from the first option to the end of the last one.
    pub length: usize,
}

impl OptionsRegion {
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    #[inline]
    pub fn records(&self) -> Range<usize> {
        self.first_record..self.first_record + self.count
    }
}

/// A descriptor that can head a packet: it knows the frame lengths and
/// resolves header lookups.
pub trait PacketDescriptor {
    fn descriptor_type(&self) -> DescriptorType;

    fn is_bound(&self) -> bool;

    /// Encoded size of the bound descriptor.
    fn byte_size(&self) -> usize;

    fn capture_length(&self) -> usize;

    fn wire_length(&self) -> usize;

    /// Raw 8-byte capture timestamp.
    fn timestamp(&self) -> u64;

    /// Decoded records in discovery order.
    fn records(&self) -> &[HeaderRecord];

    /// Summary of the class bits present among the records.
    fn presence_bitmask(&self) -> u32;

    /// Resolve the `depth`-th occurrence of `id`.
    fn lookup_header(&self, id: HeaderId, depth: usize) -> Option<Located>;

    /// Resolve extension `ext` of the `depth`-th `id`. `hint` is the parent's
    /// record index from an earlier lookup and skips re-resolving the parent.
    fn lookup_extension(
        &self,
        id: HeaderId,
        ext: HeaderId,
        depth: usize,
        hint: Option<usize>,
    ) -> Option<Located>;

    #[inline]
    fn record_count(&self) -> usize {
        self.records().len()
    }

    /// Record by position. Panics when `index >= record_count()`.
    #[inline]
    fn record(&self, index: usize) -> HeaderRecord {
        self.records()[index]
    }

    /// Options run following record `index`.
    fn options_run(&self, index: usize) -> Option<OptionsRegion> {
        options_run(self.records(), index)
    }

    /// First byte after the last record, 0 without records.
    fn payload_offset(&self) -> usize {
        self.records().last().map(|r| r.end()).unwrap_or(0)
    }
}

/// Closed set of descriptor kinds a chain can hold.
#[derive(Debug)]
pub enum Descriptor {
    Pcap(PcapDescriptor),
    Type2(Type2Descriptor),
    Ipf(IpfDescriptor),
}

/// Delegate a method to whichever descriptor kind is held.
macro_rules! delegate_descriptor {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            Descriptor::Pcap(d) => d.$method($($arg),*),
            Descriptor::Type2(d) => d.$method($($arg),*),
            Descriptor::Ipf(d) => d.$method($($arg),*),
        }
    };
}

impl Descriptor {
    /// Fresh, unbound descriptor of the given kind.
    pub fn new(descriptor_type: DescriptorType) -> Self {
        match descriptor_type {
            DescriptorType::Pcap => Descriptor::Pcap(PcapDescriptor::new()),
            DescriptorType::Type2 => Descriptor::Type2(Type2Descriptor::new()),
            DescriptorType::Ipf => Descriptor::Ipf(IpfDescriptor::new()),
        }
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            Descriptor::Pcap(_) => DescriptorType::Pcap,
            Descriptor::Type2(_) => DescriptorType::Type2,
            Descriptor::Ipf(_) => DescriptorType::Ipf,
        }
    }

    /// Bind to encoded descriptor bytes, clearing anything derived from the
    /// previous binding.
    pub fn bind(&mut self, buf: Bytes) -> Result<(), DescriptorError> {
        delegate_descriptor!(self, bind, buf)
    }

    pub fn unbind(&mut self) {
        delegate_descriptor!(self, unbind)
    }

    pub fn is_bound(&self) -> bool {
        delegate_descriptor!(self, is_bound)
    }

    pub fn byte_size(&self) -> usize {
        delegate_descriptor!(self, byte_size)
    }

    /// Raw bytes of the current binding.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        delegate_descriptor!(self, as_bytes)
    }

    /// View as a packet descriptor, if this kind can head a packet.
    pub fn as_packet(&self) -> Option<&dyn PacketDescriptor> {
        match self {
            Descriptor::Pcap(d) => Some(d),
            Descriptor::Type2(d) => Some(d),
            Descriptor::Ipf(_) => None,
        }
    }

    pub fn as_type2(&self) -> Option<&Type2Descriptor> {
        match self {
            Descriptor::Type2(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_pcap(&self) -> Option<&PcapDescriptor> {
        match self {
            Descriptor::Pcap(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_ipf(&self) -> Option<&IpfDescriptor> {
        match self {
            Descriptor::Ipf(d) => Some(d),
            _ => None,
        }
    }
}

impl Clone for Descriptor {
    /// Deep copy: the clone owns its own copy of the descriptor bytes.
    fn clone(&self) -> Self {
        let mut copy = Descriptor::new(self.descriptor_type());
        if let Some(buf) = self.as_bytes() {
            // Bytes were validated when `self` was bound.
            let rebound = copy.bind(Bytes::copy_from_slice(buf));
            debug_assert!(rebound.is_ok(), "rebinding validated bytes failed: {rebound:?}");
        }
        copy
    }
}

impl From<PcapDescriptor> for Descriptor {
    fn from(d: PcapDescriptor) -> Self {
        Descriptor::Pcap(d)
    }
}

impl From<Type2Descriptor> for Descriptor {
    fn from(d: Type2Descriptor) -> Self {
        Descriptor::Type2(d)
    }
}

impl From<IpfDescriptor> for Descriptor {
    fn from(d: IpfDescriptor) -> Self {
        Descriptor::Ipf(d)
    }
}

#[inline]
pub(crate) fn read_u8(buf: &[u8], offset: usize) -> u8 {
    buf[offset]
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

pub(crate) fn require_len(
    descriptor: DescriptorType,
    buf: &[u8],
    needed: usize,
) -> Result<(), DescriptorError> {
    if buf.len() < needed {
        return Err(DescriptorError::BufferTooShort {
            descriptor,
            needed,
            have: buf.len(),
        });
    }
    Ok(())
}
