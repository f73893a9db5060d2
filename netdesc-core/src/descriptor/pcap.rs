//! Fixed-layout capture descriptor.
//!
//! 24 bytes, little-endian: timestamp @0 (8), capture length @8 (2),
//! wire length @10 (2), link type @12 (2), reserved 14..24. It carries no
//! header records, so every lookup misses.

use bytes::Bytes;

use crate::error::DescriptorError;
use crate::header::{HeaderId, HeaderRecord};

use super::{read_u16, read_u64, require_len};
use super::{DescriptorType, Located, PacketDescriptor};

pub(crate) mod layout {
    pub const TIMESTAMP: usize = 0;
    pub const CAPTURE_LENGTH: usize = 8;
    pub const WIRE_LENGTH: usize = 10;
    pub const LINK_TYPE: usize = 12;
    pub const SIZE: usize = 24;
}

#[derive(Debug, Default)]
pub struct PcapDescriptor {
    buf: Option<Bytes>,
}

impl PcapDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, buf: Bytes) -> Result<(), DescriptorError> {
        require_len(DescriptorType::Pcap, &buf, layout::SIZE)?;
        tracing::trace!(len = buf.len(), "pcap descriptor bound");
        self.buf = Some(buf);
        Ok(())
    }

    pub fn unbind(&mut self) {
        self.buf = None;
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.buf.as_ref()
    }

    /// Link-layer header type (LINKTYPE_* value), 0 when unbound.
    pub fn link_type(&self) -> u16 {
        self.buf
            .as_deref()
            .map(|b| read_u16(b, layout::LINK_TYPE))
            .unwrap_or(0)
    }
}

impl PacketDescriptor for PcapDescriptor {
    fn descriptor_type(&self) -> DescriptorType {
        DescriptorType::Pcap
    }

    fn is_bound(&self) -> bool {
        self.buf.is_some()
    }

    fn byte_size(&self) -> usize {
        if self.buf.is_some() {
            layout::SIZE
        } else {
            0
        }
    }

    fn capture_length(&self) -> usize {
        self.buf
            .as_deref()
            .map(|b| read_u16(b, layout::CAPTURE_LENGTH) as usize)
            .unwrap_or(0)
    }

    fn wire_length(&self) -> usize {
        self.buf
            .as_deref()
            .map(|b| read_u16(b, layout::WIRE_LENGTH) as usize)
            .unwrap_or(0)
    }

    fn timestamp(&self) -> u64 {
        self.buf
            .as_deref()
            .map(|b| read_u64(b, layout::TIMESTAMP))
            .unwrap_or(0)
    }

    fn records(&self) -> &[HeaderRecord] {
        &[]
    }

    fn presence_bitmask(&self) -> u32 {
        0
    }

    fn lookup_header(&self, _id: HeaderId, _depth: usize) -> Option<Located> {
        None
    }

    fn lookup_extension(
        &self,
        _id: HeaderId,
        _ext: HeaderId,
        _depth: usize,
        _hint: Option<usize>,
    ) -> Option<Located> {
        None
    }
}
