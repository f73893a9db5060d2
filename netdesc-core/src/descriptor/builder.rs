//! Builders that encode descriptor bytes.
//!
//! Dissectors use these to emit descriptors while walking a frame; tests use
//! them to construct descriptors of any shape.

use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

use crate::error::DescriptorError;
use crate::header::record::presence_of;
use crate::header::{HeaderId, HeaderRecord};

use super::type2::{layout as t2, HashInfo, HashType, L2FrameType};
use super::{ipf, pcap};

/// Builder for Type2 descriptors.
#[derive(Debug, Clone)]
pub struct Type2Builder {
    capture_length: u16,
    wire_length: Option<u16>,
    timestamp: u64,
    rx_port: u8,
    tx_port: u8,
    l2_frame_type: L2FrameType,
    color: u8,
    flags: u16,
    hash: u32,
    presence: Option<u32>,
    records: SmallVec<[HeaderRecord; t2::MAX_RECORDS]>,
}

impl Type2Builder {
    /// Empty descriptor for a frame of `capture_length` bytes. The wire
    /// length defaults to the capture length.
    pub fn new(capture_length: u16) -> Self {
        Self {
            capture_length,
            wire_length: None,
            timestamp: 0,
            rx_port: 0,
            tx_port: 0,
            l2_frame_type: L2FrameType::Ether,
            color: 0,
            flags: 0,
            hash: 0,
            presence: None,
            records: SmallVec::new(),
        }
    }

    pub fn wire_length(mut self, wire_length: u16) -> Self {
        self.wire_length = Some(wire_length);
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn rx_port(mut self, port: u8) -> Self {
        self.rx_port = port;
        self
    }

    pub fn tx_port(mut self, port: u8) -> Self {
        self.tx_port = port;
        self
    }

    pub fn l2_frame_type(mut self, frame_type: L2FrameType) -> Self {
        self.l2_frame_type = frame_type;
        self
    }

    pub fn color(mut self, color: u8) -> Self {
        self.color = color;
        self
    }

    /// Rx/tx flag bits. Bits above the flag range are dropped.
    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags & t2::FLAGS_MASK;
        self
    }

    pub fn hash(mut self, hash_type: HashType, hash24: u32) -> Self {
        self.hash = HashInfo::to_word(hash_type, hash24);
        self
    }

    /// Override the presence bitmask instead of deriving it from the records.
    pub fn presence_bitmask(mut self, presence: u32) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Append a record and return its index.
    ///
    /// Option records (options pack) must follow the header that owns them.
    pub fn push(
        &mut self,
        id: HeaderId,
        offset: usize,
        length: usize,
    ) -> Result<usize, DescriptorError> {
        let index = self.records.len();
        if index == t2::MAX_RECORDS {
            return Err(DescriptorError::TooManyRecords {
                count: index + 1,
                max: t2::MAX_RECORDS,
            });
        }
        let capture_length = self.capture_length as usize;
        if offset + length > capture_length {
            return Err(DescriptorError::RecordOutOfBounds {
                index,
                end: offset + length,
                capture_length,
            });
        }
        if id.is_options() && self.records.is_empty() {
            return Err(DescriptorError::OrphanOptions);
        }

        // Both fit in u16: they are bounded by the u16 capture length.
        self.records
            .push(HeaderRecord::new(id, offset as u16, length as u16));
        Ok(index)
    }

    /// Drop all records, keeping the metadata.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[HeaderRecord] {
        &self.records
    }

    /// Encode the descriptor.
    pub fn build(&self) -> Bytes {
        let size = t2::HEADER_SIZE + self.records.len() * HeaderRecord::SIZE;
        let mut buf = BytesMut::with_capacity(size);

        let flags = self.flags | ((self.records.len() as u16) << t2::RECORD_COUNT_SHIFT);
        let presence = self
            .presence
            .unwrap_or_else(|| presence_of(&self.records));

        buf.put_u64_le(self.timestamp);
        buf.put_u16_le(self.capture_length);
        buf.put_u16_le(self.wire_length.unwrap_or(self.capture_length));
        buf.put_u8(self.rx_port);
        buf.put_u8(self.tx_port);
        buf.put_u8(self.l2_frame_type as u8);
        buf.put_u8(self.color);
        buf.put_u16_le(flags);
        buf.put_u16_le(0);
        buf.put_u32_le(self.hash);
        buf.put_u32_le(presence);
        debug_assert_eq!(buf.len(), t2::HEADER_SIZE);

        for record in &self.records {
            buf.put_slice(&record.to_le_bytes());
        }
        buf.freeze()
    }
}

/// Builder for fixed-layout capture descriptors.
#[derive(Debug, Clone, Default)]
pub struct PcapBuilder {
    capture_length: u16,
    wire_length: Option<u16>,
    timestamp: u64,
    link_type: u16,
}

impl PcapBuilder {
    pub fn new(capture_length: u16) -> Self {
        Self {
            capture_length,
            ..Default::default()
        }
    }

    pub fn wire_length(mut self, wire_length: u16) -> Self {
        self.wire_length = Some(wire_length);
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn link_type(mut self, link_type: u16) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(pcap::layout::SIZE);
        buf.put_u64_le(self.timestamp);
        buf.put_u16_le(self.capture_length);
        buf.put_u16_le(self.wire_length.unwrap_or(self.capture_length));
        buf.put_u16_le(self.link_type);
        buf.put_bytes(0, pcap::layout::SIZE - buf.len());
        buf.freeze()
    }
}

/// Builder for IP fragmentation descriptors.
#[derive(Debug, Clone, Default)]
pub struct IpfBuilder {
    identification: u32,
    fragment_offset: u16,
    flags: u8,
    ip_version: u8,
    data_offset: u16,
    data_length: u16,
}

impl IpfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identification(mut self, identification: u32) -> Self {
        self.identification = identification;
        self
    }

    pub fn fragment_offset(mut self, offset: u16) -> Self {
        self.fragment_offset = offset;
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn ip_version(mut self, version: u8) -> Self {
        self.ip_version = version;
        self
    }

    /// Location of the fragment data within the frame.
    pub fn data(mut self, offset: u16, length: u16) -> Self {
        self.data_offset = offset;
        self.data_length = length;
        self
    }

    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ipf::layout::SIZE);
        buf.put_u32_le(self.identification);
        buf.put_u16_le(self.fragment_offset);
        buf.put_u8(self.flags);
        buf.put_u8(self.ip_version);
        buf.put_u16_le(self.data_offset);
        buf.put_u16_le(self.data_length);
        buf.put_bytes(0, ipf::layout::SIZE - buf.len());
        buf.freeze()
    }
}
