//! IP fragmentation descriptor.
//!
//! Auxiliary metadata chained after the packet descriptor of a fragment.
//! 16 bytes, little-endian:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0  | 4 | identification |
//! | 4  | 2 | fragment offset (bytes) |
//! | 6  | 1 | flags ([`ipf_flags`]) |
//! | 7  | 1 | IP version |
//! | 8  | 2 | fragment data offset in the frame |
//! | 10 | 2 | fragment data length |
//! | 12 | 4 | reserved |

use bytes::Bytes;

use crate::error::DescriptorError;

use super::{read_u16, read_u32, read_u8, require_len, DescriptorType};

pub(crate) mod layout {
    pub const IDENTIFICATION: usize = 0;
    pub const FRAGMENT_OFFSET: usize = 4;
    pub const FLAGS: usize = 6;
    pub const VERSION: usize = 7;
    pub const DATA_OFFSET: usize = 8;
    pub const DATA_LENGTH: usize = 10;
    pub const SIZE: usize = 16;
}

/// Flag bits.
pub mod ipf_flags {
    pub const MORE_FRAGMENTS: u8 = 0x01;
    pub const LAST_FRAGMENT: u8 = 0x02;
    pub const REASSEMBLED: u8 = 0x04;
    pub const COMPLETE: u8 = 0x08;
    pub const TIMED_OUT: u8 = 0x10;
}

#[derive(Debug, Default)]
pub struct IpfDescriptor {
    buf: Option<Bytes>,
}

impl IpfDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, buf: Bytes) -> Result<(), DescriptorError> {
        require_len(DescriptorType::Ipf, &buf, layout::SIZE)?;
        tracing::trace!(len = buf.len(), "ipf descriptor bound");
        self.buf = Some(buf);
        Ok(())
    }

    pub fn unbind(&mut self) {
        self.buf = None;
    }

    pub fn is_bound(&self) -> bool {
        self.buf.is_some()
    }

    pub fn byte_size(&self) -> usize {
        if self.buf.is_some() {
            layout::SIZE
        } else {
            0
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.buf.as_ref()
    }

    fn field<T: Default>(&self, read: impl FnOnce(&[u8]) -> T) -> T {
        self.buf.as_deref().map(read).unwrap_or_default()
    }

    pub fn identification(&self) -> u32 {
        self.field(|b| read_u32(b, layout::IDENTIFICATION))
    }

    pub fn fragment_offset(&self) -> u16 {
        self.field(|b| read_u16(b, layout::FRAGMENT_OFFSET))
    }

    pub fn flags(&self) -> u8 {
        self.field(|b| read_u8(b, layout::FLAGS))
    }

    pub fn ip_version(&self) -> u8 {
        self.field(|b| read_u8(b, layout::VERSION))
    }

    pub fn data_offset(&self) -> usize {
        self.field(|b| read_u16(b, layout::DATA_OFFSET)) as usize
    }

    pub fn data_length(&self) -> usize {
        self.field(|b| read_u16(b, layout::DATA_LENGTH)) as usize
    }

    pub fn more_fragments(&self) -> bool {
        self.flags() & ipf_flags::MORE_FRAGMENTS != 0
    }

    pub fn is_last_fragment(&self) -> bool {
        self.flags() & ipf_flags::LAST_FRAGMENT != 0
    }

    pub fn is_reassembled(&self) -> bool {
        self.flags() & ipf_flags::REASSEMBLED != 0
    }

    pub fn is_complete(&self) -> bool {
        self.flags() & ipf_flags::COMPLETE != 0
    }

    pub fn is_timed_out(&self) -> bool {
        self.flags() & ipf_flags::TIMED_OUT != 0
    }
}
