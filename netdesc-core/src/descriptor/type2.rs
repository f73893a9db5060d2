//! Type2 descriptor: fixed header region followed by an array of header records.
//!
//! Layout (little-endian):
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0  | 8 | timestamp |
//! | 8  | 2 | capture length |
//! | 10 | 2 | wire length |
//! | 12 | 1 | rx port |
//! | 13 | 1 | tx port |
//! | 14 | 1 | L2 frame type |
//! | 15 | 1 | color |
//! | 16 | 2 | flags word (rx/tx flags, record count in bits 11..16) |
//! | 18 | 2 | reserved |
//! | 20 | 4 | hash (24-bit hash, 8-bit hash type) |
//! | 24 | 4 | presence bitmask |
//! | 28 | 8 * n | header records |

use std::cell::OnceCell;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::DescriptorError;
use crate::header::record::definitely_absent;
use crate::header::{HeaderId, HeaderRecord};

use super::lookup::{find_option, scan};
use super::{read_u16, read_u32, read_u64, read_u8, require_len};
use super::{DescriptorType, Located, PacketDescriptor};

/// Byte offsets and bit layout of the header region.
pub(crate) mod layout {
    pub const TIMESTAMP: usize = 0;
    pub const CAPTURE_LENGTH: usize = 8;
    pub const WIRE_LENGTH: usize = 10;
    pub const RX_PORT: usize = 12;
    pub const TX_PORT: usize = 13;
    pub const L2_FRAME_TYPE: usize = 14;
    pub const COLOR: usize = 15;
    pub const FLAGS: usize = 16;
    pub const HASH: usize = 20;
    pub const PRESENCE: usize = 24;

    /// Size of the fixed header region; records start here.
    pub const HEADER_SIZE: usize = 28;
    pub const MAX_RECORDS: usize = 16;
    pub const MAX_SIZE: usize = HEADER_SIZE + MAX_RECORDS * 8;

    pub const RECORD_COUNT_SHIFT: u16 = 11;
    pub const RECORD_COUNT_MASK: u16 = 0x1f;
    pub const FLAGS_MASK: u16 = (1 << RECORD_COUNT_SHIFT) - 1;

    pub const HASH24_MASK: u32 = 0x00ff_ffff;
    pub const HASH_TYPE_SHIFT: u32 = 24;
}

/// Rx/tx flag bits of the flags word.
pub mod type2_flags {
    pub const RX_CRC_ERROR: u16 = 0x001;
    pub const RX_TRUNCATED: u16 = 0x002;
    pub const RX_SLICED: u16 = 0x004;
    pub const RX_DUPLICATE: u16 = 0x008;
    pub const TX_NOW: u16 = 0x010;
    pub const TX_IGNORE: u16 = 0x020;
    pub const TX_CRC_OVERRIDE: u16 = 0x040;
    pub const TX_SET_CLOCK: u16 = 0x080;
}

/// Link-layer framing of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum L2FrameType {
    #[default]
    Ether = 0,
    Llc = 1,
    Snap = 2,
    NovellRaw = 3,
    Isl = 4,
    Other = 255,
}

impl L2FrameType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => L2FrameType::Ether,
            1 => L2FrameType::Llc,
            2 => L2FrameType::Snap,
            3 => L2FrameType::NovellRaw,
            4 => L2FrameType::Isl,
            _ => L2FrameType::Other,
        }
    }
}

/// Which fields fed the flow hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HashType {
    #[default]
    None = 0,
    /// Source and destination address.
    Tuple2 = 1,
    /// Addresses and IP protocol.
    Tuple3 = 2,
    /// Addresses, protocol and ports.
    Tuple5 = 3,
    /// 5-tuple with addresses and ports sorted (direction-agnostic).
    Tuple5Sorted = 4,
    /// Outermost/innermost MAC addresses.
    Mac = 5,
}

impl HashType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => HashType::Tuple2,
            2 => HashType::Tuple3,
            3 => HashType::Tuple5,
            4 => HashType::Tuple5Sorted,
            5 => HashType::Mac,
            _ => HashType::None,
        }
    }
}

/// Decoded hash word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HashInfo {
    /// Full 32-bit hash word.
    pub value: u32,
    /// Low 24 bits.
    pub hash24: u32,
    pub hash_type: HashType,
}

impl HashInfo {
    pub fn from_word(value: u32) -> Self {
        Self {
            value,
            hash24: value & layout::HASH24_MASK,
            hash_type: HashType::from_u8((value >> layout::HASH_TYPE_SHIFT) as u8),
        }
    }

    pub fn to_word(hash_type: HashType, hash24: u32) -> u32 {
        ((hash_type as u32) << layout::HASH_TYPE_SHIFT) | (hash24 & layout::HASH24_MASK)
    }
}

/// Type2 packet descriptor.
#[derive(Debug, Default)]
pub struct Type2Descriptor {
    state: BindState,
}

#[derive(Debug, Default)]
enum BindState {
    #[default]
    Unbound,
    Bound(Bound),
}

/// A binding plus the fields lazily derived from it. Replaced as a whole on
/// every transition, so derived values never outlive their bytes.
#[derive(Debug)]
struct Bound {
    buf: Bytes,
    records: OnceCell<SmallVec<[HeaderRecord; layout::MAX_RECORDS]>>,
    presence: OnceCell<u32>,
    hash: OnceCell<HashInfo>,
}

impl Bound {
    fn new(buf: Bytes) -> Self {
        Self {
            buf,
            records: OnceCell::new(),
            presence: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }
}

impl Type2Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to encoded bytes. Validates the header region, the record count
    /// and that every record lies within the capture length.
    pub fn bind(&mut self, buf: Bytes) -> Result<(), DescriptorError> {
        validate(&buf)?;
        self.transition(Some(buf));
        Ok(())
    }

    pub fn unbind(&mut self) {
        self.transition(None);
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.bound().map(|b| &b.buf)
    }

    /// The single state transition: all derived fields go with the old state.
    fn transition(&mut self, buf: Option<Bytes>) {
        self.state = match buf {
            Some(buf) => {
                tracing::trace!(len = buf.len(), "type2 descriptor bound");
                BindState::Bound(Bound::new(buf))
            }
            None => BindState::Unbound,
        };
    }

    #[inline]
    fn bound(&self) -> Option<&Bound> {
        match &self.state {
            BindState::Bound(b) => Some(b),
            BindState::Unbound => None,
        }
    }

    #[inline]
    fn field<T: Default>(&self, read: impl FnOnce(&[u8]) -> T) -> T {
        self.bound().map(|b| read(&b.buf)).unwrap_or_default()
    }

    pub fn rx_port(&self) -> u8 {
        self.field(|b| read_u8(b, layout::RX_PORT))
    }

    pub fn tx_port(&self) -> u8 {
        self.field(|b| read_u8(b, layout::TX_PORT))
    }

    pub fn l2_frame_type(&self) -> L2FrameType {
        L2FrameType::from_u8(self.field(|b| read_u8(b, layout::L2_FRAME_TYPE)))
    }

    pub fn color(&self) -> u8 {
        self.field(|b| read_u8(b, layout::COLOR))
    }

    /// Rx/tx flag bits (see [`type2_flags`]).
    pub fn flags(&self) -> u16 {
        self.field(|b| read_u16(b, layout::FLAGS)) & layout::FLAGS_MASK
    }

    /// Record count straight from the flags word.
    pub fn encoded_record_count(&self) -> usize {
        self.field(record_count_of)
    }

    pub fn hash(&self) -> HashInfo {
        match self.bound() {
            Some(b) => *b
                .hash
                .get_or_init(|| HashInfo::from_word(read_u32(&b.buf, layout::HASH))),
            None => HashInfo::default(),
        }
    }

    fn located(&self, index: usize) -> Located {
        let record = self.records()[index];
        Located {
            offset: record.offset(),
            length: record.length(),
            record_index: Some(index),
            descriptor_type: DescriptorType::Type2,
        }
    }
}

impl PacketDescriptor for Type2Descriptor {
    fn descriptor_type(&self) -> DescriptorType {
        DescriptorType::Type2
    }

    fn is_bound(&self) -> bool {
        self.bound().is_some()
    }

    fn byte_size(&self) -> usize {
        match self.bound() {
            Some(b) => layout::HEADER_SIZE + record_count_of(&b.buf) * HeaderRecord::SIZE,
            None => 0,
        }
    }

    fn capture_length(&self) -> usize {
        self.field(|b| read_u16(b, layout::CAPTURE_LENGTH)) as usize
    }

    fn wire_length(&self) -> usize {
        self.field(|b| read_u16(b, layout::WIRE_LENGTH)) as usize
    }

    fn timestamp(&self) -> u64 {
        self.field(|b| read_u64(b, layout::TIMESTAMP))
    }

    fn records(&self) -> &[HeaderRecord] {
        match self.bound() {
            Some(b) => b.records.get_or_init(|| decode_records(&b.buf)),
            None => &[],
        }
    }

    fn presence_bitmask(&self) -> u32 {
        match self.bound() {
            Some(b) => *b
                .presence
                .get_or_init(|| read_u32(&b.buf, layout::PRESENCE)),
            None => 0,
        }
    }

    fn lookup_header(&self, id: HeaderId, depth: usize) -> Option<Located> {
        // Payload is synthesized by the packet, never recorded.
        if id.is_payload() {
            return None;
        }
        if definitely_absent(self.presence_bitmask(), id) {
            return None;
        }
        scan(self.records(), id, depth).map(|index| self.located(index))
    }

    fn lookup_extension(
        &self,
        id: HeaderId,
        ext: HeaderId,
        depth: usize,
        hint: Option<usize>,
    ) -> Option<Located> {
        let records = self.records();
        let parent = match hint {
            Some(index) if index < records.len() => index,
            Some(_) => return None,
            None => {
                if definitely_absent(self.presence_bitmask(), id) {
                    return None;
                }
                scan(records, id, depth)?
            }
        };

        if ext.is_payload() {
            let offset = records[parent].end();
            return Some(Located {
                offset,
                length: self.capture_length().saturating_sub(offset),
                record_index: None,
                descriptor_type: DescriptorType::Type2,
            });
        }

        find_option(records, parent, ext).map(|index| self.located(index))
    }
}

#[inline]
fn record_count_of(buf: &[u8]) -> usize {
    ((read_u16(buf, layout::FLAGS) >> layout::RECORD_COUNT_SHIFT) & layout::RECORD_COUNT_MASK)
        as usize
}

fn decode_records(buf: &[u8]) -> SmallVec<[HeaderRecord; layout::MAX_RECORDS]> {
    let count = record_count_of(buf);
    buf[layout::HEADER_SIZE..layout::HEADER_SIZE + count * HeaderRecord::SIZE]
        .chunks_exact(HeaderRecord::SIZE)
        .map(|chunk| {
            let mut raw = [0u8; HeaderRecord::SIZE];
            raw.copy_from_slice(chunk);
            HeaderRecord::from_le_bytes(raw)
        })
        .collect()
}

fn validate(buf: &[u8]) -> Result<(), DescriptorError> {
    require_len(DescriptorType::Type2, buf, layout::HEADER_SIZE)?;

    let count = record_count_of(buf);
    if count > layout::MAX_RECORDS {
        return Err(DescriptorError::TooManyRecords {
            count,
            max: layout::MAX_RECORDS,
        });
    }
    require_len(
        DescriptorType::Type2,
        buf,
        layout::HEADER_SIZE + count * HeaderRecord::SIZE,
    )?;

    let capture_length = read_u16(buf, layout::CAPTURE_LENGTH) as usize;
    for (index, record) in decode_records(buf).iter().enumerate() {
        if record.end() > capture_length {
            return Err(DescriptorError::RecordOutOfBounds {
                index,
                end: record.end(),
                capture_length,
            });
        }
    }
    Ok(())
}
