//! Packed header records.
//!
//! A record is one 8-byte entry in a Type2 descriptor:
//!
//! ```text
//!  63                               32 31            16 15             0
//! +-----------------------------------+----------------+----------------+
//! |  header id (class | pack | proto) |     length     |     offset     |
//! +-----------------------------------+----------------+----------------+
//! ```
//!
//! Everything here is a pure function over integers. Inputs are trusted: the
//! dissector that produced them already validated ranges.

use std::fmt;

use super::id::HeaderId;

/// Packed header record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HeaderRecord(u64);

impl HeaderRecord {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// Encode a record from its raw fields.
    pub const fn encode(pack: u8, protocol: u8, class_mask: u32, offset: u16, length: u16) -> Self {
        Self::new(HeaderId::with_class(pack, protocol, class_mask), offset, length)
    }

    /// Encode a record for a header id.
    pub const fn new(id: HeaderId, offset: u16, length: u16) -> Self {
        Self(((id.bits() as u64) << 32) | ((length as u64) << 16) | offset as u64)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub const fn id(self) -> HeaderId {
        HeaderId::from_bits((self.0 >> 32) as u32)
    }

    #[inline]
    pub const fn pack(self) -> u8 {
        self.id().pack()
    }

    #[inline]
    pub const fn protocol(self) -> u8 {
        self.id().protocol()
    }

    #[inline]
    pub const fn class_mask(self) -> u32 {
        self.id().class_mask()
    }

    #[inline]
    pub const fn offset(self) -> usize {
        (self.0 & 0xffff) as usize
    }

    #[inline]
    pub const fn length(self) -> usize {
        ((self.0 >> 16) & 0xffff) as usize
    }

    /// First byte after this header.
    #[inline]
    pub const fn end(self) -> usize {
        self.offset() + self.length()
    }

    /// Record carries the given header id (pack and protocol ordinal).
    #[inline]
    pub const fn matches(self, id: HeaderId) -> bool {
        self.id().matches(id)
    }

    /// Record belongs to the options run of the preceding header.
    #[inline]
    pub const fn is_options(self) -> bool {
        self.id().is_options()
    }

    /// Record has no class bits.
    #[inline]
    pub const fn is_classless(self) -> bool {
        !self.id().has_class()
    }
}

impl fmt::Debug for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HeaderRecord({} offset={} length={})",
            self.id().name(),
            self.offset(),
            self.length()
        )
    }
}

impl fmt::Display for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}+{}", self.id().name(), self.offset(), self.length())
    }
}

/// Presence bitmask contains one of the id's class bits.
#[inline]
pub const fn contains_class(presence: u32, id: HeaderId) -> bool {
    presence & id.class_mask() != 0
}

/// Presence bitmask proves `id` is absent: its class is known and not present.
#[inline]
pub const fn definitely_absent(presence: u32, id: HeaderId) -> bool {
    id.has_class() && !contains_class(presence, id)
}

/// OR of the class bits of every record.
pub fn presence_of(records: &[HeaderRecord]) -> u32 {
    records.iter().fold(0, |mask, r| mask | r.class_mask())
}
