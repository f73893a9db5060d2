//! Packet configuration.

use crate::descriptor::DescriptorType;

/// Unit of the 8-byte descriptor timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampUnit {
    /// Microseconds since the Unix epoch (classic pcap resolution).
    #[default]
    Micros,
    /// Nanoseconds since the Unix epoch.
    Nanos,
}

impl TimestampUnit {
    /// Convert a raw timestamp to nanoseconds, `None` on overflow.
    pub fn to_nanos(&self, raw: u64) -> Option<u64> {
        match self {
            TimestampUnit::Micros => raw.checked_mul(1_000),
            TimestampUnit::Nanos => Some(raw),
        }
    }

    /// Convert nanoseconds to a raw timestamp in this unit.
    pub fn from_nanos(&self, nanos: u64) -> u64 {
        match self {
            TimestampUnit::Micros => nanos / 1_000,
            TimestampUnit::Nanos => nanos,
        }
    }
}

/// Configuration for a [`Packet`](crate::Packet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketConfig {
    /// Layout of the head descriptor. Must be a packet descriptor type.
    pub descriptor_type: DescriptorType,
    /// Unit of the descriptor timestamp.
    pub timestamp_unit: TimestampUnit,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self {
            descriptor_type: DescriptorType::Type2,
            timestamp_unit: TimestampUnit::Micros,
        }
    }
}

impl PacketConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor_type(mut self, descriptor_type: DescriptorType) -> Self {
        self.descriptor_type = descriptor_type;
        self
    }

    pub fn timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }
}
