//! PCAP and PCAPNG capture reading.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapNGReader};

use crate::error::{CaptureError, Error};

/// Buffer size for reading capture files (64KB).
const BUFFER_SIZE: usize = 65536;

/// Ethernet, the default until a header or interface block says otherwise.
pub const LINKTYPE_ETHERNET: u16 = 1;

/// PCAPNG `if_tsresol` when an interface does not carry one: 10^-6 s.
const DEFAULT_TSRESOL: u8 = 6;

/// One frame read from a capture.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Frame number (1-indexed).
    pub frame_number: u64,

    /// Timestamp in microseconds since epoch.
    pub timestamp_us: i64,

    /// Captured length (may be less than original).
    pub captured_length: u32,

    /// Original length on the wire.
    pub original_length: u32,

    /// Link layer type (e.g., 1 = Ethernet).
    pub link_type: u16,

    /// Captured bytes.
    pub data: Bytes,
}

impl CapturedFrame {
    /// Check if the frame was truncated during capture.
    pub fn is_truncated(&self) -> bool {
        self.captured_length < self.original_length
    }
}

type Source = BufReader<Box<dyn Read + Send>>;

/// Reader for PCAP and PCAPNG captures.
pub struct CaptureReader {
    inner: ReaderInner,
    frame_number: u64,
    link_type: u16,
    nanosecond_timestamps: bool,
    /// PCAPNG interfaces of the current section, indexed by interface id.
    interfaces: Vec<Interface>,
}

#[derive(Debug, Clone, Copy)]
struct Interface {
    link_type: u16,
    tsresol: u8,
    /// Seconds added to every timestamp.
    tsoffset: i64,
}

enum ReaderInner {
    Legacy(LegacyPcapReader<Source>),
    Ng(PcapNGReader<Source>),
}

impl CaptureReader {
    /// Open a capture file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| {
            Error::Capture(CaptureError::FileNotFound {
                path: path.display().to_string(),
            })
        })?;
        Self::from_reader(file)
    }

    /// Read a capture from any byte source. The format is picked from the
    /// leading magic number.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Result<Self, Error> {
        let boxed: Box<dyn Read + Send> = Box::new(reader);
        let mut source = BufReader::with_capacity(BUFFER_SIZE, boxed);

        // Peek without consuming; the parser reads the header itself.
        let mut magic = [0u8; 4];
        {
            let head = source.fill_buf()?;
            if head.len() < magic.len() {
                return Err(invalid("File too short to read magic number"));
            }
            magic.copy_from_slice(&head[..4]);
        }

        match &magic {
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d] => Self::open_legacy(source),
            [0x0a, 0x0d, 0x0d, 0x0a] => Self::open_ng(source),
            _ => Err(invalid(&format!("Unknown magic number: {magic:02x?}"))),
        }
    }

    fn open_legacy(source: Source) -> Result<Self, Error> {
        let reader = LegacyPcapReader::new(BUFFER_SIZE, source)
            .map_err(|e| invalid(&format!("Failed to parse PCAP header: {e}")))?;

        Ok(Self {
            inner: ReaderInner::Legacy(reader),
            frame_number: 0,
            link_type: LINKTYPE_ETHERNET,
            nanosecond_timestamps: false,
            interfaces: Vec::new(),
        })
    }

    fn open_ng(source: Source) -> Result<Self, Error> {
        let reader = PcapNGReader::new(BUFFER_SIZE, source)
            .map_err(|e| invalid(&format!("Failed to parse PCAPNG header: {e}")))?;

        Ok(Self {
            inner: ReaderInner::Ng(reader),
            frame_number: 0,
            link_type: LINKTYPE_ETHERNET,
            nanosecond_timestamps: false,
            interfaces: Vec::new(),
        })
    }

    /// Link type of the most recent header or interface block.
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// Number of frames read so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Read the next frame, or `None` at end of capture.
    pub fn next_frame(&mut self) -> Result<Option<CapturedFrame>, Error> {
        match self.inner {
            ReaderInner::Legacy(_) => self.next_legacy(),
            ReaderInner::Ng(_) => self.next_ng(),
        }
    }

    fn next_legacy(&mut self) -> Result<Option<CapturedFrame>, Error> {
        let reader = match &mut self.inner {
            ReaderInner::Legacy(r) => r,
            ReaderInner::Ng(_) => return Ok(None),
        };
        loop {
            match reader.next() {
                Ok((offset, block)) => match block {
                    PcapBlockOwned::Legacy(packet) => {
                        self.frame_number += 1;

                        let fraction = if self.nanosecond_timestamps {
                            i64::from(packet.ts_usec) / 1_000
                        } else {
                            i64::from(packet.ts_usec)
                        };
                        let frame = CapturedFrame {
                            frame_number: self.frame_number,
                            timestamp_us: i64::from(packet.ts_sec) * 1_000_000 + fraction,
                            captured_length: packet.caplen,
                            original_length: packet.origlen,
                            link_type: self.link_type,
                            data: Bytes::copy_from_slice(packet.data),
                        };

                        reader.consume(offset);
                        return Ok(Some(frame));
                    }
                    PcapBlockOwned::LegacyHeader(header) => {
                        self.link_type = header.network.0 as u16;
                        self.nanosecond_timestamps = header.is_nanosecond_precision();
                        tracing::debug!(link_type = self.link_type, "pcap header");
                        reader.consume(offset);
                    }
                    _ => reader.consume(offset),
                },
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| invalid(&format!("Refill error: {e}")))?;
                }
                Err(e) => return Err(invalid(&format!("Parse error: {e}"))),
            }
        }
    }

    fn next_ng(&mut self) -> Result<Option<CapturedFrame>, Error> {
        let reader = match &mut self.inner {
            ReaderInner::Ng(r) => r,
            ReaderInner::Legacy(_) => return Ok(None),
        };
        loop {
            match reader.next() {
                Ok((offset, PcapBlockOwned::NG(block))) => match block {
                    Block::SectionHeader(_) => {
                        // Interface ids restart with every section.
                        self.interfaces.clear();
                        reader.consume(offset);
                    }
                    Block::InterfaceDescription(idb) => {
                        self.link_type = idb.linktype.0 as u16;
                        let interface = Interface {
                            link_type: self.link_type,
                            tsresol: idb.if_tsresol,
                            tsoffset: idb.if_tsoffset as i64,
                        };
                        tracing::debug!(
                            link_type = interface.link_type,
                            tsresol = interface.tsresol,
                            "pcapng interface"
                        );
                        self.interfaces.push(interface);
                        reader.consume(offset);
                    }
                    Block::EnhancedPacket(epb) => {
                        self.frame_number += 1;

                        let fallback = Interface {
                            link_type: self.link_type,
                            tsresol: DEFAULT_TSRESOL,
                            tsoffset: 0,
                        };
                        let interface = self
                            .interfaces
                            .get(epb.if_id as usize)
                            .copied()
                            .unwrap_or(fallback);
                        let ticks = (u64::from(epb.ts_high) << 32) | u64::from(epb.ts_low);
                        let offset_us = interface.tsoffset.saturating_mul(1_000_000);
                        let Some(local_us) = ticks_to_micros(ticks, interface.tsresol) else {
                            let err = invalid(&format!(
                                "Unsupported if_tsresol {:#04x} on interface {}",
                                interface.tsresol, epb.if_id
                            ));
                            reader.consume(offset);
                            return Err(err);
                        };
                        let timestamp_us = local_us.saturating_add(offset_us);
                        let frame = CapturedFrame {
                            frame_number: self.frame_number,
                            timestamp_us,
                            captured_length: epb.caplen,
                            original_length: epb.origlen,
                            link_type: interface.link_type,
                            data: Bytes::copy_from_slice(epb.data),
                        };

                        reader.consume(offset);
                        return Ok(Some(frame));
                    }
                    Block::SimplePacket(spb) => {
                        self.frame_number += 1;

                        let frame = CapturedFrame {
                            frame_number: self.frame_number,
                            timestamp_us: 0,
                            captured_length: spb.data.len() as u32,
                            original_length: spb.origlen,
                            link_type: self.link_type,
                            data: Bytes::copy_from_slice(spb.data),
                        };

                        reader.consume(offset);
                        return Ok(Some(frame));
                    }
                    _ => reader.consume(offset),
                },
                Ok((offset, _)) => reader.consume(offset),
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| invalid(&format!("Refill error: {e}")))?;
                }
                Err(e) => return Err(invalid(&format!("Parse error: {e}"))),
            }
        }
    }
}

impl Iterator for CaptureReader {
    type Item = Result<CapturedFrame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

/// Convert a PCAPNG timestamp in `if_tsresol` units to microseconds.
///
/// With the high bit clear the unit is 10^-n seconds, otherwise 2^-n.
/// `None` when the resolution is unrepresentable or the result overflows.
fn ticks_to_micros(ticks: u64, tsresol: u8) -> Option<i64> {
    let exponent = u32::from(tsresol & 0x7f);
    let per_second = if tsresol & 0x80 == 0 {
        10u128.checked_pow(exponent)?
    } else {
        1u128.checked_shl(exponent)?
    };
    i64::try_from(u128::from(ticks) * 1_000_000 / per_second).ok()
}

fn invalid(reason: &str) -> Error {
    Error::Capture(CaptureError::InvalidFormat {
        reason: reason.to_string(),
    })
}
