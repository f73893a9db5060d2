//! Test utilities: synthetic frames and in-memory PCAP files.

use bytes::Bytes;

use crate::capture::{CapturedFrame, LINKTYPE_ETHERNET};

/// Wrap raw bytes as frame 1 of an Ethernet capture.
pub fn captured(data: Vec<u8>) -> CapturedFrame {
    let len = data.len() as u32;
    CapturedFrame {
        frame_number: 1,
        timestamp_us: 1_700_000_000_000_000,
        captured_length: len,
        original_length: len,
        link_type: LINKTYPE_ETHERNET,
        data: Bytes::from(data),
    }
}

/// Builder for layered test frames. Length fields of IPv4 and IPv6 headers
/// are patched in `build` to cover everything after them.
pub struct FrameBuilder {
    data: Vec<u8>,
    ipv4_starts: Vec<usize>,
    ipv6_starts: Vec<usize>,
}

impl FrameBuilder {
    pub fn ethernet(ether_type: u16) -> Self {
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(&[0xff; 6]);
        data.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        data.extend_from_slice(&ether_type.to_be_bytes());
        Self {
            data,
            ipv4_starts: Vec::new(),
            ipv6_starts: Vec::new(),
        }
    }

    pub fn vlan(mut self, ether_type: u16) -> Self {
        self.data.extend_from_slice(&100u16.to_be_bytes());
        self.data.extend_from_slice(&ether_type.to_be_bytes());
        self
    }

    /// IPv4 header; `options` must be a multiple of 4 bytes.
    pub fn ipv4(self, protocol: u8, options: &[u8]) -> Self {
        self.ipv4_header(protocol, options, 0x0001, 0x4000)
    }

    /// IPv4 fragment with `offset` in 8-byte units.
    pub fn ipv4_fragment(self, protocol: u8, id: u16, offset: u16, more: bool) -> Self {
        let flags = if more { 0x2000 } else { 0 };
        self.ipv4_header(protocol, &[], id, flags | offset)
    }

    fn ipv4_header(mut self, protocol: u8, options: &[u8], id: u16, frag: u16) -> Self {
        self.ipv4_starts.push(self.data.len());
        let ihl = 5 + (options.len() / 4) as u8;
        self.data.extend_from_slice(&[0x40 | ihl, 0x00, 0x00, 0x00]);
        self.data.extend_from_slice(&id.to_be_bytes());
        self.data.extend_from_slice(&frag.to_be_bytes());
        self.data.extend_from_slice(&[64, protocol, 0x00, 0x00]);
        self.data.extend_from_slice(&[10, 0, 0, 1]);
        self.data.extend_from_slice(&[10, 0, 0, 2]);
        self.data.extend_from_slice(options);
        self
    }

    pub fn ipv6(mut self, next_header: u8) -> Self {
        self.ipv6_starts.push(self.data.len());
        self.data.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        self.data.extend_from_slice(&[0x00, 0x00, next_header, 64]);
        self.data.extend_from_slice(&[0xfe, 0x80]);
        self.data.extend_from_slice(&[0u8; 13]);
        self.data.push(1);
        self.data.extend_from_slice(&[0xfe, 0x80]);
        self.data.extend_from_slice(&[0u8; 13]);
        self.data.push(2);
        self
    }

    /// TCP header; `options` must be a multiple of 4 bytes.
    pub fn tcp(mut self, options: &[u8]) -> Self {
        let data_offset = (5 + options.len() / 4) as u8;
        self.data.extend_from_slice(&12345u16.to_be_bytes());
        self.data.extend_from_slice(&80u16.to_be_bytes());
        self.data.extend_from_slice(&1u32.to_be_bytes());
        self.data.extend_from_slice(&0u32.to_be_bytes());
        self.data.extend_from_slice(&[data_offset << 4, 0x02, 0xff, 0xff]);
        self.data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        self.data.extend_from_slice(options);
        self
    }

    pub fn udp(mut self) -> Self {
        self.data.extend_from_slice(&53000u16.to_be_bytes());
        self.data.extend_from_slice(&53u16.to_be_bytes());
        self.data.extend_from_slice(&8u16.to_be_bytes());
        self.data.extend_from_slice(&[0x00, 0x00]);
        self
    }

    pub fn gre(mut self, protocol: u16) -> Self {
        self.data.extend_from_slice(&[0x00, 0x00]);
        self.data.extend_from_slice(&protocol.to_be_bytes());
        self
    }

    /// Ethernet/IPv4 ARP request.
    pub fn arp(mut self) -> Self {
        self.data.extend_from_slice(&[0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01]);
        self.data.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        self.data.extend_from_slice(&[10, 0, 0, 1]);
        self.data.extend_from_slice(&[0u8; 6]);
        self.data.extend_from_slice(&[10, 0, 0, 2]);
        self
    }

    pub fn payload(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let len = self.data.len();
        for &start in &self.ipv4_starts {
            let total = (len - start) as u16;
            self.data[start + 2..start + 4].copy_from_slice(&total.to_be_bytes());
        }
        for &start in &self.ipv6_starts {
            let payload = (len - start - 40) as u16;
            self.data[start + 4..start + 6].copy_from_slice(&payload.to_be_bytes());
        }
        self.data
    }
}

/// In-memory legacy PCAP file (little-endian, microsecond timestamps).
pub struct PcapWriter {
    buf: Vec<u8>,
}

impl PcapWriter {
    pub fn new(link_type: u16) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&65535u32.to_le_bytes());
        buf.extend_from_slice(&u32::from(link_type).to_le_bytes());
        Self { buf }
    }

    pub fn frame(&mut self, sec: u32, usec: u32, data: &[u8]) {
        self.truncated_frame(sec, usec, data, data.len() as u32);
    }

    pub fn truncated_frame(&mut self, sec: u32, usec: u32, data: &[u8], original_length: u32) {
        self.buf.extend_from_slice(&sec.to_le_bytes());
        self.buf.extend_from_slice(&usec.to_le_bytes());
        self.buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(&original_length.to_le_bytes());
        self.buf.extend_from_slice(data);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian PCAPNG file: one section, interfaces added in order.
pub struct PcapNgWriter {
    buf: Vec<u8>,
}

impl PcapNgWriter {
    pub fn new() -> Self {
        let mut writer = Self { buf: Vec::new() };
        let mut body = Vec::new();
        body.extend_from_slice(&0x1a2b_3c4du32.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&(-1i64).to_le_bytes());
        writer.block(0x0a0d_0d0a, &body);
        writer
    }

    /// Interface description, with an `if_tsresol` option when given.
    pub fn interface(&mut self, link_type: u16, tsresol: Option<u8>) {
        let mut body = Vec::new();
        body.extend_from_slice(&link_type.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&65535u32.to_le_bytes());
        if let Some(tsresol) = tsresol {
            body.extend_from_slice(&9u16.to_le_bytes());
            body.extend_from_slice(&1u16.to_le_bytes());
            body.extend_from_slice(&[tsresol, 0, 0, 0]);
            body.extend_from_slice(&[0u8; 4]);
        }
        self.block(1, &body);
    }

    /// Enhanced packet with a raw timestamp in interface units.
    pub fn packet(&mut self, interface: u32, ticks: u64, data: &[u8]) {
        let mut body = Vec::new();
        body.extend_from_slice(&interface.to_le_bytes());
        body.extend_from_slice(&((ticks >> 32) as u32).to_le_bytes());
        body.extend_from_slice(&(ticks as u32).to_le_bytes());
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
        body.resize(body.len().next_multiple_of(4), 0);
        self.block(6, &body);
    }

    fn block(&mut self, block_type: u32, body: &[u8]) {
        let total = (body.len() + 12) as u32;
        self.buf.extend_from_slice(&block_type.to_le_bytes());
        self.buf.extend_from_slice(&total.to_le_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(&total.to_le_bytes());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
