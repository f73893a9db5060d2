//! Reference dissector.
//!
//! Walks an Ethernet frame once with etherparse and records every header it
//! recognises in a Type2 descriptor: Ethernet, 802.1Q/802.1ad tags, LLC/SNAP,
//! ARP, IPv4 (with options), IPv6 (with extension headers), TCP (with
//! options), UDP, ICMP, ICMPv6 and GRE. Tunnels (GRE, IP-in-IP) recurse, so
//! inner headers are found at depth 1 and beyond.
//!
//! Fragments also get an IPF descriptor to chain after the packet descriptor.
//! Dissection never fails: once the frame stops parsing, or the descriptor is
//! full, the remaining bytes are payload.

use bytes::Bytes;
use etherparse::{
    EtherType, Ethernet2HeaderSlice, Icmpv4Slice, Icmpv6Slice, IpNumber, Ipv4HeaderSlice,
    Ipv6HeaderSlice, SingleVlanHeaderSlice, TcpHeaderSlice, UdpHeaderSlice,
};

use netdesc_core::descriptor::{ipf_flags, L2FrameType};
use netdesc_core::header::id::{ipv4_option, tcp_option};
use netdesc_core::prelude::*;
use netdesc_core::IpfBuilder;

use crate::capture::{CapturedFrame, LINKTYPE_ETHERNET};

/// GRE protocol type for bridged Ethernet.
const TRANSPARENT_ETHERNET_BRIDGING: u16 = 0x6558;

/// Descriptor bytes produced for one frame.
#[derive(Debug, Clone)]
pub struct Dissection {
    /// Frame bytes, clipped to what a descriptor can describe.
    pub data: Bytes,
    /// Layout of `descriptor`.
    pub descriptor_type: DescriptorType,
    /// Packet descriptor bytes.
    pub descriptor: Bytes,
    /// IPF descriptor bytes when the frame carries an IP fragment.
    pub fragment: Option<Bytes>,
}

impl Dissection {
    /// Bind the frame into `packet` and chain the fragment descriptor, if any.
    pub fn bind_into(&self, packet: &mut Packet) -> netdesc_core::Result<()> {
        packet.bind(self.data.clone(), self.descriptor.clone())?;
        if let Some(fragment) = &self.fragment {
            packet.attach_bytes(DescriptorType::Ipf, fragment.clone())?;
        }
        Ok(())
    }
}

/// Produces descriptors for captured frames.
#[derive(Debug, Clone, Copy)]
pub struct Dissector {
    descriptor_type: DescriptorType,
}

impl Dissector {
    /// Create a dissector emitting `descriptor_type` (Type2 or Pcap).
    pub fn new(descriptor_type: DescriptorType) -> Self {
        Self { descriptor_type }
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    /// Dissect one frame.
    pub fn dissect(&self, frame: &CapturedFrame) -> Dissection {
        let capture_length = frame.data.len().min(usize::from(u16::MAX));
        let data = frame.data.slice(..capture_length);
        let wire_length = clamp_u16(frame.original_length as usize);
        let timestamp = u64::try_from(frame.timestamp_us).unwrap_or(0);

        if self.descriptor_type == DescriptorType::Pcap {
            let descriptor = PcapBuilder::new(capture_length as u16)
                .wire_length(wire_length)
                .timestamp(timestamp)
                .link_type(frame.link_type)
                .build();
            return Dissection {
                data,
                descriptor_type: DescriptorType::Pcap,
                descriptor,
                fragment: None,
            };
        }

        let mut walk = Walk::new(&data);
        if frame.link_type == LINKTYPE_ETHERNET {
            walk.ethernet(0);
        } else {
            tracing::debug!(
                frame = frame.frame_number,
                link_type = frame.link_type,
                "link type not dissected"
            );
        }

        let descriptor = walk
            .builder
            .wire_length(wire_length)
            .timestamp(timestamp)
            .l2_frame_type(walk.frame_type)
            .build();
        tracing::trace!(frame = frame.frame_number, len = descriptor.len(), "dissected");
        let fragment = walk.fragment;

        Dissection {
            data,
            descriptor_type: DescriptorType::Type2,
            descriptor,
            fragment,
        }
    }
}

impl Default for Dissector {
    fn default() -> Self {
        Self::new(DescriptorType::Type2)
    }
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// One pass over a frame.
struct Walk<'a> {
    data: &'a [u8],
    builder: Type2Builder,
    frame_type: L2FrameType,
    fragment: Option<Bytes>,
    full: bool,
}

impl<'a> Walk<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            builder: Type2Builder::new(clamp_u16(data.len())),
            frame_type: L2FrameType::Other,
            fragment: None,
            full: false,
        }
    }

    fn rest(&self, offset: usize) -> &'a [u8] {
        self.data.get(offset..).unwrap_or(&[])
    }

    /// Push a record; false once the descriptor cannot take more.
    fn record(&mut self, id: HeaderId, offset: usize, length: usize) -> bool {
        if self.full {
            return false;
        }
        match self.builder.push(id, offset, length) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(header = id.name(), error = %err, "record dropped");
                self.full = true;
                false
            }
        }
    }

    fn ethernet(&mut self, offset: usize) {
        let Ok(eth) = Ethernet2HeaderSlice::from_slice(self.rest(offset)) else {
            return;
        };
        let len = eth.slice().len();
        if !self.record(ids::ETHERNET, offset, len) {
            return;
        }
        let ether_type = eth.ether_type();
        // Values below 0x0600 are an 802.3 length field.
        if ether_type.0 < 0x0600 {
            self.llc(offset + len);
        } else {
            self.frame_type = L2FrameType::Ether;
            self.ether_type(ether_type, offset + len);
        }
    }

    fn llc(&mut self, offset: usize) {
        let rest = self.rest(offset);
        if rest.len() < 3 {
            return;
        }
        self.frame_type = L2FrameType::Llc;
        if !self.record(ids::LLC, offset, 3) {
            return;
        }
        if rest[0] == 0xaa && rest[1] == 0xaa && rest.len() >= 8 {
            self.frame_type = L2FrameType::Snap;
            if !self.record(ids::SNAP, offset + 3, 5) {
                return;
            }
            let ether_type = EtherType(u16::from_be_bytes([rest[6], rest[7]]));
            self.ether_type(ether_type, offset + 8);
        }
    }

    fn ether_type(&mut self, ether_type: EtherType, offset: usize) {
        match ether_type {
            EtherType::IPV4 => self.ipv4(offset),
            EtherType::IPV6 => self.ipv6(offset),
            EtherType::ARP => self.arp(offset),
            EtherType::VLAN_TAGGED_FRAME
            | EtherType::PROVIDER_BRIDGING
            | EtherType::VLAN_DOUBLE_TAGGED_FRAME => self.vlan(offset),
            _ => {}
        }
    }

    fn vlan(&mut self, offset: usize) {
        let Ok(vlan) = SingleVlanHeaderSlice::from_slice(self.rest(offset)) else {
            return;
        };
        let len = vlan.slice().len();
        if self.record(ids::VLAN, offset, len) {
            self.ether_type(vlan.ether_type(), offset + len);
        }
    }

    fn arp(&mut self, offset: usize) {
        let rest = self.rest(offset);
        if rest.len() < 8 {
            return;
        }
        let len = 8 + 2 * (usize::from(rest[4]) + usize::from(rest[5]));
        if len <= rest.len() {
            self.record(ids::ARP, offset, len);
        }
    }

    fn ipv4(&mut self, offset: usize) {
        let Ok(ip) = Ipv4HeaderSlice::from_slice(self.rest(offset)) else {
            return;
        };
        let len = ip.slice().len();
        if !self.record(ids::IPV4, offset, len) {
            return;
        }
        self.options(offset + 20, ip.options(), ipv4_option);

        let fragment_offset = ip.fragments_offset().value() * 8;
        let more_fragments = ip.more_fragments();
        if more_fragments || fragment_offset != 0 {
            let data_offset = offset + len;
            let data_length = usize::from(ip.total_len())
                .saturating_sub(len)
                .min(self.rest(data_offset).len());
            let flags = if more_fragments {
                ipf_flags::MORE_FRAGMENTS
            } else {
                ipf_flags::LAST_FRAGMENT
            };
            self.fragment = Some(
                IpfBuilder::new()
                    .identification(u32::from(ip.identification()))
                    .fragment_offset(fragment_offset)
                    .flags(flags)
                    .ip_version(4)
                    .data(clamp_u16(data_offset), clamp_u16(data_length))
                    .build(),
            );
            // Only the first fragment carries the next header.
            if fragment_offset != 0 {
                return;
            }
        }

        self.transport(ip.protocol(), offset + len);
    }

    fn ipv6(&mut self, offset: usize) {
        let Ok(ip) = Ipv6HeaderSlice::from_slice(self.rest(offset)) else {
            return;
        };
        let len = ip.slice().len();
        if !self.record(ids::IPV6, offset, len) {
            return;
        }

        let mut next = ip.next_header();
        let mut cursor = offset + len;
        loop {
            let rest = self.rest(cursor);
            if rest.len() < 8 {
                break;
            }
            let (id, ext_len) = match next {
                IpNumber::IPV6_HEADER_HOP_BY_HOP => {
                    (ids::IPV6_HOP_BY_HOP, (usize::from(rest[1]) + 1) * 8)
                }
                IpNumber::IPV6_ROUTE_HEADER => (ids::IPV6_ROUTING, (usize::from(rest[1]) + 1) * 8),
                IpNumber::IPV6_DESTINATION_OPTIONS => {
                    (ids::IPV6_DEST_OPTIONS, (usize::from(rest[1]) + 1) * 8)
                }
                IpNumber::IPV6_FRAGMENTATION_HEADER => (ids::IPV6_FRAGMENT, 8),
                IpNumber::AUTHENTICATION_HEADER => (ids::IPV6_AUTH, (usize::from(rest[1]) + 2) * 4),
                _ => break,
            };
            if ext_len > rest.len() || !self.record(id, cursor, ext_len) {
                return;
            }

            if id == ids::IPV6_FRAGMENT {
                let field = u16::from_be_bytes([rest[2], rest[3]]);
                let fragment_offset = (field >> 3) * 8;
                let more_fragments = field & 1 != 0;
                let data_offset = cursor + ext_len;
                let flags = if more_fragments {
                    ipf_flags::MORE_FRAGMENTS
                } else {
                    ipf_flags::LAST_FRAGMENT
                };
                self.fragment = Some(
                    IpfBuilder::new()
                        .identification(u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]))
                        .fragment_offset(fragment_offset)
                        .flags(flags)
                        .ip_version(6)
                        .data(
                            clamp_u16(data_offset),
                            clamp_u16(self.rest(data_offset).len()),
                        )
                        .build(),
                );
                if fragment_offset != 0 {
                    return;
                }
            }

            next = IpNumber(rest[0]);
            cursor += ext_len;
        }

        self.transport(next, cursor);
    }

    fn transport(&mut self, protocol: IpNumber, offset: usize) {
        match protocol {
            IpNumber::TCP => self.tcp(offset),
            IpNumber::UDP => self.udp(offset),
            IpNumber::ICMP => self.icmp(offset),
            IpNumber::IPV6_ICMP => self.icmpv6(offset),
            IpNumber::GRE => self.gre(offset),
            IpNumber::IPV4 => self.ipv4(offset),
            IpNumber::IPV6 => self.ipv6(offset),
            _ => {}
        }
    }

    fn tcp(&mut self, offset: usize) {
        let Ok(tcp) = TcpHeaderSlice::from_slice(self.rest(offset)) else {
            return;
        };
        if self.record(ids::TCP, offset, tcp.slice().len()) {
            self.options(offset + 20, tcp.options(), tcp_option);
        }
    }

    fn udp(&mut self, offset: usize) {
        if let Ok(udp) = UdpHeaderSlice::from_slice(self.rest(offset)) {
            self.record(ids::UDP, offset, udp.slice().len());
        }
    }

    fn icmp(&mut self, offset: usize) {
        if let Ok(icmp) = Icmpv4Slice::from_slice(self.rest(offset)) {
            self.record(ids::ICMP, offset, icmp.header_len());
        }
    }

    fn icmpv6(&mut self, offset: usize) {
        if let Ok(icmp) = Icmpv6Slice::from_slice(self.rest(offset)) {
            self.record(ids::ICMPV6, offset, icmp.header_len());
        }
    }

    fn gre(&mut self, offset: usize) {
        let rest = self.rest(offset);
        if rest.len() < 4 {
            return;
        }
        let flags = u16::from_be_bytes([rest[0], rest[1]]);
        let protocol = u16::from_be_bytes([rest[2], rest[3]]);
        // Checksum, key and sequence number each add 4 bytes.
        let len = [0x8000, 0x2000, 0x1000]
            .iter()
            .filter(|&&bit| flags & bit != 0)
            .fold(4, |len, _| len + 4);
        if len > rest.len() || !self.record(ids::GRE, offset, len) {
            return;
        }
        if protocol == TRANSPARENT_ETHERNET_BRIDGING {
            self.ethernet(offset + len);
        } else {
            self.ether_type(EtherType(protocol), offset + len);
        }
    }

    /// Record TCP or IPv4 options. A run of NOPs is one record; EOL takes
    /// the rest of the option space.
    fn options(&mut self, start: usize, bytes: &[u8], id_of: fn(u8) -> HeaderId) {
        let mut pos = 0;
        while pos < bytes.len() {
            let kind = bytes[pos];
            let len = match kind {
                0 => bytes.len() - pos,
                1 => bytes[pos..].iter().take_while(|&&b| b == 1).count(),
                _ => match bytes.get(pos + 1) {
                    Some(&len) if len >= 2 && pos + usize::from(len) <= bytes.len() => {
                        usize::from(len)
                    }
                    _ => return,
                },
            };
            if !self.record(id_of(kind), start + pos, len) || kind == 0 {
                return;
            }
            pos += len;
        }
    }
}
