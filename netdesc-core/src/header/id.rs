//! Header identifiers.
//!
//! A [`HeaderId`] is a `u32` with three fixed fields:
//!
//! ```text
//!  31                     11 10     6 5       0
//! +-------------------------+--------+---------+
//! |   class bitmask (21)    | pack(5)| proto(6)|
//! +-------------------------+--------+---------+
//! ```
//!
//! The low 11 bits (pack + protocol ordinal) are the compact header id used to
//! index dense tables. The class bitmask is what the presence bitmask of a
//! descriptor is built from.

use std::fmt;

/// Bits used by the protocol ordinal.
pub const PROTOCOL_BITS: u32 = 6;
/// Bits used by the pack ordinal.
pub const PACK_BITS: u32 = 5;
/// Bits available for the class bitmask.
pub const CLASS_BITS: u32 = 21;

/// Number of protocol ordinals within one pack.
pub const MAX_PROTOCOLS: usize = 1 << PROTOCOL_BITS;
/// Number of pack ordinals.
pub const MAX_PACKS: usize = 1 << PACK_BITS;

const PROTOCOL_MASK: u32 = (1 << PROTOCOL_BITS) - 1;
const PACK_SHIFT: u32 = PROTOCOL_BITS;
const PACK_MASK: u32 = (1 << PACK_BITS) - 1;
const ORDINAL_MASK: u32 = (1 << (PROTOCOL_BITS + PACK_BITS)) - 1;
const CLASS_SHIFT: u32 = PROTOCOL_BITS + PACK_BITS;

/// Mask of the class bits a header id or presence bitmask may carry.
pub const CLASS_MASK: u32 = (1 << CLASS_BITS) - 1;

/// Protocol families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Pack {
    /// Synthetic headers (frame, payload).
    Core = 0,
    /// Link layer.
    Lan = 1,
    /// Network and transport layer.
    TcpIp = 2,
    /// Reserved for option/extension records.
    Options = 31,
}

impl Pack {
    /// Convert a pack ordinal to a known pack.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Pack::Core),
            1 => Some(Pack::Lan),
            2 => Some(Pack::TcpIp),
            31 => Some(Pack::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pack::Core => "core",
            Pack::Lan => "lan",
            Pack::TcpIp => "tcpip",
            Pack::Options => "options",
        }
    }
}

/// Class bits assigned to well-known headers.
pub mod class {
    pub const ETHERNET: u32 = 1 << 0;
    pub const VLAN: u32 = 1 << 1;
    pub const LLC: u32 = 1 << 2;
    pub const SNAP: u32 = 1 << 3;
    pub const IPV4: u32 = 1 << 4;
    pub const IPV6: u32 = 1 << 5;
    pub const ARP: u32 = 1 << 6;
    pub const ICMP: u32 = 1 << 7;
    pub const ICMPV6: u32 = 1 << 8;
    pub const TCP: u32 = 1 << 9;
    pub const UDP: u32 = 1 << 10;
    pub const GRE: u32 = 1 << 11;
}

/// Identifier of a protocol header: pack ordinal, protocol ordinal and class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HeaderId(u32);

impl HeaderId {
    /// Header id without a class (never fast-rejected).
    pub const fn new(pack: u8, protocol: u8) -> Self {
        Self::with_class(pack, protocol, 0)
    }

    /// Header id carrying a class bitmask.
    pub const fn with_class(pack: u8, protocol: u8, class_mask: u32) -> Self {
        Self(
            ((class_mask & CLASS_MASK) << CLASS_SHIFT)
                | ((pack as u32 & PACK_MASK) << PACK_SHIFT)
                | (protocol as u32 & PROTOCOL_MASK),
        )
    }

    /// Rebuild an id from its raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Rebuild an id from a compact ordinal. The class is looked up from the
    /// well-known table, so unknown ordinals come back classless.
    pub fn from_ordinal(ordinal: u16) -> Self {
        let ordinal = ordinal as u32 & ORDINAL_MASK;
        KNOWN
            .iter()
            .copied()
            .find(|id| id.0 & ORDINAL_MASK == ordinal)
            .unwrap_or(Self(ordinal))
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn pack(self) -> u8 {
        ((self.0 >> PACK_SHIFT) & PACK_MASK) as u8
    }

    #[inline]
    pub const fn protocol(self) -> u8 {
        (self.0 & PROTOCOL_MASK) as u8
    }

    /// Compact id: `pack << 6 | protocol`.
    #[inline]
    pub const fn ordinal(self) -> u16 {
        (self.0 & ORDINAL_MASK) as u16
    }

    #[inline]
    pub const fn class_mask(self) -> u32 {
        self.0 >> CLASS_SHIFT
    }

    /// True when the id carries at least one class bit.
    #[inline]
    pub const fn has_class(self) -> bool {
        self.class_mask() != 0
    }

    /// Same pack and protocol ordinal, ignoring class bits.
    #[inline]
    pub const fn matches(self, other: HeaderId) -> bool {
        self.ordinal() == other.ordinal()
    }

    #[inline]
    pub const fn is_options(self) -> bool {
        self.pack() == Pack::Options as u8
    }

    #[inline]
    pub const fn is_frame(self) -> bool {
        self.matches(ids::FRAME)
    }

    #[inline]
    pub const fn is_payload(self) -> bool {
        self.matches(ids::PAYLOAD)
    }

    /// Display name, `"unknown"` for ordinals outside the well-known table.
    pub fn name(self) -> &'static str {
        let ordinal = self.ordinal();
        KNOWN
            .iter()
            .position(|id| id.ordinal() == ordinal)
            .map(|i| NAMES[i])
            .unwrap_or("unknown")
    }

    /// Look up a well-known id by display name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| KNOWN[i])
    }
}

impl fmt::Debug for HeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HeaderId({} {}:{} class={:#x})",
            self.name(),
            self.pack(),
            self.protocol(),
            self.class_mask()
        )
    }
}

impl fmt::Display for HeaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Well-known header ids.
pub mod ids {
    use super::{class, HeaderId, Pack};

    const CORE: u8 = Pack::Core as u8;
    const LAN: u8 = Pack::Lan as u8;
    const TCPIP: u8 = Pack::TcpIp as u8;
    const OPTIONS: u8 = Pack::Options as u8;

    /// Whole captured frame.
    pub const FRAME: HeaderId = HeaderId::new(CORE, 0);
    /// Bytes after the last identified header.
    pub const PAYLOAD: HeaderId = HeaderId::new(CORE, 1);

    pub const ETHERNET: HeaderId = HeaderId::with_class(LAN, 0, class::ETHERNET);
    pub const VLAN: HeaderId = HeaderId::with_class(LAN, 1, class::VLAN);
    pub const LLC: HeaderId = HeaderId::with_class(LAN, 2, class::LLC);
    pub const SNAP: HeaderId = HeaderId::with_class(LAN, 3, class::SNAP);

    pub const IPV4: HeaderId = HeaderId::with_class(TCPIP, 0, class::IPV4);
    pub const IPV6: HeaderId = HeaderId::with_class(TCPIP, 1, class::IPV6);
    pub const ARP: HeaderId = HeaderId::with_class(TCPIP, 2, class::ARP);
    pub const ICMP: HeaderId = HeaderId::with_class(TCPIP, 3, class::ICMP);
    pub const ICMPV6: HeaderId = HeaderId::with_class(TCPIP, 4, class::ICMPV6);
    pub const TCP: HeaderId = HeaderId::with_class(TCPIP, 5, class::TCP);
    pub const UDP: HeaderId = HeaderId::with_class(TCPIP, 6, class::UDP);
    pub const GRE: HeaderId = HeaderId::with_class(TCPIP, 7, class::GRE);

    // TCP options: ordinal == option kind.
    pub const TCP_OPT_EOL: HeaderId = HeaderId::new(OPTIONS, 0);
    pub const TCP_OPT_NOP: HeaderId = HeaderId::new(OPTIONS, 1);
    pub const TCP_OPT_MSS: HeaderId = HeaderId::new(OPTIONS, 2);
    pub const TCP_OPT_WINDOW_SCALE: HeaderId = HeaderId::new(OPTIONS, 3);
    pub const TCP_OPT_SACK_PERMITTED: HeaderId = HeaderId::new(OPTIONS, 4);
    pub const TCP_OPT_SACK: HeaderId = HeaderId::new(OPTIONS, 5);
    pub const TCP_OPT_TIMESTAMP: HeaderId = HeaderId::new(OPTIONS, 8);

    // IPv4 options.
    pub const IP_OPT_EOL: HeaderId = HeaderId::new(OPTIONS, 16);
    pub const IP_OPT_NOP: HeaderId = HeaderId::new(OPTIONS, 17);
    pub const IP_OPT_SECURITY: HeaderId = HeaderId::new(OPTIONS, 18);
    pub const IP_OPT_LSRR: HeaderId = HeaderId::new(OPTIONS, 19);
    pub const IP_OPT_TIMESTAMP: HeaderId = HeaderId::new(OPTIONS, 20);
    pub const IP_OPT_RECORD_ROUTE: HeaderId = HeaderId::new(OPTIONS, 23);
    pub const IP_OPT_SSRR: HeaderId = HeaderId::new(OPTIONS, 25);
    pub const IP_OPT_ROUTER_ALERT: HeaderId = HeaderId::new(OPTIONS, 36);

    // IPv6 extension headers.
    pub const IPV6_HOP_BY_HOP: HeaderId = HeaderId::new(OPTIONS, 48);
    pub const IPV6_ROUTING: HeaderId = HeaderId::new(OPTIONS, 49);
    pub const IPV6_FRAGMENT: HeaderId = HeaderId::new(OPTIONS, 50);
    pub const IPV6_DEST_OPTIONS: HeaderId = HeaderId::new(OPTIONS, 51);
    pub const IPV6_AUTH: HeaderId = HeaderId::new(OPTIONS, 52);
}

/// Every well-known id, parallel to [`NAMES`].
pub const KNOWN: &[HeaderId] = &[
    ids::FRAME,
    ids::PAYLOAD,
    ids::ETHERNET,
    ids::VLAN,
    ids::LLC,
    ids::SNAP,
    ids::IPV4,
    ids::IPV6,
    ids::ARP,
    ids::ICMP,
    ids::ICMPV6,
    ids::TCP,
    ids::UDP,
    ids::GRE,
    ids::TCP_OPT_EOL,
    ids::TCP_OPT_NOP,
    ids::TCP_OPT_MSS,
    ids::TCP_OPT_WINDOW_SCALE,
    ids::TCP_OPT_SACK_PERMITTED,
    ids::TCP_OPT_SACK,
    ids::TCP_OPT_TIMESTAMP,
    ids::IP_OPT_EOL,
    ids::IP_OPT_NOP,
    ids::IP_OPT_SECURITY,
    ids::IP_OPT_LSRR,
    ids::IP_OPT_TIMESTAMP,
    ids::IP_OPT_RECORD_ROUTE,
    ids::IP_OPT_SSRR,
    ids::IP_OPT_ROUTER_ALERT,
    ids::IPV6_HOP_BY_HOP,
    ids::IPV6_ROUTING,
    ids::IPV6_FRAGMENT,
    ids::IPV6_DEST_OPTIONS,
    ids::IPV6_AUTH,
];

const NAMES: &[&str] = &[
    "frame",
    "payload",
    "ethernet",
    "vlan",
    "llc",
    "snap",
    "ipv4",
    "ipv6",
    "arp",
    "icmp",
    "icmpv6",
    "tcp",
    "udp",
    "gre",
    "tcp.eol",
    "tcp.nop",
    "tcp.mss",
    "tcp.window_scale",
    "tcp.sack_permitted",
    "tcp.sack",
    "tcp.timestamp",
    "ipv4.eol",
    "ipv4.nop",
    "ipv4.security",
    "ipv4.lsrr",
    "ipv4.timestamp",
    "ipv4.record_route",
    "ipv4.ssrr",
    "ipv4.router_alert",
    "ipv6.hop_by_hop",
    "ipv6.routing",
    "ipv6.fragment",
    "ipv6.dest_options",
    "ipv6.auth",
];

/// TCP option kind to options-pack id.
pub fn tcp_option(kind: u8) -> HeaderId {
    HeaderId::new(Pack::Options as u8, kind.min(15))
}

/// IPv4 option type to options-pack id (keyed on the 5-bit option number).
pub fn ipv4_option(option_type: u8) -> HeaderId {
    HeaderId::new(Pack::Options as u8, 16 + (option_type & 0x1f))
}
