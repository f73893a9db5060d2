//! Lookup behaviour over descriptors of different shapes.

use bytes::Bytes;

use netdesc_core::header::id::{class, Pack};
use netdesc_core::prelude::*;
use netdesc_core::{DescriptorError, Type2Descriptor};

/// Zero-filled frame of `len` bytes.
fn frame(len: usize) -> Bytes {
    Bytes::from(vec![0u8; len])
}

/// Ethernet(0,14), IPv4(14,20), TCP(34,20) in a 74-byte capture, with the
/// optional NOP(54,4) and MSS(58,4) option records.
fn scenario(with_options: bool) -> Packet {
    let mut builder = Type2Builder::new(74);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 20).unwrap();
    builder.push(ids::TCP, 34, 20).unwrap();
    if with_options {
        builder.push(ids::TCP_OPT_NOP, 54, 4).unwrap();
        builder.push(ids::TCP_OPT_MSS, 58, 4).unwrap();
    }

    let mut packet = Packet::new();
    packet.bind(frame(74), builder.build()).unwrap();
    packet
}

// =============================================================================
// Concrete scenario
// =============================================================================

#[test]
fn test_scenario_tcp_lookup() {
    let packet = scenario(false);
    let mut tcp = GenericHeader::new(ids::TCP);
    let tcp = packet.peek_header(&mut tcp, 0).unwrap().unwrap();
    let loc = tcp.located().unwrap();
    assert_eq!((loc.offset, loc.length), (34, 20));
}

#[test]
fn test_scenario_payload() {
    let packet = scenario(false);
    let mut payload = GenericHeader::new(ids::PAYLOAD);
    let payload = packet.get_header(&mut payload, 0).unwrap();
    let loc = payload.located().unwrap();
    assert_eq!((loc.offset, loc.length), (54, 20));
    assert_eq!(payload.len(), 20);
}

#[test]
fn test_scenario_second_ipv4_missing() {
    let packet = scenario(false);
    assert!(packet.descriptor().lookup_header(ids::IPV4, 1).is_none());

    let mut ipv4 = GenericHeader::new(ids::IPV4);
    let err = packet.get_header(&mut ipv4, 1).unwrap_err();
    assert!(matches!(
        err,
        Error::HeaderNotFound {
            name: "ipv4",
            depth: 1
        }
    ));
    assert_eq!(err.to_string(), "Header not found: ipv4 (depth 1)");
}

#[test]
fn test_scenario_options_chain() {
    let packet = scenario(true);
    let desc = packet.descriptor();

    let mss = desc
        .lookup_extension(ids::TCP, ids::TCP_OPT_MSS, 0, None)
        .unwrap();
    assert_eq!(mss.record_index, Some(4));
    assert_eq!((mss.offset, mss.length), (58, 4));

    // With the parent's index memoized from an earlier lookup.
    let tcp = desc.lookup_header(ids::TCP, 0).unwrap();
    let hinted = desc
        .lookup_extension(ids::TCP, ids::TCP_OPT_MSS, 0, tcp.record_index)
        .unwrap();
    assert_eq!(hinted, mss);

    let mut view = GenericHeader::new(ids::TCP_OPT_MSS);
    let view = packet
        .peek_extension(ids::TCP, &mut view, 0, tcp.record_index)
        .unwrap()
        .unwrap();
    assert_eq!(view.len(), 4);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_records_listed_in_encoding_order() {
    let layout: Vec<(HeaderId, usize, usize)> = vec![
        (ids::ETHERNET, 0, 14),
        (ids::VLAN, 14, 4),
        (ids::VLAN, 18, 4),
        (ids::IPV6, 22, 40),
        (ids::IPV6_HOP_BY_HOP, 62, 8),
        (ids::UDP, 70, 8),
    ];
    let mut builder = Type2Builder::new(100);
    for (id, offset, length) in &layout {
        builder.push(*id, *offset, *length).unwrap();
    }

    let mut packet = Packet::new();
    packet.bind(frame(100), builder.build()).unwrap();

    let listed: Vec<_> = packet
        .list_headers()
        .iter()
        .map(|r| (r.id(), r.offset(), r.length()))
        .collect();
    assert_eq!(listed, layout);
}

#[test]
fn test_sixteen_records_round_trip() {
    let mut builder = Type2Builder::new(16 * 4);
    for i in 0..16 {
        builder.push(ids::VLAN, i * 4, 4).unwrap();
    }
    let bytes = builder.build();
    assert_eq!(bytes.len(), 28 + 16 * 8);

    let mut desc = Type2Descriptor::new();
    desc.bind(bytes).unwrap();
    assert_eq!(desc.record_count(), 16);
    for (i, record) in desc.records().iter().enumerate() {
        assert_eq!(record.id(), ids::VLAN);
        assert_eq!(record.offset(), i * 4);
        assert_eq!(record.length(), 4);
    }
}

#[test]
fn test_depth_disambiguation() {
    // IPv4 in GRE in IPv4, with an options record between the two IPv4s.
    let mut builder = Type2Builder::new(120);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 24).unwrap();
    builder.push(ids::IP_OPT_ROUTER_ALERT, 34, 4).unwrap();
    builder.push(ids::GRE, 38, 4).unwrap();
    builder.push(ids::IPV4, 42, 20).unwrap();
    builder.push(ids::UDP, 62, 8).unwrap();

    let mut packet = Packet::new();
    packet.bind(frame(120), builder.build()).unwrap();

    let outer = packet.locate(ids::IPV4, 0).unwrap();
    let inner = packet.locate(ids::IPV4, 1).unwrap();
    assert_eq!(outer.offset, 14);
    assert_eq!(inner.offset, 42);
    assert!(packet.locate(ids::IPV4, 2).is_none());
    for depth in 2..5 {
        assert!(!packet.has_header(ids::IPV4, depth));
    }

    // The router alert belongs to the outer header only.
    assert!(packet.has_extension(ids::IPV4, ids::IP_OPT_ROUTER_ALERT, 0));
    assert!(!packet.has_extension(ids::IPV4, ids::IP_OPT_ROUTER_ALERT, 1));
}

#[test]
fn test_fast_reject_ignores_colliding_record() {
    // Record with UDP's ordinal but no class bits, and a presence bitmask that
    // never mentions UDP. A plain scan would match it.
    let mut builder = Type2Builder::new(60);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 20).unwrap();
    builder
        .push(HeaderId::new(Pack::TcpIp as u8, ids::UDP.protocol()), 34, 8)
        .unwrap();

    let mut packet = Packet::new();
    packet.bind(frame(60), builder.build()).unwrap();

    assert_eq!(
        packet.descriptor().presence_bitmask(),
        class::ETHERNET | class::IPV4
    );
    assert!(!packet.has_header(ids::UDP, 0));
    assert!(packet.descriptor().lookup_header(ids::UDP, 0).is_none());
}

#[test]
fn test_frame_ignores_records() {
    let packet = scenario(true);
    let frame = packet.locate(ids::FRAME, 0).unwrap();
    assert_eq!((frame.offset, frame.length), (0, 74));
}

#[test]
fn test_payload_without_records_is_whole_capture() {
    let mut packet = Packet::new();
    packet.bind(frame(42), Type2Builder::new(42).build()).unwrap();
    let payload = packet.locate(ids::PAYLOAD, 0).unwrap();
    assert_eq!((payload.offset, payload.length), (0, 42));
}

#[test]
fn test_payload_can_be_empty() {
    let mut builder = Type2Builder::new(42);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::ARP, 14, 28).unwrap();

    let mut packet = Packet::new();
    packet.bind(frame(42), builder.build()).unwrap();
    let payload = packet.locate(ids::PAYLOAD, 0).unwrap();
    assert_eq!((payload.offset, payload.length), (42, 0));
    assert!(packet.has_header(ids::PAYLOAD, 0));
}

#[test]
fn test_options_run_broken_by_header() {
    // TCP options, then a header record, then a stray option record.
    let mut builder = Type2Builder::new(100);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 20).unwrap();
    builder.push(ids::TCP, 34, 20).unwrap();
    builder.push(ids::TCP_OPT_NOP, 54, 1).unwrap();
    builder.push(ids::UDP, 60, 8).unwrap();
    builder.push(ids::TCP_OPT_MSS, 68, 4).unwrap();

    let mut packet = Packet::new();
    packet.bind(frame(100), builder.build()).unwrap();
    let desc = packet.descriptor();

    assert!(desc
        .lookup_extension(ids::TCP, ids::TCP_OPT_NOP, 0, None)
        .is_some());
    assert!(desc
        .lookup_extension(ids::TCP, ids::TCP_OPT_MSS, 0, None)
        .is_none());
    assert!(desc
        .lookup_extension(ids::TCP, ids::TCP_OPT_SACK, 0, None)
        .is_none());
}

fn addr(view: &mut dyn HeaderView) -> *const () {
    view as *mut _ as *const ()
}

#[test]
fn test_cache_identity_across_release() {
    let mut packet = scenario(true);

    let first = addr(packet.require_header(ids::TCP, 0).unwrap());
    let second = addr(packet.require_header(ids::TCP, 0).unwrap());
    assert_eq!(first, second);

    packet.release_header(ids::TCP);
    let third = addr(packet.require_header(ids::TCP, 0).unwrap());
    assert_eq!(first, third);
}

#[test]
fn test_rebinding_reuses_descriptor() {
    let mut packet = scenario(true);
    assert!(packet.has_header(ids::TCP, 0));

    let mut builder = Type2Builder::new(42);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 20).unwrap();
    builder.push(ids::UDP, 34, 8).unwrap();
    packet.bind(frame(42), builder.build()).unwrap();

    assert!(!packet.has_header(ids::TCP, 0));
    assert!(packet.has_header(ids::UDP, 0));
    assert_eq!(packet.locate(ids::PAYLOAD, 0).unwrap().length, 0);
}

#[test]
fn test_invalid_descriptor_bytes() {
    let mut packet = Packet::new();
    let err = packet
        .bind(frame(74), Bytes::from_static(&[0u8; 12]))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Descriptor(DescriptorError::BufferTooShort { needed: 28, .. })
    ));
    assert!(!packet.is_bound());
}
