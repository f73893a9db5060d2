//! Fuzz target for descriptor binding and header lookup.
//!
//! The first byte picks the descriptor layout, the next 160 bytes are the
//! descriptor and the rest is the frame. Binding may reject the input; once
//! bound, every lookup must stay inside the captured bytes and header views
//! must bind without faults.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use netdesc_core::header::KNOWN;
use netdesc_core::prelude::*;

const DESCRIPTOR_BYTES: usize = 160;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let split = rest.len().min(DESCRIPTOR_BYTES);
    let (descriptor, frame) = rest.split_at(split);

    let descriptor_type = if selector & 1 == 0 {
        DescriptorType::Type2
    } else {
        DescriptorType::Pcap
    };
    let config = PacketConfig::new().descriptor_type(descriptor_type);
    let Ok(mut packet) = Packet::with_config(config) else {
        return;
    };
    if packet
        .bind(Bytes::copy_from_slice(frame), Bytes::copy_from_slice(descriptor))
        .is_err()
    {
        assert!(!packet.is_bound());
        return;
    }

    let capture_length = packet.capture_length();
    assert!(capture_length <= frame.len());

    for &id in KNOWN {
        for depth in 0..4 {
            if let Some(located) = packet.locate(id, depth) {
                assert!(located.end() <= capture_length);
                let mut view = GenericHeader::new(id);
                assert!(packet.peek_header(&mut view, depth).is_ok());
            }
        }
        for &ext in KNOWN.iter().filter(|ext| ext.is_options()) {
            if let Some(located) = packet.descriptor().lookup_extension(id, ext, 0, None) {
                assert!(located.end() <= capture_length);
            }
        }
    }

    let _ = packet.to_string();
    let copy = packet.clone();
    assert_eq!(copy.list_headers(), packet.list_headers());
});
