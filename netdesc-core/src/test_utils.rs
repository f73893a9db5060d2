//! Test utilities: frames and the descriptors a dissector would emit for them.

use bytes::Bytes;

use crate::descriptor::Type2Builder;
use crate::header::ids;

/// 74-byte Ethernet/IPv4/TCP frame. The TCP header carries a NOP run and an
/// MSS option (bytes 54..62) followed by 12 payload bytes.
pub fn tcp_frame() -> Bytes {
    let mut frame = Vec::with_capacity(74);

    // Ethernet
    frame.extend_from_slice(&[0xff; 6]);
    frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());

    // IPv4, IHL 5, protocol TCP
    frame.extend_from_slice(&[0x45, 0x00]);
    frame.extend_from_slice(&60u16.to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 64, 6, 0x00, 0x00]);
    frame.extend_from_slice(&[192, 168, 1, 1]);
    frame.extend_from_slice(&[192, 168, 1, 2]);

    // TCP, data offset 7 (20 + 8 bytes of options)
    frame.extend_from_slice(&12345u16.to_be_bytes());
    frame.extend_from_slice(&80u16.to_be_bytes());
    frame.extend_from_slice(&1u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&[0x70, 0x18, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);
    frame.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]);
    frame.extend_from_slice(&[0x02, 0x04, 0x05, 0xb4]);

    frame.extend_from_slice(b"GET / HTTP/1");
    debug_assert_eq!(frame.len(), 74);
    Bytes::from(frame)
}

/// Descriptor for [`tcp_frame`]: Ethernet(0,14), IPv4(14,20), TCP(34,20),
/// optionally followed by NOP(54,4) and MSS(58,4) option records.
pub fn scenario_descriptor(with_options: bool) -> Bytes {
    let mut builder = Type2Builder::new(74);
    builder.push(ids::ETHERNET, 0, 14).unwrap();
    builder.push(ids::IPV4, 14, 20).unwrap();
    builder.push(ids::TCP, 34, 20).unwrap();
    if with_options {
        builder.push(ids::TCP_OPT_NOP, 54, 4).unwrap();
        builder.push(ids::TCP_OPT_MSS, 58, 4).unwrap();
    }
    builder.build()
}
