//! Per-frame inspection: dissect, bind, and summarise the header index.

use netdesc_core::prelude::*;

use crate::capture::CapturedFrame;
use crate::dissect::Dissector;
use crate::error::Result;

/// Deepest tunnel level reported for a selected header.
const MAX_DEPTH: usize = 16;

/// Bytes of a selected header rendered as hex.
const HEX_PREVIEW: usize = 16;

/// One header record as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
}

/// An occurrence of the selected header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedHeader {
    pub depth: usize,
    pub offset: usize,
    pub length: usize,
    /// Leading header bytes as hex.
    pub preview: String,
}

/// Fragment metadata from a chained IPF descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentInfo {
    pub identification: u32,
    pub offset: u16,
    pub more: bool,
}

/// Everything reported for one frame.
#[derive(Debug, Clone)]
pub struct FrameRow {
    pub frame: u64,
    pub timestamp: Option<String>,
    pub descriptor: DescriptorType,
    pub capture_length: usize,
    pub wire_length: usize,
    pub headers: Vec<HeaderEntry>,
    pub payload: Option<(usize, usize)>,
    pub fragment: Option<FragmentInfo>,
    pub selected: Vec<SelectedHeader>,
}

/// Reuses one [`Packet`] across all frames of a capture.
pub struct Inspector {
    dissector: Dissector,
    packet: Packet,
    filter: Option<HeaderId>,
    frames: u64,
    shown: u64,
}

impl Inspector {
    pub fn new(dissector: Dissector, filter: Option<HeaderId>) -> Result<Self> {
        let config = PacketConfig::new().descriptor_type(dissector.descriptor_type());
        Ok(Self {
            dissector,
            packet: Packet::with_config(config)?,
            filter,
            frames: 0,
            shown: 0,
        })
    }

    /// Inspect one frame. Frames without the filtered header yield `None`.
    pub fn inspect(&mut self, frame: &CapturedFrame) -> Result<Option<FrameRow>> {
        self.frames += 1;
        let dissection = self.dissector.dissect(frame);
        dissection.bind_into(&mut self.packet)?;
        tracing::trace!(frame = frame.frame_number, packet = %self.packet, "bound");

        let selected = match self.filter {
            Some(id) => {
                let selected = self.select(id)?;
                if selected.is_empty() {
                    return Ok(None);
                }
                selected
            }
            None => Vec::new(),
        };

        self.shown += 1;
        let packet = &self.packet;
        Ok(Some(FrameRow {
            frame: frame.frame_number,
            timestamp: packet.timestamp_utc().map(|ts| ts.to_rfc3339()),
            descriptor: packet.descriptor().descriptor_type(),
            capture_length: packet.capture_length(),
            wire_length: packet.wire_length(),
            headers: packet
                .list_headers()
                .iter()
                .map(|record| HeaderEntry {
                    name: record.id().name(),
                    offset: record.offset(),
                    length: record.length(),
                })
                .collect(),
            payload: packet
                .locate(ids::PAYLOAD, 0)
                .map(|payload| (payload.offset, payload.length)),
            fragment: packet
                .descriptor_of(DescriptorType::Ipf)
                .and_then(Descriptor::as_ipf)
                .map(|ipf| FragmentInfo {
                    identification: ipf.identification(),
                    offset: ipf.fragment_offset(),
                    more: ipf.more_fragments(),
                }),
            selected,
        }))
    }

    /// Bind the cached view for every depth of `id` present in the frame.
    fn select(&mut self, id: HeaderId) -> Result<Vec<SelectedHeader>> {
        let mut selected = Vec::new();
        for depth in 0..MAX_DEPTH {
            let Some(view) = self.packet.header(id, depth)? else {
                break;
            };
            if let (Some(located), Some(data)) = (view.located(), view.data()) {
                selected.push(SelectedHeader {
                    depth,
                    offset: located.offset,
                    length: located.length,
                    preview: hex(&data[..data.len().min(HEX_PREVIEW)]),
                });
            }
            self.packet.release_header(id);
        }
        Ok(selected)
    }

    /// Frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames that produced a row.
    pub fn shown(&self) -> u64 {
        self.shown
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{captured, FrameBuilder};

    fn tcp_frame() -> CapturedFrame {
        captured(
            FrameBuilder::ethernet(0x0800)
                .ipv4(6, &[])
                .tcp(&[])
                .payload(b"data")
                .build(),
        )
    }

    #[test]
    fn test_row_contents() {
        let mut inspector = Inspector::new(Dissector::default(), None).unwrap();
        let row = inspector.inspect(&tcp_frame()).unwrap().unwrap();

        assert_eq!(row.frame, 1);
        assert_eq!(row.descriptor, DescriptorType::Type2);
        assert_eq!(row.capture_length, 58);
        assert_eq!(row.wire_length, 58);
        let names: Vec<_> = row.headers.iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["ethernet", "ipv4", "tcp"]);
        assert_eq!(row.payload, Some((54, 4)));
        assert!(row.fragment.is_none());
        assert!(row.selected.is_empty());
        assert_eq!(
            row.timestamp.as_deref(),
            Some("2023-11-14T22:13:20+00:00")
        );
    }

    #[test]
    fn test_filter_selects_every_depth() {
        let frame = captured(
            FrameBuilder::ethernet(0x0800)
                .ipv4(47, &[])
                .gre(0x0800)
                .ipv4(17, &[])
                .udp()
                .build(),
        );
        let mut inspector = Inspector::new(Dissector::default(), Some(ids::IPV4)).unwrap();
        let row = inspector.inspect(&frame).unwrap().unwrap();

        let depths: Vec<_> = row
            .selected
            .iter()
            .map(|s| (s.depth, s.offset, s.length))
            .collect();
        assert_eq!(depths, vec![(0, 14, 20), (1, 38, 20)]);
        assert!(row.selected[0].preview.starts_with("4500"));
    }

    #[test]
    fn test_filter_skips_frames() {
        let mut inspector = Inspector::new(Dissector::default(), Some(ids::UDP)).unwrap();
        assert!(inspector.inspect(&tcp_frame()).unwrap().is_none());
        assert_eq!(inspector.frames(), 1);
        assert_eq!(inspector.shown(), 0);
    }

    #[test]
    fn test_packet_is_reused() {
        let mut inspector = Inspector::new(Dissector::default(), None).unwrap();
        inspector.inspect(&tcp_frame()).unwrap();

        let arp = captured(FrameBuilder::ethernet(0x0806).arp().build());
        let row = inspector.inspect(&arp).unwrap().unwrap();
        let names: Vec<_> = row.headers.iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["ethernet", "arp"]);
        assert_eq!(row.payload, Some((42, 0)));
    }

    #[test]
    fn test_fragment_info() {
        let frame = captured(
            FrameBuilder::ethernet(0x0800)
                .ipv4_fragment(17, 7, 0, true)
                .udp()
                .payload(&[0u8; 8])
                .build(),
        );
        let mut inspector = Inspector::new(Dissector::default(), None).unwrap();
        let row = inspector.inspect(&frame).unwrap().unwrap();
        assert_eq!(
            row.fragment,
            Some(FragmentInfo {
                identification: 7,
                offset: 0,
                more: true
            })
        );
        // First fragment still carries the transport header.
        assert!(row.headers.iter().any(|h| h.name == "udp"));
    }
}
