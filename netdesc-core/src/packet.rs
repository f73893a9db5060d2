//! Packet facade.
//!
//! A [`Packet`] combines the captured bytes, the head packet descriptor (plus
//! any chained auxiliary descriptors) and the header cache. It is allocated
//! once and rebound for every frame:
//!
//! ```rust
//! use netdesc_core::prelude::*;
//! use bytes::Bytes;
//!
//! let frame = Bytes::from(vec![0u8; 60]);
//! let mut builder = Type2Builder::new(60);
//! builder.push(ids::ETHERNET, 0, 14).unwrap();
//! builder.push(ids::ARP, 14, 28).unwrap();
//!
//! let mut packet = Packet::new();
//! packet.bind(frame, builder.build()).unwrap();
//!
//! let mut arp = GenericHeader::new(ids::ARP);
//! let arp = packet.get_header(&mut arp, 0).unwrap();
//! assert_eq!(arp.len(), 28);
//! assert!(!packet.has_header(ids::IPV4, 0));
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

use crate::cache::{GenericHeaderFactory, HeaderCache, HeaderFactory};
use crate::config::PacketConfig;
use crate::descriptor::{
    ChainIter, Descriptor, DescriptorNode, DescriptorType, Located, PacketDescriptor,
};
use crate::error::{DescriptorError, Error, Result};
use crate::header::{HeaderId, HeaderRecord, HeaderView};

/// Captured frame plus its descriptor chain and header cache.
#[derive(Debug)]
pub struct Packet {
    data: Bytes,
    head: DescriptorNode,
    cache: HeaderCache,
    config: PacketConfig,
}

impl Packet {
    /// Unbound packet with a Type2 head descriptor and generic header views.
    pub fn new() -> Self {
        let config = PacketConfig::default();
        Self {
            data: Bytes::new(),
            head: DescriptorNode::new(Descriptor::new(config.descriptor_type)),
            cache: HeaderCache::default(),
            config,
        }
    }

    pub fn with_config(config: PacketConfig) -> Result<Self> {
        Self::with_factory(config, Arc::new(GenericHeaderFactory))
    }

    /// Packet whose cache creates views with `factory`.
    pub fn with_factory(config: PacketConfig, factory: Arc<dyn HeaderFactory>) -> Result<Self> {
        if !config.descriptor_type.is_packet() {
            return Err(DescriptorError::NotPacketDescriptor(config.descriptor_type).into());
        }
        Ok(Self {
            data: Bytes::new(),
            head: DescriptorNode::new(Descriptor::new(config.descriptor_type)),
            cache: HeaderCache::new(factory),
            config,
        })
    }

    pub fn config(&self) -> &PacketConfig {
        &self.config
    }

    /// Bind to a captured frame and its encoded head descriptor. Any previous
    /// binding, including chained descriptors, is released first.
    pub fn bind(&mut self, data: Bytes, descriptor: Bytes) -> Result<()> {
        self.unbind();
        self.head.descriptor_mut().bind(descriptor)?;

        let capture_length = head_descriptor(&self.head).capture_length();
        if capture_length > data.len() {
            self.head.release();
            return Err(DescriptorError::CaptureLengthMismatch {
                capture_length,
                frame_len: data.len(),
            }
            .into());
        }

        tracing::trace!(
            descriptor = %self.head.descriptor_type(),
            capture_length,
            "packet bound"
        );
        self.data = data;
        Ok(())
    }

    /// Release cached views and the whole descriptor chain. The packet can be
    /// rebound afterwards.
    pub fn unbind(&mut self) {
        self.cache.release_all();
        self.head.release();
        self.data = Bytes::new();
    }

    pub fn is_bound(&self) -> bool {
        self.head.descriptor().is_bound()
    }

    /// Captured bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Chain an auxiliary descriptor directly after the head.
    pub fn attach(&mut self, descriptor: Descriptor) {
        self.head.attach(DescriptorNode::new(descriptor));
    }

    /// Bind a fresh descriptor of `descriptor_type` and chain it.
    pub fn attach_bytes(&mut self, descriptor_type: DescriptorType, bytes: Bytes) -> Result<()> {
        let mut descriptor = Descriptor::new(descriptor_type);
        descriptor.bind(bytes)?;
        self.attach(descriptor);
        Ok(())
    }

    /// First descriptor of the given type in the chain, head included.
    pub fn descriptor_of(&self, descriptor_type: DescriptorType) -> Option<&Descriptor> {
        self.head.find(descriptor_type).map(|n| n.descriptor())
    }

    pub fn descriptors(&self) -> ChainIter<'_> {
        self.head.iter()
    }

    /// Head packet descriptor.
    pub fn descriptor(&self) -> &dyn PacketDescriptor {
        head_descriptor(&self.head)
    }

    pub fn cache(&self) -> &HeaderCache {
        &self.cache
    }

    /// Resolve where the `depth`-th `id` lives. Frame and payload are
    /// synthesized here, at depth 0 only.
    pub fn locate(&self, id: HeaderId, depth: usize) -> Option<Located> {
        locate(head_descriptor(&self.head), id, depth)
    }

    pub fn has_header(&self, id: HeaderId, depth: usize) -> bool {
        self.locate(id, depth).is_some()
    }

    pub fn has_extension(&self, parent: HeaderId, ext: HeaderId, depth: usize) -> bool {
        self.descriptor()
            .lookup_extension(parent, ext, depth, None)
            .is_some()
    }

    /// Bind `view` to the `depth`-th occurrence of its header.
    ///
    /// Returns `Ok(None)` when the header is absent. The view is unbound first
    /// either way.
    pub fn peek_header<'v, V>(&self, view: &'v mut V, depth: usize) -> Result<Option<&'v mut V>>
    where
        V: HeaderView + ?Sized,
    {
        view.unbind();
        let Some(located) = self.locate(view.id(), depth) else {
            return Ok(None);
        };
        bind_view(&self.data, self.descriptor(), view, located, true)?;
        Ok(Some(view))
    }

    /// Like [`peek_header`](Self::peek_header), but absence is an error.
    pub fn get_header<'v, V>(&self, view: &'v mut V, depth: usize) -> Result<&'v mut V>
    where
        V: HeaderView + ?Sized,
    {
        let name = view.name();
        self.peek_header(view, depth)?
            .ok_or(Error::HeaderNotFound { name, depth })
    }

    /// Bind `view` to its option/extension of the `depth`-th `parent`.
    ///
    /// `hint` is the parent's record index from an earlier lookup.
    pub fn peek_extension<'v, V>(
        &self,
        parent: HeaderId,
        view: &'v mut V,
        depth: usize,
        hint: Option<usize>,
    ) -> Result<Option<&'v mut V>>
    where
        V: HeaderView + ?Sized,
    {
        view.unbind();
        let desc = self.descriptor();
        let Some(located) = desc.lookup_extension(parent, view.id(), depth, hint) else {
            return Ok(None);
        };
        bind_view(&self.data, desc, view, located, false)?;
        Ok(Some(view))
    }

    pub fn get_extension<'v, V>(
        &self,
        parent: HeaderId,
        view: &'v mut V,
        depth: usize,
    ) -> Result<&'v mut V>
    where
        V: HeaderView + ?Sized,
    {
        let name = view.name();
        self.peek_extension(parent, view, depth, None)?
            .ok_or(Error::HeaderNotFound { name, depth })
    }

    /// Cached view for the `depth`-th `id`, bound and marked in use.
    pub fn header(&mut self, id: HeaderId, depth: usize) -> Result<Option<&mut dyn HeaderView>> {
        let desc = head_descriptor(&self.head);
        let Some(located) = locate(desc, id, depth) else {
            return Ok(None);
        };

        let view = self.cache.get(id);
        view.unbind();
        if let Err(e) = bind_view(&self.data, desc, view, located, true) {
            self.cache.release(id);
            return Err(e);
        }
        Ok(self.cache.view_mut(id))
    }

    /// Cached view for the `depth`-th `id`; absence is an error.
    pub fn require_header(&mut self, id: HeaderId, depth: usize) -> Result<&mut dyn HeaderView> {
        self.header(id, depth)?.ok_or(Error::HeaderNotFound {
            name: id.name(),
            depth,
        })
    }

    /// Cached view for option/extension `ext` of the `depth`-th `parent`.
    pub fn extension(
        &mut self,
        parent: HeaderId,
        ext: HeaderId,
        depth: usize,
    ) -> Result<Option<&mut dyn HeaderView>> {
        let desc = head_descriptor(&self.head);
        let Some(located) = desc.lookup_extension(parent, ext, depth, None) else {
            return Ok(None);
        };

        let view = self.cache.get_extension(parent, ext);
        view.unbind();
        if let Err(e) = bind_view(&self.data, desc, view, located, false) {
            self.cache.release_extension(parent, ext);
            return Err(e);
        }
        Ok(self.cache.extension_view_mut(parent, ext))
    }

    /// Return a cached view to the cache.
    pub fn release_header(&mut self, id: HeaderId) {
        self.cache.release(id);
    }

    pub fn release_extension(&mut self, parent: HeaderId, ext: HeaderId) {
        self.cache.release_extension(parent, ext);
    }

    /// Every record of the head descriptor, in discovery order.
    pub fn list_headers(&self) -> &[HeaderRecord] {
        self.descriptor().records()
    }

    pub fn record_count(&self) -> usize {
        self.descriptor().record_count()
    }

    pub fn capture_length(&self) -> usize {
        self.descriptor().capture_length()
    }

    pub fn wire_length(&self) -> usize {
        self.descriptor().wire_length()
    }

    /// Raw descriptor timestamp, in [`PacketConfig::timestamp_unit`] units.
    pub fn timestamp(&self) -> u64 {
        self.descriptor().timestamp()
    }

    /// Timestamp as UTC time, `None` when it does not fit.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let nanos = self.config.timestamp_unit.to_nanos(self.timestamp())?;
        let nanos = i64::try_from(nanos).ok()?;
        Some(Utc.timestamp_nanos(nanos))
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Packet {
    /// Deep copy: bytes and the whole descriptor chain are duplicated, so the
    /// original can be rebound while the copy is used elsewhere. The copy gets
    /// a fresh cache backed by the same factory.
    fn clone(&self) -> Self {
        Self {
            data: Bytes::copy_from_slice(&self.data),
            head: self.head.clone(),
            cache: HeaderCache::new(Arc::clone(self.cache.factory())),
            config: self.config.clone(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&summarize(self.descriptor()))
    }
}

fn head_descriptor(head: &DescriptorNode) -> &dyn PacketDescriptor {
    match head.descriptor().as_packet() {
        Some(desc) => desc,
        // Construction rejects non-packet head types and the head is never replaced.
        None => unreachable!("packet head is not a packet descriptor"),
    }
}

fn locate(desc: &dyn PacketDescriptor, id: HeaderId, depth: usize) -> Option<Located> {
    if !desc.is_bound() {
        return None;
    }
    let synthetic = |offset: usize| Located {
        offset,
        length: desc.capture_length().saturating_sub(offset),
        record_index: None,
        descriptor_type: desc.descriptor_type(),
    };

    if id.is_frame() {
        return (depth == 0).then(|| synthetic(0));
    }
    if id.is_payload() {
        return (depth == 0).then(|| synthetic(desc.payload_offset()));
    }
    desc.lookup_header(id, depth)
}

/// The single fault boundary: a view that fails to bind after a successful
/// lookup is unbound and the fault is wrapped with a packet summary.
fn bind_view<V>(
    data: &Bytes,
    desc: &dyn PacketDescriptor,
    view: &mut V,
    located: Located,
    with_options: bool,
) -> Result<()>
where
    V: HeaderView + ?Sized,
{
    // An option record never owns the records that follow it.
    let options = located
        .record_index
        .filter(|&index| {
            with_options && desc.records().get(index).is_some_and(|r| !r.is_options())
        })
        .and_then(|index| desc.options_run(index));

    let bound = view.bind(data, located).and_then(|()| match options {
        Some(region) => view.bind_options(data, region),
        None => Ok(()),
    });

    if let Err(source) = bound {
        view.unbind();
        let summary = summarize(desc);
        tracing::warn!(
            header = view.name(),
            error = %source,
            packet = %summary,
            "header binding failed"
        );
        return Err(Error::Binding {
            header: view.name(),
            summary,
            source,
        });
    }
    Ok(())
}

/// One-line rendering: descriptor type, lengths and records.
fn summarize(desc: &dyn PacketDescriptor) -> String {
    let records: Vec<String> = desc.records().iter().map(|r| r.to_string()).collect();
    format!(
        "{} caplen={} wirelen={} records=[{}]",
        desc.descriptor_type(),
        desc.capture_length(),
        desc.wire_length(),
        records.join(", ")
    )
}
