//! Header views.
//!
//! A header view is a decoded protocol header bound zero-copy onto a range of
//! the captured frame. Views are long-lived: the header cache owns them and
//! the packet rebinds them for every lookup.

use bytes::Bytes;

use crate::descriptor::{Located, OptionsRegion};
use crate::error::BindFault;

use super::HeaderId;

/// A protocol header view that can be bound onto captured bytes.
pub trait HeaderView: Send {
    /// Id this view decodes.
    fn id(&self) -> HeaderId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Bind onto `located` within `data`. `data` is the whole captured frame.
    fn bind(&mut self, data: &Bytes, located: Located) -> Result<(), BindFault>;

    /// Bind the options run that trails the header. Views without options
    /// ignore it.
    fn bind_options(&mut self, data: &Bytes, options: OptionsRegion) -> Result<(), BindFault> {
        let _ = (data, options);
        Ok(())
    }

    /// Drop the current binding. Idempotent.
    fn unbind(&mut self);

    fn is_bound(&self) -> bool;

    /// Location of the current binding.
    fn located(&self) -> Option<Located>;

    /// Bound header bytes.
    fn data(&self) -> Option<&Bytes> {
        None
    }
}

/// Untyped view exposing the raw header and options bytes.
#[derive(Debug, Clone)]
pub struct GenericHeader {
    id: HeaderId,
    located: Option<Located>,
    bytes: Option<Bytes>,
    options: Option<Bytes>,
    options_region: Option<OptionsRegion>,
}

impl GenericHeader {
    pub fn new(id: HeaderId) -> Self {
        Self {
            id,
            located: None,
            bytes: None,
            options: None,
            options_region: None,
        }
    }

    /// Header bytes, empty when unbound.
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }

    /// Options bytes, empty when the header has no options run.
    pub fn options(&self) -> &[u8] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn options_region(&self) -> Option<OptionsRegion> {
        self.options_region
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

fn slice_checked(data: &Bytes, offset: usize, length: usize) -> Result<Bytes, BindFault> {
    let end = offset + length;
    if end > data.len() {
        return Err(BindFault::OutOfRange {
            offset,
            end,
            len: data.len(),
        });
    }
    Ok(data.slice(offset..end))
}

impl HeaderView for GenericHeader {
    fn id(&self) -> HeaderId {
        self.id
    }

    fn bind(&mut self, data: &Bytes, located: Located) -> Result<(), BindFault> {
        self.bytes = Some(slice_checked(data, located.offset, located.length)?);
        self.located = Some(located);
        Ok(())
    }

    fn bind_options(&mut self, data: &Bytes, options: OptionsRegion) -> Result<(), BindFault> {
        self.options = Some(slice_checked(data, options.offset, options.length)?);
        self.options_region = Some(options);
        Ok(())
    }

    fn unbind(&mut self) {
        self.located = None;
        self.bytes = None;
        self.options = None;
        self.options_region = None;
    }

    fn is_bound(&self) -> bool {
        self.located.is_some()
    }

    fn located(&self) -> Option<Located> {
        self.located
    }

    fn data(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }
}
