//! Header object cache.
//!
//! Header views are created once per header id and rebound for every packet,
//! so the hot path never allocates. Entries live in dense tables indexed by
//! header ordinal (the parent's, then the extension's), never in a hash map:
//! ordinals are bounded by the header id layout. Entries are retained for the lifetime of the cache; only their
//! in-use marking toggles.

use std::fmt;
use std::sync::Arc;

use crate::header::{GenericHeader, HeaderId, HeaderView, MAX_PACKS, MAX_PROTOCOLS};

/// Creates header views for the cache.
///
/// Implementations must be thread-safe: one factory is shared by every
/// packet cloned from the same origin.
pub trait HeaderFactory: Send + Sync {
    /// Create the view for a plain header.
    fn create(&self, id: HeaderId) -> Box<dyn HeaderView>;

    /// Create the view for an option/extension of `parent`.
    fn create_extension(&self, parent: HeaderId, ext: HeaderId) -> Box<dyn HeaderView> {
        let _ = parent;
        self.create(ext)
    }

    /// Whether [`release`](Self::release) does anything.
    fn supports_release(&self) -> bool {
        false
    }

    /// Called after the cache unbinds a released view.
    fn release(&self, view: &mut dyn HeaderView) {
        let _ = view;
    }
}

/// Factory producing [`GenericHeader`] views for every id.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericHeaderFactory;

impl HeaderFactory for GenericHeaderFactory {
    fn create(&self, id: HeaderId) -> Box<dyn HeaderView> {
        Box::new(GenericHeader::new(id))
    }
}

struct Slot {
    view: Box<dyn HeaderView>,
    in_use: bool,
}

impl Slot {
    fn new(view: Box<dyn HeaderView>) -> Self {
        Self {
            view,
            in_use: false,
        }
    }

    fn view_mut(&mut self) -> &mut dyn HeaderView {
        self.view.as_mut()
    }

    fn acquire(&mut self) -> &mut dyn HeaderView {
        self.in_use = true;
        self.view_mut()
    }

    fn release(&mut self, factory: &dyn HeaderFactory) {
        self.view.unbind();
        self.in_use = false;
        if factory.supports_release() {
            factory.release(self.view.as_mut());
        }
    }
}

type ExtensionTable = Box<[Option<Slot>]>;

/// Dense cache of header views.
pub struct HeaderCache {
    factory: Arc<dyn HeaderFactory>,
    /// Indexed by `pack * MAX_PROTOCOLS + protocol`.
    slots: Vec<Option<Slot>>,
    /// Same outer index as `slots`; inner tables allocated on first use and
    /// indexed the same way by the extension id, so PAYLOAD and an option
    /// sharing its protocol number get distinct slots.
    extensions: Vec<Option<ExtensionTable>>,
    hits: u64,
    misses: u64,
    entries: usize,
}

#[inline]
fn slot_index(id: HeaderId) -> usize {
    id.pack() as usize * MAX_PROTOCOLS + id.protocol() as usize
}

fn empty_table() -> ExtensionTable {
    (0..MAX_PACKS * MAX_PROTOCOLS).map(|_| None).collect()
}

impl HeaderCache {
    pub fn new(factory: Arc<dyn HeaderFactory>) -> Self {
        let size = MAX_PACKS * MAX_PROTOCOLS;
        Self {
            factory,
            slots: (0..size).map(|_| None).collect(),
            extensions: (0..size).map(|_| None).collect(),
            hits: 0,
            misses: 0,
            entries: 0,
        }
    }

    pub fn factory(&self) -> &Arc<dyn HeaderFactory> {
        &self.factory
    }

    /// View for `id`, created on first access, marked in use.
    pub fn get(&mut self, id: HeaderId) -> &mut dyn HeaderView {
        let entry = &mut self.slots[slot_index(id)];
        if entry.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries += 1;
            tracing::trace!(header = %id, "header cache slot created");
        }
        let factory = &self.factory;
        entry
            .get_or_insert_with(|| Slot::new(factory.create(id)))
            .acquire()
    }

    /// View for option/extension `ext` of `parent`, created on first access,
    /// marked in use.
    pub fn get_extension(&mut self, parent: HeaderId, ext: HeaderId) -> &mut dyn HeaderView {
        let table = self.extensions[slot_index(parent)].get_or_insert_with(empty_table);
        let entry = &mut table[slot_index(ext)];
        match entry {
            Some(slot) if slot.view.id().matches(ext) => self.hits += 1,
            Some(slot) => {
                tracing::debug!(
                    header = %parent,
                    extension = %ext,
                    cached = %slot.view.id(),
                    "header cache slot held a different id; recreating"
                );
                self.misses += 1;
                *entry = None;
            }
            None => {
                self.misses += 1;
                self.entries += 1;
                tracing::trace!(header = %parent, extension = %ext, "header cache slot created");
            }
        }
        let factory = &self.factory;
        entry
            .get_or_insert_with(|| Slot::new(factory.create_extension(parent, ext)))
            .acquire()
    }

    /// Existing view for `id`, without touching its marking or the stats.
    pub fn view_mut(&mut self, id: HeaderId) -> Option<&mut dyn HeaderView> {
        self.slots[slot_index(id)]
            .as_mut()
            .map(Slot::view_mut)
    }

    pub fn extension_view_mut(
        &mut self,
        parent: HeaderId,
        ext: HeaderId,
    ) -> Option<&mut dyn HeaderView> {
        self.extensions[slot_index(parent)]
            .as_mut()
            .and_then(|table| table[slot_index(ext)].as_mut())
            .map(Slot::view_mut)
    }

    /// Unbind the view for `id` and mark it free. The entry is kept.
    pub fn release(&mut self, id: HeaderId) {
        if let Some(slot) = self.slots[slot_index(id)].as_mut() {
            slot.release(self.factory.as_ref());
        }
    }

    pub fn release_extension(&mut self, parent: HeaderId, ext: HeaderId) {
        let slot = self.extensions[slot_index(parent)]
            .as_mut()
            .and_then(|table| table[slot_index(ext)].as_mut());
        if let Some(slot) = slot {
            slot.release(self.factory.as_ref());
        }
    }

    /// Release every in-use view.
    pub fn release_all(&mut self) {
        let factory = self.factory.as_ref();
        let plain = self.slots.iter_mut().flatten();
        let ext = self
            .extensions
            .iter_mut()
            .flatten()
            .flat_map(|table| table.iter_mut().flatten());
        for slot in plain.chain(ext).filter(|s| s.in_use) {
            slot.release(factory);
        }
    }

    pub fn is_in_use(&self, id: HeaderId) -> bool {
        self.slots[slot_index(id)]
            .as_ref()
            .is_some_and(|s| s.in_use)
    }

    pub fn is_extension_in_use(&self, parent: HeaderId, ext: HeaderId) -> bool {
        self.extensions[slot_index(parent)]
            .as_ref()
            .and_then(|table| table[slot_index(ext)].as_ref())
            .is_some_and(|s| s.in_use)
    }

    fn in_use(&self) -> usize {
        let plain = self.slots.iter().flatten().filter(|s| s.in_use).count();
        let ext = self
            .extensions
            .iter()
            .flatten()
            .map(|table| table.iter().flatten().filter(|s| s.in_use).count())
            .sum::<usize>();
        plain + ext
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries,
            in_use: self.in_use(),
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::new(Arc::new(GenericHeaderFactory))
    }
}

impl fmt::Debug for HeaderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Cache statistics for monitoring.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served by an existing entry.
    pub hits: u64,
    /// Lookups that created an entry.
    pub misses: u64,
    /// Entries held (plain and extension).
    pub entries: usize,
    /// Entries currently marked in use.
    pub in_use: usize,
}

impl CacheStats {
    /// Calculate the hit ratio (hits / total accesses).
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
