//! Header identifiers, packed records and header views.

pub mod id;
pub mod record;
mod view;

pub use id::{class, ids, HeaderId, Pack, KNOWN, MAX_PACKS, MAX_PROTOCOLS};
pub use record::HeaderRecord;
pub use view::{GenericHeader, HeaderView};
