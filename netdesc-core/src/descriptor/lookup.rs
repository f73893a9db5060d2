//! Record scanning shared by the descriptor layouts.
//!
//! All functions are pure over a record slice and never allocate. Record
//! counts are bounded at 16, so every scan is a short linear walk.

use crate::header::{HeaderId, HeaderRecord};

use super::OptionsRegion;

/// Index of the `depth`-th record (zero-based) matching `id`.
pub fn scan(records: &[HeaderRecord], id: HeaderId, depth: usize) -> Option<usize> {
    let mut remaining = depth;
    for (index, record) in records.iter().enumerate() {
        if !record.matches(id) {
            continue;
        }
        if remaining == 0 {
            return Some(index);
        }
        remaining -= 1;
    }
    None
}

/// Options run directly after the record at `parent`.
pub fn options_run(records: &[HeaderRecord], parent: usize) -> Option<OptionsRegion> {
    let first = parent + 1;
    let count = records
        .get(first..)?
        .iter()
        .take_while(|r| r.is_options())
        .count();
    if count == 0 {
        return None;
    }

    let head = records[first];
    let tail = records[first + count - 1];
    Some(OptionsRegion {
        first_record: first,
        count,
        offset: head.offset(),
        length: tail.end().saturating_sub(head.offset()),
    })
}

/// Index of the option record matching `ext` within the run after `parent`.
/// The scan stops at the first record outside the options pack.
pub fn find_option(records: &[HeaderRecord], parent: usize, ext: HeaderId) -> Option<usize> {
    let first = parent + 1;
    records
        .get(first..)?
        .iter()
        .take_while(|r| r.is_options())
        .position(|r| r.matches(ext))
        .map(|i| first + i)
}
