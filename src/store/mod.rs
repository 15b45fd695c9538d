//! The stream store collaborator seam
//!
//! The engine runs against an append-only keyed stream primitive it does not
//! own: every read and write goes through the [`SeriesStore`] trait. The
//! trait mirrors exactly the operations the engine needs - ordered inclusive
//! scans with an optional count cap, reverse scans, point lookup, append with
//! an explicit id, bulk delete, length, trim-by-length and a metadata probe -
//! plus one hash-field writer used by the hash sink of `copy`.
//!
//! All calls are synchronous: a command executes as one atomic scripted
//! transaction at the collaborator level, with no suspension points inside
//! the engine.
//!
//! [`memory::MemoryStore`] is the reference implementation backing the test
//! suite and direct embedding.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{Entry, EntryId};

/// Metadata snapshot of one stream, as returned by [`SeriesStore::describe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Number of entries currently stored
    pub length: u64,
    /// Lowest id present
    pub first: EntryId,
    /// Highest id present
    pub last: EntryId,
}

/// Core trait for the append-only keyed stream collaborator
pub trait SeriesStore {
    /// Append one entry with an explicit id.
    ///
    /// Fails with [`StoreError::IdRegression`] when `id` is not strictly
    /// greater than the stream's current maximum id.
    fn append(
        &self,
        key: &str,
        id: EntryId,
        fields: &[(String, String)],
    ) -> Result<(), StoreError>;

    /// Scan entries with ids in `[min, max]` in ascending order, returning at
    /// most `count` entries when a cap is given. A missing key scans empty.
    fn scan(
        &self,
        key: &str,
        min: EntryId,
        max: EntryId,
        count: Option<usize>,
    ) -> Result<Vec<Entry>, StoreError>;

    /// As [`SeriesStore::scan`] but in descending id order (the cap applies
    /// from the newest end).
    fn scan_rev(
        &self,
        key: &str,
        min: EntryId,
        max: EntryId,
        count: Option<usize>,
    ) -> Result<Vec<Entry>, StoreError>;

    /// Point lookup by id.
    ///
    /// Returns every entry stored under exactly `id`; a well-formed stream
    /// yields zero or one. The engine treats more than one as corruption.
    fn lookup(&self, key: &str, id: EntryId) -> Result<Vec<Entry>, StoreError>;

    /// Delete entries by id, returning how many were actually removed
    fn delete(&self, key: &str, ids: &[EntryId]) -> Result<u64, StoreError>;

    /// Number of entries, or `None` when the key is absent
    fn len(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Retain only the newest `keep` entries, returning how many were
    /// removed. `approximate` permits backends with coarse trim granularity
    /// to remove fewer entries than an exact trim would.
    fn trim_to(&self, key: &str, keep: u64, approximate: bool) -> Result<u64, StoreError>;

    /// Metadata probe: length and first/last ids, or `None` when absent
    fn describe(&self, key: &str) -> Result<Option<StreamInfo>, StoreError>;

    /// Write one field of a keyed hash (the `copy` hash sink)
    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
}
