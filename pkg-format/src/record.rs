use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

pub mod constants {
    pub const STORE_BLOB: u8 = 0;
    pub const STORE_CONTENT: u8 = 1;
    pub const STORE_LINKS: u8 = 2;
    pub const STORE_STAT: u8 = 3;
}

use self::constants::*;

/// Tag describing what a range inside a [`VfsEntry`] holds.
///
/// Only `Blob` and `Content` carry readable file bytes. Older pkg releases
/// call the other two kinds directory/file-info, newer ones links/stat; both
/// are treated as opaque metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum StoreKind {
    Blob,
    Content,
    Links,
    Stat,
    Other(u8),
}

impl StoreKind {
    pub const fn id(self) -> u8 {
        match self {
            StoreKind::Blob => STORE_BLOB,
            StoreKind::Content => STORE_CONTENT,
            StoreKind::Links => STORE_LINKS,
            StoreKind::Stat => STORE_STAT,
            StoreKind::Other(id) => id,
        }
    }

    pub const fn from_id(id: u8) -> Self {
        match id {
            STORE_BLOB => StoreKind::Blob,
            STORE_CONTENT => StoreKind::Content,
            STORE_LINKS => StoreKind::Links,
            STORE_STAT => StoreKind::Stat,
            id => StoreKind::Other(id),
        }
    }

    #[inline(always)]
    pub const fn is_content(self) -> bool {
        matches!(self, StoreKind::Blob | StoreKind::Content)
    }
}

impl TryFrom<String> for StoreKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u8>()
            .map(StoreKind::from_id)
            .map_err(|_| format!("invalid store kind `{}`", value))
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Blob => f.write_str("blob"),
            StoreKind::Content => f.write_str("content"),
            StoreKind::Links => f.write_str("links"),
            StoreKind::Stat => f.write_str("stat"),
            StoreKind::Other(id) => write!(f, "other({})", id),
        }
    }
}

/// A `[offset, length]` pair relative to the payload base offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "(u64, u64)")]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub const fn new(offset: u64, length: u64) -> Self {
        ByteRange { offset, length }
    }
}

impl From<(u64, u64)> for ByteRange {
    fn from((offset, length): (u64, u64)) -> Self {
        ByteRange { offset, length }
    }
}

/// One value of the VFS map: the stored ranges of a single path, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct VfsEntry {
    ranges: BTreeMap<StoreKind, ByteRange>,
}

impl VfsEntry {
    #[inline(always)]
    pub fn get(&self, kind: StoreKind) -> Option<ByteRange> {
        self.ranges.get(&kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = StoreKind> + '_ {
        self.ranges.keys().copied()
    }

    /// The range holding file bytes, preferring textual content over the
    /// raw blob. `None` for directories and metadata-only entries.
    pub fn content_range(&self) -> Option<ByteRange> {
        self.get(StoreKind::Content)
            .or_else(|| self.get(StoreKind::Blob))
    }

    #[inline(always)]
    pub fn is_readable(&self) -> bool {
        self.ranges.keys().any(|kind| kind.is_content())
    }
}

impl FromIterator<(StoreKind, ByteRange)> for VfsEntry {
    fn from_iter<T: IntoIterator<Item = (StoreKind, ByteRange)>>(iter: T) -> Self {
        VfsEntry {
            ranges: iter.into_iter().collect(),
        }
    }
}
