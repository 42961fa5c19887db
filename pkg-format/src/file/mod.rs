use std::fs::File;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use memmap2::Mmap;

use crate::{
    compression::Compression,
    link::LinkRules,
    locate::{ExtractionError, MetadataLocator, PreludeLocator},
    path::{PathCodec, PathStyle, ResolveError, SeparatorScheme},
    props::{ParseError, Props},
    record::VfsEntry,
};

mod reader;

pub use self::reader::PayloadReader;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Failed to read packaged binary. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Error while parsing the binary props!")]
    Parse(#[from] ParseError),
}

/// A packaged binary with its decoded prelude.
///
/// Owns the path codec (and with it the growing dictionary) and the symlink
/// rules for the lifetime of one extraction pass.
#[derive(Debug)]
pub struct PkgFile {
    pub(crate) path: PathBuf,
    pub(crate) payload_position: u64,
    pub(crate) vfs: IndexMap<String, VfsEntry>,
    pub(crate) entry_point: String,
    pub(crate) compression: Compression,
    pub(crate) links: LinkRules,
    pub(crate) codec: PathCodec,
}

impl PkgFile {
    /// Opens a packaged binary and decodes its prelude with the default
    /// [`PreludeLocator`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PkgFile, OpenError> {
        PkgFile::open_with(path, &PreludeLocator::new())
    }

    pub fn open_with<P: AsRef<Path>, L: MetadataLocator>(
        path: P,
        locator: &L,
    ) -> Result<PkgFile, OpenError> {
        let path = path.as_ref();
        let read_failed = |e| OpenError::ReadFailed(e, path.to_path_buf());

        let file = File::open(path).map_err(read_failed)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(read_failed)?;

        let raw = locator.locate(&mmap)?;
        let props = Props::parse(raw.fields.as_slice())?;

        Ok(PkgFile::from_props(path, props, raw.payload_position))
    }

    pub fn from_props<P: AsRef<Path>>(path: P, props: Props, payload_position: u64) -> PkgFile {
        let style = PathStyle::detect(&props.entry_point);
        let scheme =
            SeparatorScheme::detect(props.vfs.keys().map(String::as_str), props.compression);
        let codec = PathCodec::new(
            style,
            scheme,
            props.compression.is_enabled(),
            props.files_dict,
        );

        tracing::debug!(?style, ?scheme, payload_position, "opened packaged binary");

        PkgFile {
            path: path.as_ref().to_path_buf(),
            payload_position,
            vfs: props.vfs,
            entry_point: props.entry_point,
            compression: props.compression,
            links: LinkRules::from(props.symlinks),
            codec,
        }
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn payload_position(&self) -> u64 {
        self.payload_position
    }

    #[inline(always)]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    #[inline(always)]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline(always)]
    pub fn vfs(&self) -> &IndexMap<String, VfsEntry> {
        &self.vfs
    }

    #[inline(always)]
    pub fn links(&self) -> &LinkRules {
        &self.links
    }

    #[inline(always)]
    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    /// Encodes a logical path and follows symlinks to the key it is stored
    /// under.
    pub fn resolve_key(&mut self, logical: &str) -> Result<String, ResolveError> {
        let key = self.codec.encode(logical)?;
        self.links.follow(&key, self.codec.separator())
    }

    /// Finds the entry stored for `logical`. `Ok(None)` means the resolved
    /// key is not in the map at all.
    pub fn lookup(&mut self, logical: &str) -> Result<Option<&VfsEntry>, ResolveError> {
        let key = self.resolve_key(logical)?;
        Ok(self.vfs.get(&key))
    }

    /// Turns a raw map key back into the logical path it was recorded for.
    pub fn logical_path(&self, key: &str) -> Result<String, ResolveError> {
        let scheme = self.codec.scheme();

        if !self.codec.is_compressed() && scheme != SeparatorScheme::Legacy {
            return Ok(key.to_string());
        }

        let key = match scheme {
            SeparatorScheme::Legacy => self.codec.normalize(key),
            _ => key.to_string(),
        };

        let unlinked = self.links.unfollow(&key, self.codec.separator())?;
        self.codec.decode(&unlinked)
    }

    /// Pairs a raw map key with its logical path and the entry lookup finds
    /// for it.
    pub(crate) fn resolve_raw_key(
        &mut self,
        key: &str,
    ) -> Result<(String, Option<VfsEntry>), ResolveError> {
        if self.codec.is_compressed() {
            let logical = self.logical_path(key)?;
            let entry = self.lookup(&logical)?.cloned();
            Ok((logical, entry))
        } else {
            // Uncompressed keys are already in lookup form; only legacy keys
            // need decoding for the output path.
            let entry = self.lookup(key)?.cloned();
            let logical = self.logical_path(key)?;
            Ok((logical, entry))
        }
    }
}
