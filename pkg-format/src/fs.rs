//! Writing decoded files below an output directory.

use std::path::{Path, PathBuf};

use crate::path::{drive_prefix, PathStyle};
use crate::unpack::UnpackError;

/// Places logical snapshot paths below an output root.
#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
    style: PathStyle,
}

impl Materializer {
    pub fn new<P: AsRef<Path>>(root: P, style: PathStyle) -> Materializer {
        Materializer {
            root: root.as_ref().to_path_buf(),
            style,
        }
    }

    #[inline(always)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a logical path to its location under the root. A drive prefix is
    /// dropped and `..` never climbs above the root. `None` when nothing is
    /// left of the path but the root itself.
    pub fn target(&self, logical: &str) -> Option<PathBuf> {
        let logical = match drive_prefix(logical) {
            Some(drive) => &logical[drive.len()..],
            None => logical,
        };

        let mut components: Vec<&str> = vec![];
        for component in logical.split(|c| self.style.is_separator(c)) {
            match component {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                component => components.push(component),
            }
        }

        if components.is_empty() {
            return None;
        }

        Some(
            components
                .into_iter()
                .fold(self.root.clone(), |path, component| path.join(component)),
        )
    }

    /// Writes `data` for `logical`, creating missing parent directories and
    /// replacing any existing file. Returns `Ok(None)` without writing when
    /// `logical` has no [`target`](Self::target).
    pub fn write(&self, logical: &str, data: &[u8]) -> Result<Option<PathBuf>, UnpackError> {
        let target = match self.target(logical) {
            Some(target) => target,
            None => return Ok(None),
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| UnpackError::CreateDirFailed(e, parent.to_path_buf()))?;
        }

        std::fs::write(&target, data)
            .map_err(|e| UnpackError::CreateFileFailed(e, target.clone()))?;

        tracing::trace!(path = %target.display(), bytes = data.len(), "wrote file");
        Ok(Some(target))
    }
}
