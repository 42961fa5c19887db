use std::path::{Path, PathBuf};

use crate::{file::PayloadReader, fs::Materializer, PkgFile};

#[derive(Debug, thiserror::Error)]
pub enum UnpackError {
    #[error("Creating directory failed. Path: '{}'", .1.display())]
    CreateDirFailed(#[source] std::io::Error, PathBuf),

    #[error("Creating file failed. Path: '{}'", .1.display())]
    CreateFileFailed(#[source] std::io::Error, PathBuf),

    #[error("Reading packaged binary failed. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The runtime refused the buffer, e.g. bytecode for another engine
    /// version.
    #[error("Entry point was rejected: {reason}")]
    Rejected { reason: String },

    #[error("Entry point raised an error: {message}")]
    Invocation { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Executes the decoded entry point of a binary.
pub trait EntryPointRunner {
    fn run(&self, entry_point: &str, code: &[u8]) -> Result<(), ExecutionError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnpackStats {
    /// Files written below the output root.
    pub files_written: u64,
    /// Total decoded bytes written.
    pub bytes_written: u64,
    /// Entries with nothing to write: directories, metadata and paths that
    /// name the output root itself.
    pub entries_skipped: u64,
    /// Entries whose content range could not be read.
    pub unreadable: u64,
    /// Keys that failed to decode or resolved to nothing.
    pub inconsistent: u64,
    /// The entry point was found and handed to the runner.
    pub entry_point_matched: bool,
    /// The runner finished without error.
    pub entry_point_executed: bool,
    pub execution_failed: bool,
}

impl PkgFile {
    /// Decodes every VFS entry and writes the files below `output`.
    ///
    /// When a runner is given, it is handed the entry point's contents as
    /// soon as they are decoded. Per-entry problems are logged and counted in
    /// the returned stats; only failing to open the input or write the output
    /// aborts the pass.
    pub fn unpack_all<P: AsRef<Path>>(
        &mut self,
        output: P,
        runner: Option<&dyn EntryPointRunner>,
    ) -> Result<UnpackStats, UnpackError> {
        let output = output.as_ref();
        let mut stats = UnpackStats::default();

        tracing::debug!(compression = %self.compression, "Detected compression");
        tracing::debug!(entry_point = %self.entry_point, "Detected entrypoint");
        tracing::debug!(
            elements = self.vfs.len(),
            "Unpacking binary, {} elements to go",
            self.vfs.len()
        );

        std::fs::create_dir_all(output)
            .map_err(|e| UnpackError::CreateDirFailed(e, output.to_path_buf()))?;

        let mut reader = PayloadReader::open(&self.path, self.payload_position, self.compression)
            .map_err(|e| UnpackError::ReadFailed(e, self.path.clone()))?;
        let materializer = Materializer::new(output, self.codec.style());

        let keys: Vec<String> = self.vfs.keys().cloned().collect();

        for key in keys {
            let (logical, entry) = match self.resolve_raw_key(&key) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Inconsistent VFS key");
                    stats.inconsistent += 1;
                    continue;
                }
            };

            let entry = match entry {
                Some(entry) => entry,
                None => {
                    tracing::warn!(key = %key, "No VFS entry found for {}", logical);
                    stats.inconsistent += 1;
                    continue;
                }
            };

            let range = match entry.content_range() {
                Some(range) => range,
                None => {
                    tracing::trace!(
                        path = %logical,
                        kinds = ?entry.kinds().collect::<Vec<_>>(),
                        "skipping entry without content"
                    );
                    stats.entries_skipped += 1;
                    continue;
                }
            };

            let data = match reader.read(range) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::warn!("Could not read file with VFS path of {}!", logical);
                    stats.unreadable += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read file with VFS path of {}!", logical);
                    stats.unreadable += 1;
                    continue;
                }
            };

            if let Some(runner) = runner {
                if logical == self.entry_point {
                    stats.entry_point_matched = true;
                    match runner.run(&logical, &data) {
                        Ok(()) => stats.entry_point_executed = true,
                        Err(e) => {
                            tracing::error!(error = %e, "Error while executing the entrypoint!");
                            stats.execution_failed = true;
                        }
                    }
                }
            }

            if materializer.write(&logical, &data)?.is_none() {
                tracing::warn!("VFS path {} has no file name, skipping!", logical);
                stats.entries_skipped += 1;
                continue;
            }
            stats.files_written += 1;
            stats.bytes_written += data.len() as u64;
        }

        if runner.is_some() && !stats.entry_point_matched {
            tracing::warn!(
                "The binary has not been executed! It may be because the entrypoint could not be found."
            );
        }

        tracing::debug!(
            files = stats.files_written,
            bytes = stats.bytes_written,
            output = %output.display(),
            "Binary unpacked"
        );

        Ok(stats)
    }
}
