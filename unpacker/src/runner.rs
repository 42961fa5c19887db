use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use pkg_format::{EntryPointRunner, ExecutionError};

/// Runs a textual entry point with an external Node.js process.
///
/// Entry points that were compiled to V8 bytecode cannot be loaded outside
/// the runtime that produced them and are rejected.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    node: PathBuf,
}

impl NodeRunner {
    pub fn new<P: Into<PathBuf>>(node: P) -> NodeRunner {
        NodeRunner { node: node.into() }
    }
}

impl EntryPointRunner for NodeRunner {
    fn run(&self, entry_point: &str, code: &[u8]) -> Result<(), ExecutionError> {
        if std::str::from_utf8(code).is_err() {
            return Err(ExecutionError::Rejected {
                reason: format!(
                    "{} is not JavaScript source, likely precompiled bytecode",
                    entry_point
                ),
            });
        }

        let mut script = tempfile::Builder::new()
            .prefix("pkg-entrypoint-")
            .suffix(".js")
            .tempfile()?;
        script.write_all(code)?;
        script.flush()?;

        tracing::info!(node = %self.node.display(), entry_point, "running entrypoint");

        let status = Command::new(&self.node).arg(script.path()).status()?;

        if !status.success() {
            return Err(ExecutionError::Invocation {
                message: format!("{} exited with {}", self.node.display(), status),
            });
        }

        Ok(())
    }
}
