//! Finding the prelude data pkg leaves in a packaged binary.
//!
//! The packager serializes its props as newline-separated literals right
//! after the bootstrap script, and writes the payload offset into a
//! `var PAYLOAD_POSITION = ...` line. Both are found by scanning the raw
//! bytes; nothing else about the layout of the executable is assumed.

use regex::bytes::Regex;

/// Literal text preceding the payload base offset.
pub const PAYLOAD_POSITION_MARKER: &[u8] = b"var PAYLOAD_POSITION = ";

/// Delimiter between the serialized props fields.
pub const FIELD_DELIMITER: &str = "\n,\n";

// vfs, entrypoint, symlinks, then optionally filesDict and the compression tag.
const PROPS_PATTERN: &str =
    r#"(?-u)\{.*\}\n,\n".*"\n,\n\{.*\}(?:\n,\n\{.*\}\n,\n([012]))?"#;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Error while reading the binary props!")]
    MissingProps,

    #[error("Cannot find the pkg payload!")]
    MissingPayloadMarker,

    #[error("Cannot find the pkg payload! The payload position is not a number.")]
    InvalidPayloadPosition,
}

/// The prelude of a binary, split but not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetadata {
    /// Serialized props, in order: vfs, entrypoint, symlinks and, for newer
    /// binaries, files dictionary and compression tag.
    pub fields: Vec<String>,
    /// Absolute offset of the payload within the binary.
    pub payload_position: u64,
}

/// Extracts [`RawMetadata`] from the bytes of a packaged binary.
pub trait MetadataLocator {
    fn locate(&self, binary: &[u8]) -> Result<RawMetadata, ExtractionError>;
}

/// The pattern-based locator matching pkg's serialization.
#[derive(Debug, Clone)]
pub struct PreludeLocator {
    pattern: Regex,
}

impl Default for PreludeLocator {
    fn default() -> Self {
        PreludeLocator::new()
    }
}

impl PreludeLocator {
    pub fn new() -> PreludeLocator {
        PreludeLocator {
            pattern: Regex::new(PROPS_PATTERN).expect("props pattern is a valid regex"),
        }
    }

    pub fn find_props(&self, binary: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let found = self
            .pattern
            .find(binary)
            .ok_or(ExtractionError::MissingProps)?;

        let text = String::from_utf8_lossy(found.as_bytes());
        tracing::debug!(
            start = format_args!("{:#x}", found.start()),
            end = format_args!("{:#x}", found.end()),
            "found props block"
        );

        Ok(text.split(FIELD_DELIMITER).map(str::to_string).collect())
    }

    pub fn find_payload_position(&self, binary: &[u8]) -> Result<u64, ExtractionError> {
        let start = twoway::find_bytes(binary, PAYLOAD_POSITION_MARKER)
            .ok_or(ExtractionError::MissingPayloadMarker)?;

        let line = &binary[start + PAYLOAD_POSITION_MARKER.len()..];
        let line = match line.iter().position(|b| *b == b'\n') {
            Some(end) => &line[..end],
            None => line,
        };

        let digits: Vec<u8> = line
            .iter()
            .skip_while(|b| !b.is_ascii_digit())
            .take_while(|b| b.is_ascii_digit())
            .copied()
            .collect();

        std::str::from_utf8(&digits)
            .ok()
            .and_then(|digits| digits.parse::<u64>().ok())
            .ok_or(ExtractionError::InvalidPayloadPosition)
    }
}

impl MetadataLocator for PreludeLocator {
    fn locate(&self, binary: &[u8]) -> Result<RawMetadata, ExtractionError> {
        let fields = self.find_props(binary)?;
        let payload_position = self.find_payload_position(binary)?;

        Ok(RawMetadata {
            fields,
            payload_position,
        })
    }
}
