use indexmap::IndexMap;

use crate::compression::Compression;
use crate::dict::Dictionary;
use crate::record::VfsEntry;

/// Names of the serialized props, in the order pkg writes them.
pub const FIELD_NAMES: [&str; 5] = ["vfs", "entryPoint", "symlinks", "filesDict", "doCompress"];

/// Binaries built before the files dictionary existed carry only the first
/// three fields.
pub const REQUIRED_FIELDS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required props! Found {found} of {required} fields.")]
    MissingFields { found: usize, required: usize },

    #[error("Unexpected props field at index {index}.")]
    UnexpectedField { index: usize },

    #[error("Error parsing {field} at index {index}.")]
    InvalidJson {
        field: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error parsing {field} at index {index}: unknown compression `{value}`.")]
    InvalidCompression {
        field: &'static str,
        index: usize,
        value: String,
    },
}

/// The typed prelude of a packaged binary.
#[derive(Debug, Clone, Default)]
pub struct Props {
    /// Encoded key to stored ranges, in the order pkg wrote them.
    pub vfs: IndexMap<String, VfsEntry>,
    pub entry_point: String,
    /// Link source to link target; order is rule precedence.
    pub symlinks: IndexMap<String, String>,
    pub files_dict: Dictionary,
    pub compression: Compression,
}

impl Props {
    /// Decodes the fields produced by a
    /// [`MetadataLocator`](crate::MetadataLocator). Either every field
    /// decodes or nothing is returned.
    pub fn parse<S: AsRef<str>>(fields: &[S]) -> Result<Props, ParseError> {
        if fields.len() < REQUIRED_FIELDS {
            return Err(ParseError::MissingFields {
                found: fields.len(),
                required: REQUIRED_FIELDS,
            });
        }

        let mut props = Props::default();

        for (index, raw) in fields.iter().enumerate() {
            let raw = raw.as_ref();
            let field = *FIELD_NAMES
                .get(index)
                .ok_or(ParseError::UnexpectedField { index })?;

            let json_err = |source| ParseError::InvalidJson {
                field,
                index,
                source,
            };

            match index {
                0 => props.vfs = serde_json::from_str(raw).map_err(json_err)?,
                1 => props.entry_point = parse_entry_point(raw),
                2 => props.symlinks = serde_json::from_str(raw).map_err(json_err)?,
                3 => props.files_dict = serde_json::from_str(raw).map_err(json_err)?,
                _ => {
                    props.compression = raw
                        .trim()
                        .parse::<u8>()
                        .ok()
                        .and_then(Compression::from_id)
                        .ok_or_else(|| ParseError::InvalidCompression {
                            field,
                            index,
                            value: raw.to_string(),
                        })?
                }
            }
        }

        tracing::debug!(
            entries = props.vfs.len(),
            symlinks = props.symlinks.len(),
            dictionary = props.files_dict.len(),
            compression = %props.compression,
            "parsed props"
        );

        Ok(props)
    }
}

/// The entry point is a JSON string literal. Anything that does not decode
/// as one has its quotes stripped instead.
fn parse_entry_point(raw: &str) -> String {
    serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.replace('"', ""))
}
