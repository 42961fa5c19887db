//! Reading the virtual filesystem embedded in executables built by pkg.

mod compression;
mod dict;
mod file;
mod fs;
mod link;
mod locate;
pub mod path;
mod props;
mod record;
mod unpack;

pub use compression::{constants as compression_constants, Compression};
pub use dict::Dictionary;
pub use file::{OpenError, PayloadReader, PkgFile};
pub use fs::Materializer;
pub use link::{Direction, LinkRules};
pub use locate::{
    ExtractionError, MetadataLocator, PreludeLocator, RawMetadata, FIELD_DELIMITER,
    PAYLOAD_POSITION_MARKER,
};
pub use path::{PathCodec, PathStyle, ResolveError, SeparatorScheme};
pub use props::{ParseError, Props};
pub use record::{constants as store_constants, ByteRange, StoreKind, VfsEntry};
pub use unpack::{EntryPointRunner, ExecutionError, UnpackError, UnpackStats};
