use std::fmt;
use std::io::Result;

#[cfg(feature = "brotli")]
use comde::{brotli::BrotliDecompressor, Decompressor};

pub mod constants {
    pub const COMPRESSION_NONE: u8 = 0;
    pub const COMPRESSION_GZIP: u8 = 1;
    pub const COMPRESSION_BROTLI: u8 = 2;
}

use self::constants::*;

/// The compression applied to every payload range of a binary.
///
/// When anything other than `None` is active, pkg also compresses VFS keys
/// through the files dictionary.
#[derive(Clone, Copy, Eq, PartialEq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Brotli,
}

impl Compression {
    pub const fn id(self) -> u8 {
        match self {
            Compression::None => COMPRESSION_NONE,
            Compression::Gzip => COMPRESSION_GZIP,
            Compression::Brotli => COMPRESSION_BROTLI,
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            COMPRESSION_NONE => Some(Compression::None),
            COMPRESSION_GZIP => Some(Compression::Gzip),
            COMPRESSION_BROTLI => Some(Compression::Brotli),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Compression::None)
    }

    /// Decompresses a whole range. `None` copies the input through.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            #[cfg(feature = "gzip")]
            Compression::Gzip => {
                use std::io::Read;

                let mut out = Vec::new();
                flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
                Ok(out)
            }
            #[cfg(feature = "brotli")]
            Compression::Brotli => {
                let mut out = Vec::new();
                BrotliDecompressor.copy(data, &mut out)?;
                Ok(out)
            }
            #[allow(unreachable_patterns)]
            missing => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Compiled without support for {:?}", missing),
            )),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Compression::None => "NONE",
            Compression::Gzip => "GZIP",
            Compression::Brotli => "BROTLI",
        };

        write!(f, "{}", s)
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
