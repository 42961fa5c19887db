//! Translation between logical snapshot paths and the keys of the VFS map.
//!
//! pkg has shipped three key encodings: plain native paths, dictionary
//! tokens joined with `$` (5.2.x) and dictionary tokens joined with `/`.

use crate::compression::Compression;
use crate::dict::Dictionary;

mod error;

pub use self::error::ResolveError;

/// Token separator used by pkg 5.2.x keys.
pub const LEGACY_SEP: char = '$';

/// Token separator used by dictionary-compressed keys of later releases.
pub const COMPRESSED_SEP: char = '/';

/// The flavor of the paths recorded in a binary, inferred from whether the
/// entry point carries a drive designator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    pub fn detect(entry_point: &str) -> PathStyle {
        if drive_prefix(entry_point).is_some() {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    #[inline(always)]
    pub const fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    #[inline(always)]
    pub fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }

    /// Normalizes `path` the way the packaging tool did before computing
    /// keys: `.` and `..` are resolved, separators collapsed and trailing
    /// separators dropped (except for `/` and `X:\`).
    pub fn normalize(self, path: &str) -> String {
        // A bare `c:` would otherwise come out as `c:.`.
        let mut out = if is_bare_drive(path) {
            path.to_string()
        } else {
            match self {
                PathStyle::Posix => normalize_posix(path),
                PathStyle::Windows => normalize_windows(path),
            }
        };

        if self == PathStyle::Windows && out.get(1..3) == Some(":\\") {
            out[..1].make_ascii_uppercase();
        }

        remove_trailing_separators(out)
    }
}

/// How the keys of a particular VFS map are joined together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorScheme {
    /// Uncompressed keys joined by the path style's own separator.
    Native,
    /// Dictionary tokens joined by [`LEGACY_SEP`].
    Legacy,
    /// Dictionary tokens joined by [`COMPRESSED_SEP`].
    Compressed,
}

impl SeparatorScheme {
    pub fn detect<'a, I>(keys: I, compression: Compression) -> SeparatorScheme
    where
        I: IntoIterator<Item = &'a str>,
    {
        if keys.into_iter().any(is_legacy_key) {
            SeparatorScheme::Legacy
        } else if compression.is_enabled() {
            SeparatorScheme::Compressed
        } else {
            SeparatorScheme::Native
        }
    }

    #[inline(always)]
    pub const fn separator(self, style: PathStyle) -> char {
        match self {
            SeparatorScheme::Native => style.separator(),
            SeparatorScheme::Legacy => LEGACY_SEP,
            SeparatorScheme::Compressed => COMPRESSED_SEP,
        }
    }
}

/// Encodes logical paths to VFS keys and back.
///
/// Encoding may grow the dictionary, which is why it takes `&mut self`.
#[derive(Debug, Clone)]
pub struct PathCodec {
    style: PathStyle,
    scheme: SeparatorScheme,
    compressed: bool,
    dict: Dictionary,
}

impl PathCodec {
    pub fn new(
        style: PathStyle,
        scheme: SeparatorScheme,
        compressed: bool,
        dict: Dictionary,
    ) -> PathCodec {
        PathCodec {
            style,
            scheme,
            compressed,
            dict,
        }
    }

    #[inline(always)]
    pub fn style(&self) -> PathStyle {
        self.style
    }

    #[inline(always)]
    pub fn scheme(&self) -> SeparatorScheme {
        self.scheme
    }

    #[inline(always)]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    #[inline(always)]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// The separator between the components of a VFS key.
    #[inline(always)]
    pub fn separator(&self) -> char {
        self.scheme.separator(self.style)
    }

    #[inline(always)]
    pub fn normalize(&self, path: &str) -> String {
        self.style.normalize(path)
    }

    pub fn encode(&mut self, path: &str) -> Result<String, ResolveError> {
        let normalized = self.normalize(path);

        if !self.compressed {
            return Ok(normalized);
        }

        let separator = self.separator().to_string();
        let key = normalized
            .split(self.style.separator())
            .map(|segment| self.dict.token_or_insert(segment))
            .collect::<Result<Vec<_>, _>>()?
            .join(&separator);

        if key.is_empty() {
            Ok(normalized)
        } else {
            Ok(key)
        }
    }

    pub fn decode(&self, key: &str) -> Result<String, ResolveError> {
        if !self.compressed && self.scheme != SeparatorScheme::Legacy {
            return Ok(key.to_string());
        }

        let segments = key
            .split(self.separator())
            .map(|token| {
                self.dict
                    .segment(token)
                    .ok_or_else(|| ResolveError::UnknownToken {
                        token: token.to_string(),
                        key: key.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(segments.join(&self.style.separator().to_string()))
    }
}

/// Legacy keys are bare tokens joined by `$`. A `$` inside a real path
/// (`node_modules/x/$helpers.js`) does not count.
fn is_legacy_key(key: &str) -> bool {
    key.contains(LEGACY_SEP)
        && !key.contains(['/', '\\'])
        && drive_prefix(key).is_none()
}

/// Returns the `X:` designator at the start of `path`, if any.
pub fn drive_prefix(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some(&path[..2])
    } else {
        None
    }
}

#[inline(always)]
fn is_bare_drive(path: &str) -> bool {
    path.chars().count() == 2 && path.chars().nth(1) == Some(':')
}

fn resolve_dots<'a>(parts: impl Iterator<Item = &'a str>, absolute: bool) -> Vec<&'a str> {
    let mut out: Vec<&str> = vec![];

    for part in parts {
        match part {
            "" | "." => {}
            ".." => {
                if out.last().map_or(false, |last| *last != "..") {
                    out.pop();
                } else if !absolute {
                    out.push("..");
                }
            }
            part => out.push(part),
        }
    }

    out
}

fn normalize_posix(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut tail = resolve_dots(path.split('/'), absolute).join("/");

    if tail.is_empty() && !absolute {
        tail.push('.');
    }
    if !tail.is_empty() && trailing {
        tail.push('/');
    }

    if absolute {
        format!("/{}", tail)
    } else {
        tail
    }
}

fn normalize_windows(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }

    let is_sep = |c: char| c == '/' || c == '\\';
    let device = drive_prefix(path).unwrap_or("");
    let rest = &path[device.len()..];
    let absolute = rest.starts_with(is_sep);
    let trailing = rest.ends_with(is_sep);
    let mut tail = resolve_dots(rest.split(is_sep), absolute).join("\\");

    if tail.is_empty() && !absolute {
        tail.push('.');
    }
    if !tail.is_empty() && trailing {
        tail.push('\\');
    }

    format!("{}{}{}", device, if absolute { "\\" } else { "" }, tail)
}

fn remove_trailing_separators(mut path: String) -> String {
    if path == "/" {
        return path;
    }
    if path.len() == 3 && path.get(1..) == Some(":\\") {
        return path;
    }

    while path.ends_with('/') || path.ends_with('\\') {
        path.pop();
    }

    path
}
