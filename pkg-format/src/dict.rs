//! The files dictionary pkg uses to shrink VFS keys.
//!
//! Every path segment maps to a short base-36 token. The forward map is read
//! from the binary; the reverse map is derived from it and kept in lockstep.
//! Segments that were never recorded get a fresh token on first use, so the
//! dictionary only ever grows.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::path::ResolveError;

const TOKEN_RADIX: u32 = 36;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "IndexMap<String, String>")]
pub struct Dictionary {
    forward: IndexMap<String, String>,
    reverse: HashMap<String, String>,
    max_token: Option<u64>,
}

impl Dictionary {
    pub fn new(forward: IndexMap<String, String>) -> Dictionary {
        let reverse = forward
            .iter()
            .map(|(segment, token)| (token.clone(), segment.clone()))
            .collect();
        let max_token = forward.values().filter_map(|token| parse_token(token)).max();

        Dictionary {
            forward,
            reverse,
            max_token,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    #[inline(always)]
    pub fn token(&self, segment: &str) -> Option<&str> {
        self.forward.get(segment).map(String::as_str)
    }

    #[inline(always)]
    pub fn segment(&self, token: &str) -> Option<&str> {
        self.reverse.get(token).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the token for `segment`, recording a new one (highest known
    /// token plus one) when the segment has not been seen yet.
    pub fn token_or_insert(&mut self, segment: &str) -> Result<String, ResolveError> {
        if let Some(token) = self.forward.get(segment) {
            return Ok(token.clone());
        }

        let next = match self.max_token {
            None => 0,
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| ResolveError::DictionaryExhausted {
                    segment: segment.to_string(),
                })?,
        };
        let token = format_token(next);
        tracing::trace!(segment, token = %token, "recording new dictionary segment");

        self.forward.insert(segment.to_string(), token.clone());
        self.reverse.insert(token.clone(), segment.to_string());
        self.max_token = Some(next);

        Ok(token)
    }
}

impl From<IndexMap<String, String>> for Dictionary {
    fn from(forward: IndexMap<String, String>) -> Self {
        Dictionary::new(forward)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Dictionary::new(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

fn parse_token(token: &str) -> Option<u64> {
    u64::from_str_radix(token, TOKEN_RADIX).ok()
}

fn format_token(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".into();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % TOKEN_RADIX as u64) as usize]);
        value /= TOKEN_RADIX as u64;
    }
    out.reverse();

    String::from_utf8_lossy(&out).into_owned()
}
