use indexmap::IndexMap;

use crate::path::ResolveError;

/// Which side of a rule is matched against the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Link source to link target, applied before looking a key up.
    Follow,
    /// Link target back to link source.
    Unfollow,
}

/// The ordered symlink rules recorded in a binary.
///
/// Rules are plain prefix rewrites over VFS keys. On each step the first
/// matching rule wins and the scan restarts from the top, until a full scan
/// matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRules {
    rules: Vec<(String, String)>,
}

impl LinkRules {
    pub fn new<I: IntoIterator<Item = (String, String)>>(rules: I) -> LinkRules {
        LinkRules {
            rules: rules.into_iter().collect(),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Upper bound on rewrites for one path. An acyclic rule set never gets
    /// close to it.
    #[inline(always)]
    pub fn rewrite_limit(&self) -> usize {
        self.rules.len().saturating_mul(self.rules.len())
    }

    #[inline(always)]
    pub fn follow(&self, path: &str, separator: char) -> Result<String, ResolveError> {
        self.resolve(path, separator, Direction::Follow)
    }

    #[inline(always)]
    pub fn unfollow(&self, path: &str, separator: char) -> Result<String, ResolveError> {
        self.resolve(path, separator, Direction::Unfollow)
    }

    pub fn resolve(
        &self,
        path: &str,
        separator: char,
        direction: Direction,
    ) -> Result<String, ResolveError> {
        let limit = self.rewrite_limit();
        let mut current = path.to_string();
        let mut rewrites = 0;

        'scan: loop {
            for (source, target) in self.rules.iter() {
                let (from, to) = match direction {
                    Direction::Follow => (source, target),
                    Direction::Unfollow => (target, source),
                };

                if !is_prefix_of(from, &current, separator) {
                    continue;
                }

                if rewrites == limit {
                    return Err(ResolveError::LinkLimitExceeded {
                        path: path.to_string(),
                        limit,
                    });
                }

                tracing::trace!(from = %current, rule = %from, to = %to, "applying symlink rule");
                current = format!("{}{}", to, &current[from.len()..]);
                rewrites += 1;
                continue 'scan;
            }

            return Ok(current);
        }
    }
}

impl From<IndexMap<String, String>> for LinkRules {
    fn from(map: IndexMap<String, String>) -> Self {
        LinkRules::new(map)
    }
}

/// `prefix` equals `path` or is followed in it by `separator`.
#[inline(always)]
fn is_prefix_of(prefix: &str, path: &str, separator: char) -> bool {
    match path.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(separator),
        None => false,
    }
}
