/// A VFS key or logical path that cannot be translated consistently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Token `{token}` of key `{key}` is missing from the files dictionary.")]
    UnknownToken { token: String, key: String },

    #[error("Symlink rules did not settle for `{path}` after {limit} rewrites.")]
    LinkLimitExceeded { path: String, limit: usize },

    #[error("No token left in the files dictionary for segment `{segment}`.")]
    DictionaryExhausted { segment: String },
}
