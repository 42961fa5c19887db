use std::path::PathBuf;

use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Input file `{}` does not exist", .path.display())]
    #[diagnostic(help("Pass the packaged executable with --input."))]
    MissingInput { path: PathBuf },

    #[error("Cannot read binary `{}`", .path.display())]
    #[diagnostic(help(
        "This might happen if your binary is not readable or if pkg changed their code."
    ))]
    Open {
        path: PathBuf,
        #[source]
        source: pkg_format::OpenError,
    },

    #[error("Cannot unpack binary to `{}`", .path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: pkg_format::UnpackError,
    },
}
