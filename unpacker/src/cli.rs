use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "pkg-unpacker",
    about = "Unpack the files embedded in executables built with pkg.",
    version
)]
pub struct Cli {
    /// Packaged binary to unpack
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output directory, created if it does not exist
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output: PathBuf,

    /// Run the entry point once it has been unpacked
    #[arg(long)]
    pub run: bool,

    /// Node.js executable used by --run
    #[arg(long, default_value = "node", requires = "run")]
    pub node: PathBuf,

    /// Suppress output (quiet mode)
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log each step of the extraction
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
