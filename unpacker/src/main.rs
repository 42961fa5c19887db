mod cli;
mod error;
mod runner;

use clap::Parser;
use pkg_format::{EntryPointRunner, PkgFile};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::{Error, Result};
use runner::NodeRunner;

fn main() -> miette::Result<()> {
    let cli = Cli::parse_from(wild::args_os());

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    unpack(cli)?;
    Ok(())
}

fn unpack(cli: Cli) -> Result<()> {
    if !cli.input.exists() {
        return Err(Error::MissingInput { path: cli.input });
    }

    let mut pkg = PkgFile::open(&cli.input).map_err(|source| Error::Open {
        path: cli.input.clone(),
        source,
    })?;

    if !cli.quiet {
        println!("Detected compression: {}", pkg.compression());
        println!("Detected entrypoint: {}", pkg.entry_point());
        println!(
            "Unpacking your binary, {} elements to go...",
            pkg.vfs().len()
        );
    }

    let node = NodeRunner::new(cli.node.clone());
    let runner: Option<&dyn EntryPointRunner> = if cli.run { Some(&node) } else { None };

    let stats = pkg
        .unpack_all(&cli.output, runner)
        .map_err(|source| Error::Unpack {
            path: cli.output.clone(),
            source,
        })?;

    if !cli.quiet {
        println!("Binary unpacked to {}!", cli.output.display());

        if stats.unreadable > 0 {
            eprintln!("WARNING: {} files could not be read", stats.unreadable);
        }

        if stats.inconsistent > 0 {
            eprintln!(
                "WARNING: {} VFS keys could not be resolved",
                stats.inconsistent
            );
        }
    }

    if stats.inconsistent > 0 {
        std::process::exit(1);
    }

    Ok(())
}
