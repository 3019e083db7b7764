/// oxroot command-line tool: list, inspect and dump the keyed entries of a
/// container file.
///
/// # Command overview
///
/// ```text
/// oxroot <COMMAND> [OPTIONS]
///
/// Commands:
///   ls         List the keys of a directory
///   schema     Print the class schemas recorded in the file
///   dump       Decode one entry and print it as JSON
///   inflate    Write the decompressed payload of one entry
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log decode progress to stderr (repeat for more)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// `RUST_LOG` overrides `-v` when set.
///
/// # Exit codes
///
/// | Code | Meaning                                       |
/// |------|-----------------------------------------------|
/// | 0    | Success                                       |
/// | 1    | Error (I/O failure, corrupt container, etc.)  |
///
/// All error details are written to stderr so stdout can be piped cleanly.
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oxroot_decoder::{CatalogConfig, ContainerCatalog, FileProvider};
use tracing_subscriber::EnvFilter;

mod cmd_dump;
mod cmd_inflate;
mod cmd_ls;
mod cmd_schema;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Reader for self-describing object containers.
#[derive(Parser)]
#[command(name = "oxroot", version, about = "Container file inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decode progress to stderr. `-v` for debug, `-vv` for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// List the keys of the top directory or a sub-directory.
    Ls(LsArgs),
    /// Print the class schemas recorded in the file.
    Schema(SchemaArgs),
    /// Decode one entry and print it as JSON.
    Dump(DumpArgs),
    /// Write the decompressed payload of one entry.
    Inflate(InflateArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `oxroot ls`.
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────────┐
/// │ Flag         │ Effect                                       │
/// ├──────────────┼──────────────────────────────────────────────┤
/// │ --dir PATH   │ List this sub-directory instead of the top   │
/// │ -r           │ Descend into every sub-directory             │
/// └──────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct LsArgs {
    /// Path to the container file.
    pub file: PathBuf,

    /// Slash-separated directory path, e.g. `run1/calib`.
    #[arg(long, default_value = "")]
    pub dir: String,

    /// List sub-directories recursively.
    #[arg(short, long)]
    pub recursive: bool,
}

/// Arguments for `oxroot schema`.
#[derive(clap::Args)]
pub struct SchemaArgs {
    /// Path to the container file.
    pub file: PathBuf,

    /// Only print schemas of this class (all versions).
    #[arg(long)]
    pub class: Option<String>,
}

/// Arguments for `oxroot dump`.
///
/// The entry is located by path (`dir/name` or `dir/name;cycle`) and
/// decoded with the file's own schemas. Records become JSON objects with
/// a `"$class"` member; shared objects print once with an `"$id"` and are
/// referenced elsewhere as `{"$ref": id}`.
///
/// ```text
/// ┌─────────────┬──────────────────────────────────────────────────┐
/// │ Flag        │ Effect                                           │
/// ├─────────────┼──────────────────────────────────────────────────┤
/// │ --depth N   │ Stop inlining referenced objects below depth N   │
/// │ --compact   │ Single-line JSON                                 │
/// └─────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct DumpArgs {
    /// Path to the container file.
    pub file: PathBuf,

    /// Entry path, e.g. `hpx` or `run1/hpx;2`.
    pub path: String,

    /// Maximum nesting of inlined referenced objects.
    #[arg(long, default_value_t = 8)]
    pub depth: usize,

    /// Print single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for `oxroot inflate`.
///
/// Without `-o` the payload is printed as a hex dump.
#[derive(clap::Args)]
pub struct InflateArgs {
    /// Path to the container file.
    pub file: PathBuf,

    /// Entry path, e.g. `hpx` or `run1/hpx;2`.
    pub path: String,

    /// Write the raw payload to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Open `path` with the default catalog configuration.
pub async fn open_catalog(path: &Path) -> Result<ContainerCatalog<FileProvider>> {
    ContainerCatalog::open(FileProvider::new(path), CatalogConfig::default())
        .await
        .with_context(|| format!("cannot open {}", path.display()))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Ls(args) => cmd_ls::run(&args).await,
        Commands::Schema(args) => cmd_schema::run(&args).await,
        Commands::Dump(args) => cmd_dump::run(&args).await,
        Commands::Inflate(args) => cmd_inflate::run(&args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
