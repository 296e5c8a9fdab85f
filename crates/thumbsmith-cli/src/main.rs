//! thumbsmith: render, inspect, and purge cached thumbnails from the shell.
//!
//! Each `--op` is one operation in the compact textual form, applied in
//! the order given:
//!
//! ```text
//! thumbsmith render photos/cat.jpg --op crop:400x400+10+20 --op resize:200
//! thumbsmith fingerprint photos/cat.jpg --op fit:450x450,upsize=false --json
//! thumbsmith purge photos/cat.jpg
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`)
//! or `--verbose`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thumbsmith_cache::{CacheConfig, CacheError, Thumbnail, ThumbnailCache};
use thumbsmith_pipeline::{Operation, OutputFormat, ResampleFilter, SaveOptions};

/// On-demand thumbnails with a content-addressed disk cache.
#[derive(Parser)]
#[command(name = "thumbsmith", version)]
struct Cli {
    /// Directory cached thumbnails are written to.
    #[arg(long, global = true, default_value = CacheConfig::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Encoder quality used when a save does not set one (1-100).
    #[arg(long, global = true, default_value_t = CacheConfig::DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    default_quality: u8,

    /// Resampling filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, global = true, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Largest image, in pixels, any operation may produce.
    #[arg(long, global = true, default_value_t = CacheConfig::DEFAULT_MAX_PIXELS, value_parser = clap::value_parser!(u64).range(1..))]
    max_pixels: u64,

    /// Fail instead of creating a missing output directory.
    #[arg(long, global = true)]
    no_create_dir: bool,

    /// Full cache config as a JSON string.
    ///
    /// When provided, the individual cache flags above are ignored.
    #[arg(long, global = true, conflicts_with = "config")]
    config_json: Option<String>,

    /// Path to a JSON cache config file.
    ///
    /// When provided, the individual cache flags above are ignored.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log cache activity at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a chain to a thumbnail, rendering it on a cache miss.
    Render(ChainArgs),
    /// Print the target a chain would resolve to, without rendering.
    Fingerprint(ChainArgs),
    /// Delete every cached thumbnail of a source.
    Purge {
        /// Source image path or URL.
        source: String,
    },
}

/// A source, its operations, and how to save the result.
#[derive(Args)]
struct ChainArgs {
    /// Source image path or URL.
    source: String,

    /// Operation to apply, e.g. `crop:200x200+10+20`, `fit:450x450`,
    /// `resize:200x300,aspect=false`, `canvas:300x300,relative=true`.
    #[arg(long = "op", required = true)]
    ops: Vec<Operation>,

    /// Output format (jpg, png, gif, bmp, tiff, webp). Defaults to the
    /// source's extension.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoder quality (1-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Explicit output path instead of the fingerprint name.
    #[arg(long)]
    target: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

impl ChainArgs {
    fn save_options(&self) -> SaveOptions {
        SaveOptions {
            format: self.format,
            quality: self.quality,
            target: self.target.clone(),
        }
    }

    fn open<'c>(&self, cache: &'c ThumbnailCache) -> Result<Thumbnail<'c>, CacheError> {
        let mut thumb = cache.open(&self.source)?;
        for op in &self.ops {
            thumb.push(op.clone())?;
        }
        Ok(thumb)
    }
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for ResampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Maps a [`ResampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_config(f: ResampleFilter) -> Filter {
    match f {
        ResampleFilter::Nearest => Filter::Nearest,
        ResampleFilter::Triangle => Filter::Triangle,
        ResampleFilter::CatmullRom => Filter::CatmullRom,
        ResampleFilter::Gaussian => Filter::Gaussian,
        ResampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from [`CacheConfig::DEFAULT_FILTER`].
const CLI_DEFAULT_FILTER: Filter = filter_from_config(CacheConfig::DEFAULT_FILTER);

/// Build a [`CacheConfig`] from CLI arguments.
///
/// `--config-json` or `--config` replace the individual flags entirely.
fn config_from_cli(cli: &Cli) -> Result<CacheConfig, CacheError> {
    if let Some(ref json) = cli.config_json {
        return CacheConfig::from_json(json);
    }
    if let Some(ref path) = cli.config {
        return CacheConfig::load(path);
    }
    let config = CacheConfig {
        output_dir: cli.output_dir.clone(),
        default_quality: cli.default_quality,
        create_output_dir: !cli.no_create_dir,
        filter: cli.filter.into(),
        max_pixels: cli.max_pixels,
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

fn run(cli: &Cli) -> Result<(), CacheError> {
    let config = config_from_cli(cli)?;
    let cache = ThumbnailCache::new(config)?;

    match &cli.command {
        Command::Render(args) => {
            let options = args.save_options();
            let mut thumb = args.open(&cache)?;
            let cached = thumb.is_cached(&options)?;
            let path = thumb.save(&options)?;
            if args.json {
                let out = serde_json::json!({
                    "source": thumb.source().identity(),
                    "target": path,
                    "cached": cached,
                });
                println!("{out:#}");
            } else {
                println!("{}", path.display());
                if !cached {
                    eprintln!("rendered {}", path.display());
                }
            }
        }
        Command::Fingerprint(args) => {
            let options = args.save_options();
            let thumb = args.open(&cache)?;
            let path = thumb.target_path(&options)?;
            let cached = cache.is_cached(&path);
            if args.json {
                let out = serde_json::json!({
                    "source": thumb.source().identity(),
                    "driver": cache.driver(),
                    "history": thumb.history(),
                    "target": path,
                    "cached": cached,
                });
                println!("{out:#}");
            } else {
                println!("{}", path.display());
            }
        }
        Command::Purge { source } => {
            let removed = cache.purge_source(source)?;
            println!("removed {removed} thumbnail(s) from {}", cache.output_dir().display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
