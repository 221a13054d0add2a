//! vqcodec CLI
//!
//! Compresses binary PPM images into `.quant` files and back.
//!
//! # Modes (picked from the file extensions)
//!
//! - `in.ppm  -o out.quant`: compress and store
//! - `in.quant -o out.ppm`: load and decompress
//! - `in.ppm  -o out.ppm`: compress, then decompress straight away
//!
//! Any other pairing exits with the unsupported-format code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use vqcodec::{
    compress, decompress, ColorSpace, CompressedImage, CompressionConfig, QuantizerKind, RgbImage, VqError,
};

/// Vector-quantization image compressor
#[derive(Parser)]
#[command(name = "vqcodec")]
#[command(version)]
#[command(about = "Lossy image compression by vector quantization")]
#[command(disable_help_flag = true)]
struct Cli {
    /// Codebook holds at most 2^N codewords
    #[arg(short = 'n')]
    bits: Option<u32>,

    /// Relative-improvement threshold, also the LBG split magnitude
    #[arg(short = 'e')]
    epsilon: Option<f64>,

    /// Block width
    #[arg(short = 'w')]
    width: Option<usize>,

    /// Block height
    #[arg(short = 'h')]
    height: Option<usize>,

    /// File to compress or decompress
    file: PathBuf,

    /// Destination file
    #[arg(short = 'o', long = "saveto")]
    saveto: PathBuf,

    /// Print the compression report to stdout
    #[arg(short = 'r', long)]
    report: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// lbg, median-cut, lbg-median-cut, bee-colony (or 0-3)
    #[arg(short = 'q', long)]
    quantizer: Option<QuantizerKind>,

    /// identity, scaled, cie1931 (or 0-2)
    #[arg(short = 'c', long = "colorspace")]
    color_space: Option<ColorSpace>,

    /// Seed for every random choice the quantizer makes
    #[arg(long)]
    seed: Option<u64>,

    /// Refinement iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// TOML file with defaults; command-line flags win
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Ppm,
    Quant,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    match path.extension()?.to_str()? {
        "ppm" => Some(FileKind::Ppm),
        "quant" => Some(FileKind::Quant),
        _ => None,
    }
}

fn load_config(cli: &Cli) -> Result<CompressionConfig> {
    let mut cfg = match &cli.config {
        Some(path) => CompressionConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CompressionConfig::default(),
    };
    if let Some(bits) = cli.bits {
        cfg.bits = bits;
    }
    if let Some(eps) = cli.epsilon {
        cfg.epsilon = eps;
    }
    if let Some(w) = cli.width {
        cfg.block_width = w;
    }
    if let Some(h) = cli.height {
        cfg.block_height = h;
    }
    if let Some(kind) = cli.quantizer {
        cfg.quantizer = kind;
    }
    if let Some(cs) = cli.color_space {
        cfg.color_space = cs;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(iters) = cli.max_iterations {
        cfg.max_iterations = iters;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_compression(cli: &Cli, cfg: &CompressionConfig) -> Result<CompressedImage> {
    let image = RgbImage::open_ppm(&cli.file).with_context(|| format!("reading {}", cli.file.display()))?;
    let (compressed, report) = compress(&image, cfg)?;
    if cli.json {
        println!("{}", report.to_json()?);
    } else if cli.report {
        println!("{report}");
    }
    Ok(compressed)
}

fn save_decompressed(cli: &Cli, compressed: &CompressedImage) -> Result<()> {
    let image = decompress(compressed)?;
    image
        .save_ppm(&cli.saveto)
        .with_context(|| format!("writing {}", cli.saveto.display()))?;
    info!(path = %cli.saveto.display(), "image written");
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = load_config(cli)?;
    match (file_kind(&cli.file), file_kind(&cli.saveto)) {
        (Some(FileKind::Ppm), Some(FileKind::Ppm)) => {
            let compressed = run_compression(cli, &cfg)?;
            save_decompressed(cli, &compressed)
        }
        (Some(FileKind::Quant), Some(FileKind::Ppm)) => {
            let compressed = CompressedImage::load(&cli.file)
                .with_context(|| format!("reading {}", cli.file.display()))?;
            save_decompressed(cli, &compressed)
        }
        (Some(FileKind::Ppm), Some(FileKind::Quant)) => {
            let compressed = run_compression(cli, &cfg)?;
            compressed
                .save(&cli.saveto)
                .with_context(|| format!("writing {}", cli.saveto.display()))?;
            info!(path = %cli.saveto.display(), "compressed image written");
            Ok(())
        }
        _ => Err(VqError::UnsupportedFormat(format!(
            "cannot convert {} to {}",
            cli.file.display(),
            cli.saveto.display()
        ))
        .into()),
    }
}

/// Library error code when there is one, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<VqError>().map_or(1, |e| e.code() as i32)
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(&cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("vqcodec: {err:#}");
            exit_code(&err)
        }
    };
    std::process::exit(code);
}
