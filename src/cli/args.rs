use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use s2rgb::types::OutputFormat;

#[derive(Parser)]
#[command(name = "s2rgb", version, about = "Sentinel-2 true-color quicklook tool")]
pub struct CliArgs {
    /// Enable logging
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search the Copernicus Data Space catalog and download product archives
    Fetch(FetchArgs),
    /// Convert downloaded products into stretched true-color images
    Compose(ComposeArgs),
}

#[derive(Args)]
pub struct FetchArgs {
    /// Credentials file with USER=... and PASSWORD=... lines
    #[arg(long, default_value = "credentials.txt")]
    pub credentials: PathBuf,

    /// Directory the product archives are downloaded into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Area of interest as west,south,east,north (WGS84 degrees)
    #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
    pub bbox: Vec<f64>,

    /// Length of the sensing window in days, ending at --end-date
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..=36500))]
    pub days: u64,

    /// Window start (YYYY-MM-DD); overrides --days
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Window end (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Skip products with more cloud cover than this (percent)
    #[arg(long, default_value_t = 90.0)]
    pub max_cloud_cover: f64,

    /// Download at most this many products (newest first)
    #[arg(long, default_value_t = 1)]
    pub limit: usize,
}

#[derive(Args)]
pub struct ComposeArgs {
    /// Input product, a zip archive or .SAFE directory (single file mode)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Input directory containing product archives (batch mode)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Output filename (single file mode)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing (batch mode)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output format (png or jpeg)
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Png)]
    pub format: OutputFormat,

    /// Lower stretch percentile
    #[arg(long, default_value_t = 2.0)]
    pub low_percentile: f64,

    /// Upper stretch percentile
    #[arg(long, default_value_t = 98.0)]
    pub high_percentile: f64,

    /// Rebuild quicklooks that already exist in the output directory
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
