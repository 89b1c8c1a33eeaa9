use crate::models::GeographyLevel;
use crate::utils::constants::{COMPRESSION_SNAPPY, DEFAULT_OUTPUT_DIR};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "redfin-geo")]
#[command(about = "Redfin market tracker aggregation to ZIP, state, county and CBSA levels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide progress bars and summaries")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "TOML configuration file (REDFIN_GEO__* environment variables override it)"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate ZIP-level data to larger geographies through a crosswalk
    Aggregate {
        #[arg(short, long, help = "ZIP-level JSON (output of the `zip` command)")]
        zip_data: PathBuf,

        #[arg(short = 'x', long, help = "ZIP crosswalk CSV (uszips.csv layout)")]
        crosswalk: PathBuf,

        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_values_t = GeographyLevel::AGGREGATED.to_vec(),
            help = "Comma-separated target levels"
        )]
        levels: Vec<GeographyLevel>,

        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        #[arg(long, help = "Also write a Parquet file next to each JSON output")]
        parquet: bool,

        #[arg(long, default_value = COMPRESSION_SNAPPY)]
        compression: String,
    },

    /// Reduce the ZIP tracker extract to the latest period per ZIP
    Zip {
        #[arg(short, long, help = "ZIP tracker TSV/CSV or JSON")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output JSON path [default: output/redfin_latest_optimized.json]"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "Drop ZIPs whose latest row is older than this many months")]
        months_cutoff: Option<u32>,

        #[arg(long, help = "Memory-map the input file")]
        mmap: bool,

        #[arg(long)]
        parquet: bool,

        #[arg(long, default_value = COMPRESSION_SNAPPY)]
        compression: String,
    },

    /// Process a Redfin region file (state, county or metro) directly
    Regions {
        #[arg(short, long, help = "Region JSON, TSV or CSV")]
        input: PathBuf,

        #[arg(short, long)]
        level: GeographyLevel,

        #[arg(long, help = "Memory-map TSV/CSV input")]
        mmap: bool,

        #[arg(
            short,
            long,
            help = "Output JSON path [default: output/redfin_{level}_aggregated.json]"
        )]
        output: Option<PathBuf>,

        #[arg(long)]
        parquet: bool,

        #[arg(long, default_value = COMPRESSION_SNAPPY)]
        compression: String,
    },

    /// Display information about an output file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "0")]
        sample: usize,
    },

    /// Check an output file for duplicate ids and out-of-range ranks
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },
}
