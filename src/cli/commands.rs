use crate::analyzers::OutputAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{GeographyLevel, InputReport};
use crate::processors::{GeoPipeline, ProcessedDataset};
use crate::readers::{CrosswalkReader, RegionReader, TableReader, ZipDataReader};
use crate::utils::constants::{DEFAULT_OUTPUT_DIR, REGION_FIELD};
use crate::utils::progress::ProgressReporter;
use crate::utils::{default_output_path, init_tracing, parquet_path_for};
use crate::writers::{JsonWriter, ParquetWriter};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose, cli.log_file.as_deref())?;
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Aggregate {
            zip_data,
            crosswalk,
            levels,
            output_dir,
            parquet,
            compression,
        } => {
            let export = ExportOptions::new(parquet, &compression, &config)?;
            run_aggregate(config, &zip_data, &crosswalk, &levels, &output_dir, &export, quiet)
        }

        Commands::Zip {
            input,
            output,
            months_cutoff,
            mmap,
            parquet,
            compression,
        } => {
            let mut config = config;
            if let Some(months) = months_cutoff {
                config.zip_months_cutoff = months;
                config = config.validated()?;
            }
            let export = ExportOptions::new(parquet, &compression, &config)?;
            let output = output.unwrap_or_else(|| {
                default_output_path(Path::new(DEFAULT_OUTPUT_DIR), GeographyLevel::Zip)
            });
            run_zip(config, &input, &output, mmap, &export, quiet)
        }

        Commands::Regions {
            input,
            level,
            mmap,
            output,
            parquet,
            compression,
        } => {
            let export = ExportOptions::new(parquet, &compression, &config)?;
            let output =
                output.unwrap_or_else(|| default_output_path(Path::new(DEFAULT_OUTPUT_DIR), level));
            run_regions(config, &input, level, mmap, &output, &export, quiet)
        }

        Commands::Info { file, sample } => run_info(&file, sample),

        Commands::Validate { file } => run_validate(&file),
    }
}

/// Output writers shared by the processing commands: JSON always, Parquet
/// when requested.
struct ExportOptions {
    json: JsonWriter,
    parquet: Option<ParquetWriter>,
}

impl ExportOptions {
    fn new(parquet: bool, compression: &str, config: &PipelineConfig) -> Result<Self> {
        let parquet = if parquet {
            Some(
                ParquetWriter::new()
                    .with_compression(compression)?
                    .with_row_group_size(config.parquet_row_group_size),
            )
        } else {
            None
        };
        Ok(Self {
            json: JsonWriter::with_pretty(config.pretty_json),
            parquet,
        })
    }

    fn write(&self, dataset: &ProcessedDataset, json_path: &Path) -> Result<Vec<PathBuf>> {
        self.json.write(dataset, json_path)?;
        let mut written = vec![json_path.to_path_buf()];

        if let Some(writer) = &self.parquet {
            let parquet_path = parquet_path_for(json_path);
            writer.write_records(&dataset.records, &parquet_path)?;
            written.push(parquet_path);
        }

        Ok(written)
    }
}

fn run_aggregate(
    config: PipelineConfig,
    zip_data: &Path,
    crosswalk_path: &Path,
    levels: &[GeographyLevel],
    output_dir: &Path,
    export: &ExportOptions,
    quiet: bool,
) -> Result<()> {
    info!(
        "Aggregating {} through crosswalk {}",
        zip_data.display(),
        crosswalk_path.display()
    );

    let loading = ProgressReporter::spinner("Loading inputs...", quiet);
    let zips = ZipDataReader::new(config.tracked_metrics()).read(zip_data)?;
    let (crosswalk, crosswalk_report) = CrosswalkReader::new().read(crosswalk_path)?;
    loading.finish_with_message(&format!(
        "Loaded {} ZIP records and {} crosswalk entries",
        zips.records.len(),
        crosswalk.len()
    ));
    if crosswalk_report.skipped_rows > 0 {
        warn!(
            "{} crosswalk rows skipped, {} duplicates ignored",
            crosswalk_report.skipped_rows, crosswalk_report.duplicate_rows
        );
    }

    let pipeline = GeoPipeline::new(config);

    let mut requested: Vec<GeographyLevel> = Vec::new();
    for level in levels {
        if !requested.contains(level) {
            requested.push(*level);
        }
    }

    let progress = ProgressReporter::levels(requested.len(), "Aggregating levels", quiet);
    let mut failed = 0;
    for level in &requested {
        let level = *level;
        progress.set_message(&format!("Processing {} level...", level));

        if level == GeographyLevel::Cbsa && !crosswalk.has_level(level) {
            warn!("Crosswalk has no CBSA codes, skipping CBSA level");
            progress.println(&format!("{}: skipped (no CBSA codes in crosswalk)", level));
            progress.advance();
            continue;
        }

        let result = pipeline
            .aggregate_level(&zips.records, &crosswalk, level, &zips.report)
            .and_then(|dataset| {
                let written = export.write(&dataset, &default_output_path(output_dir, level))?;
                Ok((dataset, written))
            });

        match result {
            Ok((dataset, written)) => print_level_summary(&progress, &dataset, &written),
            Err(e) => {
                error!("{} level failed: {}", level, e);
                progress.println(&format!("{}: failed ({})", level, e));
                failed += 1;
            }
        }
        progress.advance();
    }

    if failed > 0 {
        progress.finish_with_message(&format!("{} of {} levels failed", failed, requested.len()));
        return Err(ProcessingError::LevelsFailed {
            failed,
            total: requested.len(),
        });
    }

    progress.finish_with_message("Aggregation complete");
    Ok(())
}

fn run_zip(
    config: PipelineConfig,
    input: &Path,
    output: &Path,
    mmap: bool,
    export: &ExportOptions,
    quiet: bool,
) -> Result<()> {
    let progress = ProgressReporter::spinner("Reading ZIP tracker data...", quiet);
    let reader = ZipDataReader::new(config.tracked_metrics());
    let zips = if is_json(input) {
        reader.read(input)?
    } else {
        let columns = config
            .zip_keep_columns
            .iter()
            .cloned()
            .chain(std::iter::once(REGION_FIELD.to_string()));
        let table = TableReader::with_mmap(mmap).with_columns(columns).read(input)?;

        let mut dataset = reader.records_from_rows(table.rows.into_iter().map(Some));
        dataset.report.merge(&InputReport {
            source_rows: table.skipped_rows,
            skipped_rows: table.skipped_rows,
            ..Default::default()
        });
        dataset
    };
    progress.set_message(&format!("Processing {} ZIP rows...", zips.records.len()));

    let dataset = GeoPipeline::new(config).process_zip_level(zips.records, &zips.report)?;
    let written = export.write(&dataset, output)?;
    print_level_summary(&progress, &dataset, &written);

    progress.finish_with_message("Processing complete");
    Ok(())
}

fn run_regions(
    config: PipelineConfig,
    input: &Path,
    level: GeographyLevel,
    mmap: bool,
    output: &Path,
    export: &ExportOptions,
    quiet: bool,
) -> Result<()> {
    let progress =
        ProgressReporter::spinner(&format!("Reading {} data from {}...", level, input.display()), quiet);

    let data = RegionReader::new(config.numeric_columns())
        .with_mmap(mmap)
        .read(input)?;
    let report = InputReport {
        source_rows: data.source_rows,
        skipped_rows: data.skipped_rows,
        ..Default::default()
    };

    let dataset =
        GeoPipeline::new(config).process_region_level(data.rows, level, data.metadata, &report)?;
    let written = export.write(&dataset, output)?;
    print_level_summary(&progress, &dataset, &written);

    progress.finish_with_message("Processing complete");
    Ok(())
}

fn run_info(file: &Path, sample: usize) -> Result<()> {
    println!("Analyzing output file: {}", file.display());

    if has_extension(file, "parquet") {
        let info = ParquetWriter::new().get_file_info(file)?;
        println!("\n{}", info.summary());
        return Ok(());
    }

    let summary = OutputAnalyzer::with_sample_size(sample).analyze(file)?;
    println!("\n{}", summary.summary());

    if !summary.sample.is_empty() {
        println!("\nSample Records (showing {} records):", summary.sample.len());
        for (i, record) in summary.sample.iter().enumerate() {
            println!("{:3}. {}", i + 1, record);
        }
    }

    Ok(())
}

fn run_validate(file: &Path) -> Result<()> {
    println!("Validating output file: {}", file.display());

    let summary = OutputAnalyzer::new().analyze(file)?;
    println!("\n{}", summary.summary());

    if summary.is_valid() {
        println!("\n✅ All records passed validation checks");
        Ok(())
    } else {
        Err(ProcessingError::InvalidFormat(format!(
            "{} invariant violations in {}",
            summary.violations.len(),
            file.display()
        )))
    }
}

fn print_level_summary(progress: &ProgressReporter, dataset: &ProcessedDataset, written: &[PathBuf]) {
    let metadata = &dataset.metadata;
    let input = &metadata.input;

    info!(
        "{}: {} records, {} unmatched ZIPs, {} stale, {} duplicates, {} other property types, {} skipped rows",
        metadata.geography_level,
        metadata.record_count,
        input.unmatched_zips,
        input.stale_rows,
        input.duplicate_rows,
        input.property_type_rows,
        input.skipped_rows
    );

    progress.println(&format!(
        "{}: {} records ({} removed, {} values nullified by domain rules)",
        metadata.geography_level,
        metadata.record_count,
        metadata.domain_rules.removed,
        metadata.domain_rules.nullified
    ));
    for (metric, change) in &metadata.skewness {
        if let (Some(before), Some(after)) = (change.before, change.after) {
            progress.println(&format!("  {:<28} skew {:>7.2} -> {:>6.2}", metric, before, after));
        }
    }
    for path in written {
        progress.println(&format!("  wrote {}", path.display()));
    }
}

fn is_json(path: &Path) -> bool {
    has_extension(path, "json")
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(extension))
}
