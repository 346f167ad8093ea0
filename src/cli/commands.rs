use crate::cli::args::{Cli, Commands, JobOverrides};
use crate::cli::logging::init_logging;
use crate::error::Result;
use crate::models::JobConfig;
use crate::processors::{BronzeJob, OutputInspector};
use crate::storage::StorageLocation;
use crate::utils::progress::ProgressReporter;
use std::path::Path;
use tracing::debug;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Run {
            overrides,
            max_workers,
            json,
        } => {
            let config = load_config(config_path.as_deref(), &overrides)?;
            if !json {
                println!("Running job '{}'", config.job_name);
                println!("Source: {}", config.source.uri);
                println!("Target: {} (mode: {})", config.target.uri, config.target.mode);
                println!(
                    "Workers: {}, Max partitions: {}",
                    max_workers, config.target.output_partitions
                );
            }

            let job = BronzeJob::from_config(config)?.with_max_workers(max_workers);
            let progress = ProgressReporter::new_spinner("Starting job...", json);
            let report = job.run(&progress).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n{}", report.summary());
                if !report.drift.is_clean() {
                    println!("⚠️  Schema drift: {}", report.drift.summary());
                }
                println!("Processing complete!");
            }
        }

        Commands::Validate { overrides, json } => {
            let config = load_config(config_path.as_deref(), &overrides)?;
            let job = BronzeJob::from_config(config)?;

            let progress = ProgressReporter::new_spinner("Validating source...", json);
            let report = job.validate(&progress).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n{}", report.summary());
                if report.drift.is_clean() {
                    println!("✅ Source header matches the rename table");
                } else {
                    println!("⚠️  Source header differs from the rename table");
                }
            }
        }

        Commands::Info { target, sample } => {
            let uri = match target {
                Some(uri) => uri,
                None => load_config(config_path.as_deref(), &JobOverrides::default())?
                    .target
                    .uri,
            };
            println!("Inspecting Parquet output: {}", uri);

            let location = StorageLocation::parse(&uri)?;
            let summary = OutputInspector::new().inspect(&location, sample).await?;

            println!("\n{}", summary.summary());

            if sample > 0 && !summary.sample.is_empty() {
                println!("\nSample Records (showing up to {} records):", sample);
                match summary.sample_table() {
                    Ok(table) => println!("{}", table),
                    Err(e) => println!("Error formatting sample data: {}", e),
                }
            }
        }

        Commands::ShowConfig { overrides } => {
            let config = load_config(config_path.as_deref(), &overrides)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// File and environment layers first, then command-line overrides
fn load_config(path: Option<&Path>, overrides: &JobOverrides) -> Result<JobConfig> {
    let mut config = JobConfig::load(path)?;
    overrides.apply(&mut config);
    config.check()?;
    debug!(job = %config.job_name, "Loaded job configuration");
    Ok(config)
}
