use crate::models::{JobConfig, WriteMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bronze-ingest")]
#[command(about = "Bronze-layer CSV to Parquet ingestion")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Job configuration file (TOML, JSON or YAML)"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ingestion job: clear the target, convert the CSV, write Parquet
    Run {
        #[command(flatten)]
        overrides: JobOverrides,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,

        #[arg(long, help = "Print the job report as JSON")]
        json: bool,
    },

    /// Read the source and show the column mapping without writing anything
    Validate {
        #[command(flatten)]
        overrides: JobOverrides,

        #[arg(long, help = "Print the validation report as JSON")]
        json: bool,
    },

    /// Display the Parquet output under a target prefix
    Info {
        #[arg(short, long, help = "Target URI [default: configured target]")]
        target: Option<String>,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },

    /// Print the effective job configuration as JSON
    ShowConfig {
        #[command(flatten)]
        overrides: JobOverrides,
    },
}

/// Command-line settings that take precedence over file and environment
#[derive(Args, Debug, Clone, Default)]
pub struct JobOverrides {
    #[arg(long = "job-name", alias = "JOB_NAME")]
    pub job_name: Option<String>,

    #[arg(long, help = "Source CSV URI or path")]
    pub source: Option<String>,

    #[arg(long, help = "Target prefix URI or path")]
    pub target: Option<String>,

    #[arg(long, help = "Maximum number of part files")]
    pub partitions: Option<usize>,

    #[arg(long, help = "snappy, gzip, lz4, zstd or none")]
    pub compression: Option<String>,

    #[arg(long, help = "overwrite, append, error_if_exists or ignore")]
    pub mode: Option<WriteMode>,

    #[arg(long, help = "Fail on schema drift instead of warning")]
    pub strict: bool,
}

impl JobOverrides {
    pub fn apply(&self, config: &mut JobConfig) {
        if let Some(job_name) = &self.job_name {
            config.job_name = job_name.clone();
        }
        if let Some(source) = &self.source {
            config.source.uri = source.clone();
        }
        if let Some(target) = &self.target {
            config.target.uri = target.clone();
        }
        if let Some(partitions) = self.partitions {
            config.target.output_partitions = partitions;
        }
        if let Some(compression) = &self.compression {
            config.target.compression = compression.clone();
        }
        if let Some(mode) = self.mode {
            config.target.mode = mode;
        }
        if self.strict {
            config.schema.strict = true;
        }
    }
}
