use crate::models::{DriftReport, WriteMode};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One Parquet object written by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub name: String,
    pub rows: usize,
    pub bytes: usize,
}

/// Outcome of a job run, printed as a summary or emitted as JSON
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_name: String,
    pub source_uri: String,
    pub target_uri: String,
    pub mode: WriteMode,
    pub ingestion_time: DateTime<Utc>,
    /// Set when `ignore` mode found existing output and did nothing
    pub skipped: bool,
    pub deleted_objects: usize,
    pub rows: usize,
    pub columns: Vec<String>,
    pub renamed_columns: usize,
    pub drift: DriftReport,
    pub files: Vec<WrittenFile>,
    pub elapsed_ms: u128,
}

impl JobReport {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes).sum()
    }

    pub fn summary(&self) -> String {
        if self.skipped {
            return format!(
                "Job '{}' skipped: {} already has output (mode: {})",
                self.job_name, self.target_uri, self.mode
            );
        }

        format!(
            "Bronze Ingestion Summary:\n\
            - Job: {}\n\
            - Source: {}\n\
            - Target: {} (mode: {})\n\
            - Ingestion time: {}\n\
            - Rows written: {}\n\
            - Columns: {} ({} renamed)\n\
            - Schema drift: {}\n\
            - Objects deleted: {}\n\
            - Part files: {}\n\
            - Total size: {:.2} MB\n\
            - Elapsed: {:.2}s",
            self.job_name,
            self.source_uri,
            self.target_uri,
            self.mode,
            self.ingestion_time.to_rfc3339(),
            self.rows,
            self.columns.len(),
            self.renamed_columns,
            self.drift.summary(),
            self.deleted_objects,
            self.files.len(),
            self.total_bytes() as f64 / 1_048_576.0,
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSummary {
    pub source: String,
    pub target: String,
    pub data_type: String,
}

/// Result of a dry run: what the job would write, without writing it
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub job_name: String,
    pub source_uri: String,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    pub metadata_columns: Vec<String>,
    pub drift: DriftReport,
}

impl ValidationReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Validation of job '{}'", self.job_name),
            format!("- Source: {}", self.source_uri),
            format!("- Rows: {}", self.rows),
            format!("- Columns ({}):", self.columns.len()),
        ];

        for column in &self.columns {
            if column.source == column.target {
                lines.push(format!("    {} [{}]", column.target, column.data_type));
            } else {
                lines.push(format!(
                    "    {} -> {} [{}]",
                    column.source, column.target, column.data_type
                ));
            }
        }

        if !self.metadata_columns.is_empty() {
            lines.push(format!(
                "- Metadata columns: {}",
                self.metadata_columns.join(", ")
            ));
        }
        lines.push(format!("- Schema drift: {}", self.drift.summary()));

        lines.join("\n")
    }
}
