use crate::error::Result;
use crate::storage::StorageLocation;
use crate::utils::constants::SUCCESS_MARKER;
use crate::utils::filename::is_part_file;
use crate::writers::{ParquetFileInfo, ParquetWriter};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

#[derive(Debug, Clone)]
pub struct PartFileInfo {
    pub name: String,
    pub info: ParquetFileInfo,
}

/// What a finished job left under its target prefix
#[derive(Debug, Clone)]
pub struct OutputSummary {
    pub target_uri: String,
    pub files: Vec<PartFileInfo>,
    pub other_objects: Vec<String>,
    pub has_success_marker: bool,
    pub schema: Option<SchemaRef>,
    pub sample: Vec<RecordBatch>,
}

impl OutputSummary {
    pub fn total_rows(&self) -> i64 {
        self.files.iter().map(|f| f.info.total_rows).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.info.file_size).sum()
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Output at {}", self.target_uri),
            format!("- Part files: {}", self.files.len()),
            format!("- Total rows: {}", self.total_rows()),
            format!("- Total size: {:.2} MB", self.total_bytes() as f64 / 1_048_576.0),
            format!(
                "- Success marker: {}",
                if self.has_success_marker { "present" } else { "missing" }
            ),
        ];

        for file in &self.files {
            lines.push(format!(
                "    {} ({} rows, {} row groups, {})",
                file.name, file.info.total_rows, file.info.row_groups, file.info.compression
            ));
        }

        if !self.other_objects.is_empty() {
            lines.push(format!("- Other objects: {}", self.other_objects.join(", ")));
        }

        if let Some(schema) = &self.schema {
            lines.push("- Schema:".to_string());
            for field in schema.fields() {
                lines.push(format!(
                    "    {}: {}{}",
                    field.name(),
                    field.data_type(),
                    if field.is_nullable() { "" } else { " (not null)" }
                ));
            }
        }

        lines.join("\n")
    }

    /// Sample rows as a text table
    pub fn sample_table(&self) -> Result<String> {
        Ok(pretty_format_batches(&self.sample)?.to_string())
    }
}

/// Reads back the part files under a target prefix
pub struct OutputInspector {
    writer: ParquetWriter,
}

impl OutputInspector {
    pub fn new() -> Self {
        Self {
            writer: ParquetWriter::new(),
        }
    }

    pub async fn inspect(&self, target: &StorageLocation, sample: usize) -> Result<OutputSummary> {
        let mut summary = OutputSummary {
            target_uri: target.uri().to_string(),
            files: Vec::new(),
            other_objects: Vec::new(),
            has_success_marker: false,
            schema: None,
            sample: Vec::new(),
        };

        for object in target.list_prefix().await? {
            let name = object.location.filename().unwrap_or_default().to_string();

            if name == SUCCESS_MARKER {
                summary.has_success_marker = true;
                continue;
            }
            if !is_part_file(&name) {
                summary.other_objects.push(name);
                continue;
            }

            let data = target.read_object(&object.location).await?;
            if summary.schema.is_none() {
                summary.schema = Some(self.writer.read_schema(data.clone())?);
            }

            let wanted = sample.saturating_sub(summary.sample.iter().map(|b| b.num_rows()).sum());
            if wanted > 0 {
                summary.sample.extend(self.writer.read_sample(data.clone(), wanted)?);
            }

            summary.files.push(PartFileInfo {
                name,
                info: self.writer.get_file_info(data)?,
            });
        }

        Ok(summary)
    }
}

impl Default for OutputInspector {
    fn default() -> Self {
        Self::new()
    }
}
