use crate::error::{IngestError, Result};
use crate::models::{RenamePlan, RenameTable};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use tracing::{debug, warn};

/// Renames input columns to warehouse names according to a [`RenameTable`]
pub struct ColumnMapper {
    table: RenameTable,
    strict: bool,
}

impl ColumnMapper {
    pub fn new(table: RenameTable) -> Self {
        Self {
            table,
            strict: false,
        }
    }

    /// Treat any schema drift as an error instead of a warning
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn plan(&self, schema: &Schema) -> Result<RenamePlan> {
        let plan = self.table.plan(schema)?;

        if !plan.drift.is_clean() {
            if self.strict {
                return Err(IngestError::SchemaDrift(plan.drift.summary()));
            }
            for column in &plan.drift.missing_sources {
                warn!(column = %column, "Mapped column not present in source");
            }
            for column in &plan.drift.unmapped_columns {
                warn!(column = %column, "Source column has no mapping, keeping its name");
            }
        }

        for column in plan.columns.iter().filter(|c| c.is_renamed()) {
            debug!(from = %column.source, to = %column.target, "Renaming column");
        }

        Ok(plan)
    }

    /// Relabel every batch under the planned names. Column data is shared,
    /// not copied.
    pub fn apply(
        &self,
        plan: &RenamePlan,
        schema: &Schema,
        batches: Vec<RecordBatch>,
    ) -> Result<(SchemaRef, Vec<RecordBatch>)> {
        let renamed = plan.rename_schema(schema)?;

        let batches = batches
            .into_iter()
            .map(|batch| RecordBatch::try_new(renamed.clone(), batch.columns().to_vec()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((renamed, batches))
    }
}
