use crate::error::{IngestError, Result};
use arrow::datatypes::{Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// One entry of a rename table: input header → warehouse column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source: String,
    pub target: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Ordered rename table. Columns not listed pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameTable(Vec<ColumnMapping>);

const IBRD_LOANS: &[(&str, &str)] = &[
    ("End of Period", "END_OF_PERIOD"),
    ("Loan Number", "LOAN_NUMBER"),
    ("Region", "REGION"),
    ("Country / Economy Code", "COUNTRY_ECONOMY_CODE"),
    ("Country / Economy", "COUNTRY_ECONOMY"),
    ("Borrower", "BORROWER"),
    (
        "Guarantor Country / Economy Code",
        "GUARANTOR_COUNTRY_ECONOMY_CODE",
    ),
    ("Guarantor", "GUARANTOR"),
    ("Loan Type", "LOAN_TYPE"),
    ("Loan Status", "LOAN_STATUS"),
    ("Interest Rate", "INTEREST_RATE"),
    ("Currency of Commitment", "CURRENCY_OF_COMMITMENT"),
    ("Project ID", "PROJECT_ID"),
    ("Project Name", "PROJECT_NAME"),
    (
        "Original Principal Amount (US$)",
        "ORIGINAL_PRINCIPAL_AMOUNT_USD",
    ),
    ("Cancelled Amount (US$)", "CANCELLED_AMOUNT_USD"),
    ("Undisbursed Amount (US$)", "UNDISBURSED_AMOUNT_USD"),
    ("Disbursed Amount (US$)", "DISBURSED_AMOUNT_USD"),
    ("Repaid to IBRD (US$)", "REPAID_TO_IBRD_USD"),
    ("Due to IBRD (US$)", "DUE_TO_IBRD_USD"),
    ("Exchange Adjustment (US$)", "EXCHANGE_ADJUSTMENT_USD"),
    ("Borrower's Obligation (US$)", "BORROWERS_OBLIGATION_USD"),
    ("Sold 3rd Party (US$)", "SOLD_3RD_PARTY_USD"),
    ("Repaid 3rd Party (US$)", "REPAID_3RD_PARTY_USD"),
    ("Due 3rd Party (US$)", "DUE_3RD_PARTY_USD"),
    ("Loans Held (US$)", "LOANS_HELD_USD"),
    ("First Repayment Date", "FIRST_REPAYMENT_DATE"),
    ("Last Repayment Date", "LAST_REPAYMENT_DATE"),
    ("Agreement Signing Date", "AGREEMENT_SIGNING_DATE"),
    ("Board Approval Date", "BOARD_APPROVAL_DATE"),
    ("Effective Date (Most Recent)", "EFFECTIVE_DATE"),
    ("Closed Date (Most Recent)", "CLOSED_DATE"),
    ("Last Disbursement Date", "LAST_DISBURSEMENT_DATE"),
];

impl RenameTable {
    pub fn new(mappings: Vec<ColumnMapping>) -> Self {
        Self(mappings)
    }

    /// Rename table for the IBRD loans Bronze table
    pub fn ibrd_loans() -> Self {
        Self(
            IBRD_LOANS
                .iter()
                .map(|(source, target)| ColumnMapping::new(*source, *target))
                .collect(),
        )
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|m| m.source == source)
            .map(|m| m.target.as_str())
    }

    /// Reject empty names and tables that map a source or target twice
    pub fn validate(&self) -> Result<()> {
        let mut sources = HashSet::with_capacity(self.0.len());
        let mut targets = HashSet::with_capacity(self.0.len());

        for mapping in &self.0 {
            if mapping.source.trim().is_empty() || mapping.target.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "Rename entry has an empty name: '{}' -> '{}'",
                    mapping.source, mapping.target
                )));
            }
            if !sources.insert(mapping.source.as_str()) {
                return Err(IngestError::Config(format!(
                    "Source column '{}' is mapped more than once",
                    mapping.source
                )));
            }
            if !targets.insert(mapping.target.as_str()) {
                return Err(IngestError::Config(format!(
                    "Target column '{}' is produced by more than one mapping",
                    mapping.target
                )));
            }
        }

        Ok(())
    }

    /// Work out the output name of every input column and report drift
    /// between the table and the input header.
    pub fn plan(&self, schema: &Schema) -> Result<RenamePlan> {
        let input: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

        let columns: Vec<ColumnRename> = input
            .iter()
            .map(|&name| ColumnRename {
                source: name.to_string(),
                target: self.target_for(name).unwrap_or(name).to_string(),
            })
            .collect();

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.target.as_str()) {
                return Err(IngestError::DuplicateColumn {
                    column: column.target.clone(),
                });
            }
        }

        let missing_sources = self
            .0
            .iter()
            .filter(|m| !input.contains(&m.source.as_str()))
            .map(|m| m.source.clone())
            .collect();

        let unmapped_columns = input
            .iter()
            .filter(|name| self.target_for(name).is_none())
            .map(|name| name.to_string())
            .collect();

        Ok(RenamePlan {
            columns,
            drift: DriftReport {
                missing_sources,
                unmapped_columns,
            },
        })
    }
}

impl Default for RenameTable {
    fn default() -> Self {
        Self::ibrd_loans()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRename {
    pub source: String,
    pub target: String,
}

impl ColumnRename {
    pub fn is_renamed(&self) -> bool {
        self.source != self.target
    }
}

/// Differences between the rename table and the header actually received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Table entries whose source column is not in the input
    pub missing_sources: Vec<String>,
    /// Input columns the table does not mention
    pub unmapped_columns: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.missing_sources.is_empty() && self.unmapped_columns.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "no schema drift".to_string();
        }

        let mut parts = Vec::new();
        if !self.missing_sources.is_empty() {
            parts.push(format!(
                "missing from input: [{}]",
                self.missing_sources.join(", ")
            ));
        }
        if !self.unmapped_columns.is_empty() {
            parts.push(format!(
                "not in rename table: [{}]",
                self.unmapped_columns.join(", ")
            ));
        }
        parts.join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub columns: Vec<ColumnRename>,
    pub drift: DriftReport,
}

impl RenamePlan {
    pub fn renamed_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_renamed()).count()
    }

    /// Same fields, types and metadata as `schema`, under the planned names
    pub fn rename_schema(&self, schema: &Schema) -> Result<SchemaRef> {
        if schema.fields().len() != self.columns.len() {
            return Err(IngestError::InvalidFormat(format!(
                "Rename plan covers {} columns but the batch has {}",
                self.columns.len(),
                schema.fields().len()
            )));
        }

        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .zip(&self.columns)
            .map(|(field, column)| field.as_ref().clone().with_name(column.target.clone()))
            .collect();

        Ok(Arc::new(Schema::new_with_metadata(
            fields,
            schema.metadata().clone(),
        )))
    }
}
