use crate::error::{IngestError, Result};
use crate::models::SourceConfig;
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A parsed CSV source: the inferred schema and every row as Arrow batches
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    /// Size of the decoded input in bytes
    pub input_bytes: usize,
}

impl CsvSource {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

pub struct CsvSourceReader {
    has_header: bool,
    delimiter: u8,
    quote: Option<u8>,
    batch_size: usize,
    infer_max_records: Option<usize>,
    encoding: &'static Encoding,
}

impl CsvSourceReader {
    pub fn new() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: None,
            batch_size: DEFAULT_BATCH_SIZE,
            infer_max_records: None,
            encoding: UTF_8,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let encoding = Encoding::for_label(config.encoding.as_bytes()).ok_or_else(|| {
            IngestError::Config(format!("Unknown source encoding: {}", config.encoding))
        })?;

        Ok(Self {
            has_header: config.has_header,
            delimiter: config.delimiter_byte()?,
            quote: config.quote_byte()?,
            batch_size: config.batch_size.max(1),
            infer_max_records: config.infer_max_records,
            encoding,
        })
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_infer_max_records(mut self, max_records: Option<usize>) -> Self {
        self.infer_max_records = max_records;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Transcode the raw object to UTF-8, dropping any byte order mark.
    ///
    /// UTF-8 input without a BOM is passed through without copying.
    pub fn decode(&self, raw: Bytes) -> Bytes {
        let (text, actual, had_errors) = self.encoding.decode(&raw);
        if had_errors {
            warn!(
                encoding = actual.name(),
                "Source contained malformed sequences, replaced with U+FFFD"
            );
        }

        let transcoded = match text {
            Cow::Borrowed(s) if s.len() == raw.len() => None,
            Cow::Borrowed(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            Cow::Owned(s) => Some(Bytes::from(s.into_bytes())),
        };
        transcoded.unwrap_or(raw)
    }

    /// Infer column names and types from decoded CSV data
    pub fn infer_schema(&self, data: &[u8], uri: &str) -> Result<SchemaRef> {
        self.ensure_first_line(data, uri)?;
        let data = self.truncate_long_records(data)?;
        self.infer_normalised(&data)
    }

    /// Infer the schema and parse every record
    pub fn read(&self, data: &[u8], uri: &str) -> Result<CsvSource> {
        self.ensure_first_line(data, uri)?;
        let normalised = self.truncate_long_records(data)?;
        let schema = self.infer_normalised(&normalised)?;

        let mut builder = ReaderBuilder::new(schema.clone())
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .with_batch_size(self.batch_size)
            .with_truncated_rows(true);
        if let Some(quote) = self.quote {
            builder = builder.with_quote(quote);
        }

        let batches = builder
            .build(&normalised[..])?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let source = CsvSource {
            schema,
            batches,
            input_bytes: data.len(),
        };
        debug!(
            rows = source.num_rows(),
            batches = source.batches.len(),
            bytes = source.input_bytes,
            "Parsed source records"
        );
        Ok(source)
    }

    fn infer_normalised(&self, data: &[u8]) -> Result<SchemaRef> {
        let (schema, sampled) = self.format().infer_schema(data, self.infer_max_records)?;
        debug!(
            columns = schema.fields().len(),
            sampled_records = sampled,
            "Inferred source schema"
        );

        Ok(Arc::new(normalise_header(schema)))
    }

    /// Records wider than the first line lose their extra fields. Input
    /// without such records is returned as is.
    fn truncate_long_records<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let mut reader = self.csv_reader(data);
        let mut record = csv::ByteRecord::new();

        if !reader.read_byte_record(&mut record)? {
            return Ok(Cow::Borrowed(data));
        }
        let width = record.len();

        let mut long_records = 0usize;
        while reader.read_byte_record(&mut record)? {
            if record.len() > width {
                long_records += 1;
            }
        }
        if long_records == 0 {
            return Ok(Cow::Borrowed(data));
        }

        warn!(
            records = long_records,
            columns = width,
            "Dropping extra fields from records wider than the header"
        );

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote.unwrap_or(b'"'))
            .from_writer(Vec::with_capacity(data.len()));

        let mut reader = self.csv_reader(data);
        while reader.read_byte_record(&mut record)? {
            if record.len() > width {
                record.truncate(width);
            }
            writer.write_byte_record(&record)?;
        }

        writer
            .into_inner()
            .map(Cow::Owned)
            .map_err(|e| IngestError::Io(e.into_error()))
    }

    fn format(&self) -> Format {
        let format = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .with_truncated_rows(true);
        match self.quote {
            Some(quote) => format.with_quote(quote),
            None => format,
        }
    }

    fn csv_reader<'a>(&self, data: &'a [u8]) -> csv::Reader<&'a [u8]> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote.unwrap_or(b'"'))
            .from_reader(data)
    }

    /// A source without even a header line has no columns to map
    fn ensure_first_line(&self, data: &[u8], uri: &str) -> Result<()> {
        let mut record = csv::ByteRecord::new();
        if !self.csv_reader(data).read_byte_record(&mut record)? {
            return Err(IngestError::EmptySource {
                uri: uri.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CsvSourceReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Header cells left blank become `_c{index}`; names that occur more than
/// once get their index appended (`Notes0`, `Notes3`).
fn normalise_header(schema: Schema) -> Schema {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for field in schema.fields() {
        *counts.entry(field.name().as_str()).or_default() += 1;
    }

    let needs_rename = |name: &str| {
        name.trim().is_empty() || counts.get(name).copied().unwrap_or(0) > 1
    };
    if !schema.fields().iter().any(|f| needs_rename(f.name().as_str())) {
        return schema;
    }

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let name = field.name();
            if name.trim().is_empty() {
                field.as_ref().clone().with_name(format!("_c{}", i))
            } else if needs_rename(name.as_str()) {
                field.as_ref().clone().with_name(format!("{}{}", name, i))
            } else {
                field.as_ref().clone()
            }
        })
        .collect();

    Schema::new_with_metadata(fields, schema.metadata().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;
    use pretty_assertions::assert_eq;

    const LOANS: &str = "Loan Number,Region,Interest Rate,Original Principal Amount (US$)\n\
                         IBRD00010,EUROPE AND CENTRAL ASIA,4.25,250000000\n\
                         IBRD00020,LATIN AMERICA AND CARIBBEAN,,40000000\n\
                         IBRD00030,\"EAST ASIA, PACIFIC\",4.5,75000000\n";

    #[test]
    fn test_infers_types_from_all_records() -> Result<()> {
        let reader = CsvSourceReader::new();
        let schema = reader.infer_schema(LOANS.as_bytes(), "memory:///loans.csv")?;

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Loan Number",
                "Region",
                "Interest Rate",
                "Original Principal Amount (US$)"
            ]
        );
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        assert_eq!(schema.field(3).data_type(), &DataType::Int64);
        Ok(())
    }

    #[test]
    fn test_read_parses_quoted_fields_and_nulls() -> Result<()> {
        let reader = CsvSourceReader::new().with_batch_size(2);
        let source = reader.read(LOANS.as_bytes(), "memory:///loans.csv")?;

        assert_eq!(source.num_rows(), 3);
        assert_eq!(source.batches.len(), 2);

        let regions = source.batches[1]
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(regions.value(0), "EAST ASIA, PACIFIC");

        let rates = source.batches[0]
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(rates.is_null(1));

        let principal = source.batches[0]
            .column(3)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(principal.value(0), 250_000_000);
        Ok(())
    }

    #[test]
    fn test_header_only_source_has_schema_and_no_rows() -> Result<()> {
        let reader = CsvSourceReader::new();
        let source = reader.read(b"Loan Number,Region\n", "memory:///loans.csv")?;

        assert_eq!(source.schema.fields().len(), 2);
        assert_eq!(source.num_rows(), 0);
        Ok(())
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let reader = CsvSourceReader::new();
        let result = reader.read(b"", "memory:///empty.csv");

        assert!(matches!(result, Err(IngestError::EmptySource { .. })));
    }

    #[test]
    fn test_blank_header_cells_are_named() -> Result<()> {
        let reader = CsvSourceReader::new();
        let schema = reader.infer_schema(b"Region,,Borrower\nA,1,B\n", "memory:///x.csv")?;

        assert_eq!(schema.field(1).name(), "_c1");
        Ok(())
    }

    #[test]
    fn test_repeated_header_names_get_column_index() -> Result<()> {
        let reader = CsvSourceReader::new();
        let source = reader.read(b"Notes,Region,Notes\na,EU,b\n", "memory:///x.csv")?;

        let names: Vec<&str> = source
            .schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["Notes0", "Region", "Notes2"]);
        assert_eq!(source.num_rows(), 1);
        Ok(())
    }

    #[test]
    fn test_header_names_differing_in_case_are_kept() -> Result<()> {
        let reader = CsvSourceReader::new();
        let schema = reader.infer_schema(b"Region,REGION\nEU,AFRICA\n", "memory:///x.csv")?;

        assert_eq!(schema.field(0).name(), "Region");
        assert_eq!(schema.field(1).name(), "REGION");
        Ok(())
    }

    #[test]
    fn test_long_rows_lose_extra_fields() -> Result<()> {
        let reader = CsvSourceReader::new();
        let source = reader.read(b"A,B\n1,2\n3,4,5\n\"x,y\",6\n", "memory:///x.csv")?;

        assert_eq!(source.schema.fields().len(), 2);
        assert_eq!(source.num_rows(), 3);

        let batch = &source.batches[0];
        let a = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(a.value(1), "3");
        assert_eq!(a.value(2), "x,y");
        let b = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(b.value(1), 4);
        Ok(())
    }

    #[test]
    fn test_short_rows_are_padded_with_nulls() -> Result<()> {
        let reader = CsvSourceReader::new();
        let source = reader.read(b"A,B\n1,2\n3\n", "memory:///x.csv")?;

        let b = source.batches[0]
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert!(b.is_null(1));
        Ok(())
    }

    #[test]
    fn test_headerless_source_gets_generated_names() -> Result<()> {
        let reader = CsvSourceReader::new().with_header(false).with_delimiter(b';');
        let source = reader.read(b"a;1\nb;2\n", "memory:///x.csv")?;

        assert_eq!(source.schema.field(0).name(), "column_1");
        assert_eq!(source.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn test_decode_latin1_and_strip_bom() {
        let reader = CsvSourceReader::new().with_encoding(encoding_rs::WINDOWS_1252);
        let decoded = reader.decode(Bytes::from_static(b"Borrower\nC\xf4te d'Ivoire\n"));
        assert_eq!(&decoded[..], "Borrower\nCôte d'Ivoire\n".as_bytes());

        let reader = CsvSourceReader::new();
        let decoded = reader.decode(Bytes::from_static(b"\xef\xbb\xbfRegion\nEU\n"));
        assert_eq!(&decoded[..], b"Region\nEU\n");
    }
}
