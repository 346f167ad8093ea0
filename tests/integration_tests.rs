use arrow::array::{Array, Float64Array, StringArray, TimestampMicrosecondArray};
use bronze_ingest::models::{JobConfig, WriteMode};
use bronze_ingest::processors::{BronzeJob, OutputInspector};
use bronze_ingest::storage::StorageLocation;
use bronze_ingest::utils::ProgressReporter;
use bronze_ingest::writers::ParquetWriter;
use bronze_ingest::IngestError;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const IBRD_SAMPLE: &str = "\
End of Period,Loan Number,Region,Country / Economy Code,Country / Economy,Borrower,Loan Status,Interest Rate,Original Principal Amount (US$),Borrower's Obligation (US$),Effective Date (Most Recent)
2024-01-31,IBRD00010,EUROPE AND CENTRAL ASIA,FR,France,CREDIT NATIONAL,Fully Repaid,4.25,250000000,0,1947-06-09
2024-01-31,IBRD00020,LATIN AMERICA AND CARIBBEAN,CL,Chile,\"Ministry of Finance, Chile\",Fully Repaid,4.5,13500000,0,1948-03-25
2024-01-31,IBRD00030,EUROPE AND CENTRAL ASIA,NL,Netherlands,Government of the Netherlands,Fully Repaid,,195000000,0,1947-08-08
2024-01-31,IBRD00040,EUROPE AND CENTRAL ASIA,DK,Denmark,Kingdom of Denmark,Fully Repaid,4.25,40000000,0,1947-10-17
2024-01-31,IBRD00050,EUROPE AND CENTRAL ASIA,LU,Luxembourg,Grand Duchy of Luxembourg,Fully Repaid,4.25,12000000,0,1947-08-28
";

fn setup(partitions: usize) -> (TempDir, JobConfig) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let source = dir.path().join("raw").join("synthetic_ibrd_loans.csv");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, IBRD_SAMPLE).unwrap();

    let mut config = JobConfig::default();
    config.job_name = "integration".to_string();
    config.source.uri = source.to_string_lossy().to_string();
    config.target.uri = dir
        .path()
        .join("parquet")
        .join("synthetic_data")
        .to_string_lossy()
        .to_string();
    config.target.output_partitions = partitions;
    config.source.max_split_bytes = 64;
    (dir, config)
}

#[tokio::test]
async fn test_end_to_end_local_run() {
    let (dir, config) = setup(2);
    let output_dir = dir.path().join("parquet").join("synthetic_data");

    let job = BronzeJob::from_config(config).unwrap().with_max_workers(2);
    let report = job.run(&ProgressReporter::silent()).await.unwrap();

    assert_eq!(report.rows, 5);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].rows, 3);
    assert_eq!(report.files[1].rows, 2);
    assert_eq!(report.renamed_columns, 11);
    assert!(report.drift.unmapped_columns.is_empty());
    assert!(output_dir.join("_SUCCESS").exists());

    let first = fs::read(output_dir.join(&report.files[0].name)).unwrap();
    let writer = ParquetWriter::new();
    let batches = writer.read_sample(first.into(), 10).unwrap();
    let batch = &batches[0];
    let schema = batch.schema();

    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "END_OF_PERIOD",
            "LOAN_NUMBER",
            "REGION",
            "COUNTRY_ECONOMY_CODE",
            "COUNTRY_ECONOMY",
            "BORROWER",
            "LOAN_STATUS",
            "INTEREST_RATE",
            "ORIGINAL_PRINCIPAL_AMOUNT_USD",
            "BORROWERS_OBLIGATION_USD",
            "EFFECTIVE_DATE",
            "INGESTION_DATE",
            "SOURCE_FILE_NAME",
        ]
    );

    let borrowers = batch
        .column(5)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(borrowers.value(1), "Ministry of Finance, Chile");

    let rates = batch
        .column(7)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!(rates.is_null(2));

    let ingested = batch
        .column(11)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();
    assert_eq!(
        ingested.value(0),
        report.ingestion_time.timestamp_micros()
    );

    let sources = batch
        .column(12)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert!(sources.value(0).starts_with("file:///"));
    assert!(sources.value(0).ends_with("raw/synthetic_ibrd_loans.csv"));
}

#[tokio::test]
async fn test_rerun_leaves_no_stale_parts() {
    let (_dir, config) = setup(10);
    let target_uri = config.target.uri.clone();

    let job = BronzeJob::from_config(config.clone()).unwrap();
    job.run(&ProgressReporter::silent()).await.unwrap();

    let mut fewer = config;
    fewer.target.output_partitions = 1;
    let report = BronzeJob::from_config(fewer)
        .unwrap()
        .run(&ProgressReporter::silent())
        .await
        .unwrap();
    assert_eq!(report.deleted_objects, 6);

    let target = StorageLocation::parse(&target_uri).unwrap();
    let summary = OutputInspector::new().inspect(&target, 3).await.unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.total_rows(), 5);
    assert!(summary.has_success_marker);
    assert_eq!(summary.sample.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
}

#[tokio::test]
async fn test_small_file_with_default_splits_writes_one_part() {
    let (_dir, mut config) = setup(10);
    config.source.max_split_bytes = JobConfig::default().source.max_split_bytes;

    let report = BronzeJob::from_config(config)
        .unwrap()
        .run(&ProgressReporter::silent())
        .await
        .unwrap();

    assert_eq!(report.rows, 5);
    assert_eq!(report.files.len(), 1);
}

#[tokio::test]
async fn test_missing_source_fails_after_clearing_target() {
    let (dir, mut config) = setup(1);
    config.source.uri = dir.path().join("raw").join("nope.csv").to_string_lossy().to_string();

    let stale = dir.path().join("parquet").join("synthetic_data");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("part-old.parquet"), b"stale").unwrap();

    let result = BronzeJob::from_config(config)
        .unwrap()
        .run(&ProgressReporter::silent())
        .await;

    assert!(matches!(result, Err(IngestError::SourceNotFound { .. })));
    assert!(!stale.join("part-old.parquet").exists());
}

#[tokio::test]
async fn test_strict_validation_reports_drift() {
    let (_dir, mut config) = setup(1);
    config.schema.strict = true;
    config.target.mode = WriteMode::ErrorIfExists;

    let job = BronzeJob::from_config(config).unwrap();
    let result = job.validate(&ProgressReporter::silent()).await;

    match result {
        Err(IngestError::SchemaDrift(message)) => {
            assert!(message.contains("Guarantor"));
        }
        other => panic!("expected schema drift, got {:?}", other.map(|r| r.rows)),
    }
}
