use bronze_ingest::cli::{run, Cli};
use bronze_ingest::error::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
