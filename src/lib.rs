pub mod cli;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod storage;
pub mod utils;
pub mod writers;

pub use error::{IngestError, Result};
pub use models::JobConfig;
pub use processors::BronzeJob;
