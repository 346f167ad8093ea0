pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{is_part_file, part_file_name};
pub use progress::ProgressReporter;
