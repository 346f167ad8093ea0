pub mod location;

pub use location::StorageLocation;
