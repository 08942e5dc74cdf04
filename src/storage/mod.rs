// Storage layer module
pub mod extraction_cache;

pub use extraction_cache::ExtractionCache;
