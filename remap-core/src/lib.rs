#![forbid(unsafe_code)]

pub mod error;

pub mod mapping {
    pub mod document;
    pub mod merge;
    pub mod proguard;
    pub mod table;
    pub mod tiny;
    pub mod writer;
}

pub mod cache {
    pub mod layout;
    pub mod store;
}

pub mod pipeline {
    pub mod coordinator;
    pub mod jobs;
}

pub mod util {
    pub mod hashing;
}

// Re-exports: stable API surface
pub use cache::layout::{ArtifactKind, CacheKey};
pub use cache::store::CacheStore;
pub use error::{RemapError, Result};
pub use mapping::document::MappingDocument;
pub use mapping::table::MappingTable;
pub use pipeline::coordinator::{BuildProduct, Coordinator};
pub use pipeline::jobs::{JobState, JobTracker};
