pub mod config;
pub mod error;
pub mod loader;
pub mod routing;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{ChunkMetadata, DocumentChunk, Language, MetadataFilter, RoutingDecision, SearchResult, Subject};
