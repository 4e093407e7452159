//! Question answering over the subject indices: routing, retrieval with
//! fallback, context assembly, generation and output formatting.

pub mod context;
pub mod engine;
pub mod format;
pub mod generate;
pub mod prompt;
pub mod response;

pub use context::build_context;
pub use engine::{EngineStats, Retrieval, RetrievalPath, RetrievedChunk, TutorEngine};
pub use format::{OutputFormatter, ResponseFormatter};
pub use generate::OllamaGenerator;
pub use response::{BulletPoint, GeneralAnswer, MathAnswer, MathStep, ResponseBody, ResponseMetadata, TutorResponse};
