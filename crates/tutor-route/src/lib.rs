//! Query routing: which language a question is in, which subject it belongs
//! to, and whether it is a computational problem.

pub mod classifier;
pub mod language;

pub use classifier::{build_metadata_filter, Classification, SubjectClassifier};
pub use language::{LanguageIdentifier, LanguageProfile, SECONDARY_SCRIPT_RANGE};
