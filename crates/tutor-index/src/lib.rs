//! Per-subject similarity indices.
//!
//! Each subject owns one flat inner-product index bound positionally to its
//! chunk records. Indices are built once in bulk, persisted as an index/docs
//! artifact pair and reloaded at start-up; there is no online deletion.

pub mod flat;
pub mod partition;
pub mod persist;
pub mod store;

pub use flat::{Candidate, FlatIpIndex};
pub use partition::SubjectIndex;
pub use store::{IndexStore, StoreSettings, SubjectResults};
