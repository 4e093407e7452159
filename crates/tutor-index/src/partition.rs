use tracing::debug;

use tutor_core::{DocumentChunk, Error, MetadataFilter, Result, SearchResult, Subject};

use crate::flat::FlatIpIndex;

/// One subject's index and its chunk records as a single owned unit.
///
/// Row `i` of the index is the embedding of `chunks[i]`. The pairing is fixed
/// at construction and the value is never mutated afterwards; rebuilding a
/// subject produces a new `SubjectIndex`.
#[derive(Debug, Clone)]
pub struct SubjectIndex {
    subject: Subject,
    index: FlatIpIndex,
    chunks: Vec<DocumentChunk>,
    embedder_id: String,
}

impl SubjectIndex {
    pub fn new(subject: Subject, index: FlatIpIndex, chunks: Vec<DocumentChunk>, embedder_id: impl Into<String>) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(Error::Operation(format!(
                "{subject}: index holds {} vectors but {} chunk records were supplied",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { subject, index, chunks, embedder_id: embedder_id.into() })
    }

    pub fn subject(&self) -> &Subject { &self.subject }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn dim(&self) -> usize { self.index.dim() }

    pub fn index(&self) -> &FlatIpIndex { &self.index }

    pub fn chunks(&self) -> &[DocumentChunk] { &self.chunks }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }

    /// Rank chunks against a normalized query vector.
    ///
    /// With a non-empty filter, `top_k * overfetch` candidates are pulled to
    /// absorb filter attrition; candidates are then walked in rank order and
    /// collection stops at `top_k`. The result is never padded.
    pub fn search(&self, query: &[f32], top_k: usize, filter: Option<&MetadataFilter>, overfetch: usize) -> Vec<SearchResult> {
        if top_k == 0 || self.is_empty() {
            return Vec::new();
        }
        let filter = filter.filter(|f| !f.is_empty());
        let search_k = if filter.is_some() { top_k.saturating_mul(overfetch.max(1)) } else { top_k };
        let candidates = self.index.search(query, search_k.min(self.len()));

        let mut results = Vec::with_capacity(top_k.min(candidates.len()));
        for candidate in candidates {
            let Some(chunk) = self.chunks.get(candidate.position) else { continue };
            if let Some(filter) = filter {
                if !filter.matches(&chunk.metadata) {
                    continue;
                }
            }
            results.push(SearchResult { chunk: chunk.clone(), score: candidate.score });
            if results.len() >= top_k {
                break;
            }
        }
        debug!(subject = %self.subject, top_k, search_k, hits = results.len(), "subject search");
        results
    }
}
