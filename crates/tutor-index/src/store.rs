use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use tutor_core::config::Settings;
use tutor_core::traits::Embedder;
use tutor_core::{DocumentChunk, Error, MetadataFilter, Result, SearchResult, Subject};
use tutor_embed::{normalize_l2, truncate_for_embedding};

use crate::flat::FlatIpIndex;
use crate::partition::SubjectIndex;
use crate::persist;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub max_chars: usize,
    pub batch_size: usize,
    pub filter_overfetch: usize,
}

impl Default for StoreSettings {
    fn default() -> Self { Self { max_chars: 500, batch_size: 64, filter_overfetch: 3 } }
}

impl From<&Settings> for StoreSettings {
    fn from(s: &Settings) -> Self {
        Self {
            max_chars: s.embedding.max_chars,
            batch_size: s.embedding.batch_size,
            filter_overfetch: s.retrieval.filter_overfetch,
        }
    }
}

/// Per-subject hits in subject enumeration order. Subjects without a
/// populated index are absent, not present with an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectResults(Vec<(Subject, Vec<SearchResult>)>);

impl SubjectResults {
    pub fn get(&self, subject: &Subject) -> Option<&[SearchResult]> {
        self.0.iter().find(|(s, _)| s == subject).map(|(_, r)| r.as_slice())
    }

    pub fn contains(&self, subject: &Subject) -> bool { self.get(subject).is_some() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&Subject, &[SearchResult])> {
        self.0.iter().map(|(s, r)| (s, r.as_slice()))
    }
}

impl IntoIterator for SubjectResults {
    type Item = (Subject, Vec<SearchResult>);
    type IntoIter = std::vec::IntoIter<(Subject, Vec<SearchResult>)>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

/// Owns every subject's index.
///
/// Queries clone the subject's `Arc<SubjectIndex>` and search it without
/// holding the lock, so concurrent readers never block each other. `build`
/// and `restore` assemble a complete `SubjectIndex` first and then swap the
/// handle in one write; a reader sees the old index or the new one, never a
/// partial build.
pub struct IndexStore {
    subjects: Vec<Subject>,
    partitions: RwLock<HashMap<String, Arc<SubjectIndex>>>,
    embedder: Arc<dyn Embedder>,
    dim: OnceLock<usize>,
    settings: StoreSettings,
}

impl IndexStore {
    pub fn new(subjects: Vec<Subject>, embedder: Arc<dyn Embedder>, settings: StoreSettings) -> Self {
        Self { subjects, partitions: RwLock::new(HashMap::new()), embedder, dim: OnceLock::new(), settings }
    }

    /// Subjects in enumeration order.
    pub fn subjects(&self) -> &[Subject] { &self.subjects }

    /// Embedding dimension, once the first embedding or restored index fixed it.
    pub fn dimension(&self) -> Option<usize> { self.dim.get().copied() }

    pub fn embedder_id(&self) -> &str { self.embedder.embedder_id() }

    fn canonical(&self, subject: &Subject) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.matches(subject.name()))
    }

    fn establish_dim(&self, actual: usize) -> Result<()> {
        let expected = *self.dim.get_or_init(|| actual);
        if expected == actual { Ok(()) } else { Err(Error::DimensionMismatch { expected, actual }) }
    }

    /// Embed one text after applying the character budget.
    ///
    /// A provider failure is replaced by a zero vector once the dimension is
    /// known, so bulk builds keep going. Before that there is nothing sane to
    /// substitute and the failure propagates.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let text = truncate_for_embedding(text, self.settings.max_chars);
        let outcome = self.embedder.embed(text).and_then(|v| {
            if v.is_empty() { Err(Error::Embedding("provider returned an empty vector".into())) } else { Ok(v) }
        });
        match outcome {
            Ok(vector) => {
                self.establish_dim(vector.len())?;
                Ok(vector)
            }
            Err(err) => match self.dim.get() {
                Some(&dim) => {
                    warn!(error = %err, chars = text.chars().count(), "embedding failed, substituting zero vector");
                    Ok(vec![0.0; dim])
                }
                None => Err(err),
            },
        }
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vector = self.embed_text(query)?;
        normalize_l2(&mut vector);
        Ok(vector)
    }

    fn embed_all(&self, subject: &Subject, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(format!("embedding {subject}"));
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            for text in batch {
                let mut v = self.embed_text(text)?;
                normalize_l2(&mut v);
                vectors.push(v);
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        Ok(vectors)
    }

    /// Embed and index one subject's chunks, replacing any previous index.
    ///
    /// An empty chunk list is logged and skipped.
    pub fn build(&self, subject: &Subject, chunks: Vec<DocumentChunk>) -> Result<()> {
        let subject = self
            .canonical(subject)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("subject '{subject}' is not configured")))?;
        if chunks.is_empty() {
            warn!(%subject, "no documents to index, skipping");
            return Ok(());
        }
        info!(%subject, chunks = chunks.len(), "building index");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embed_all(&subject, &texts)?;
        let dim = self.dim.get().copied().unwrap_or_default();
        let mut index = FlatIpIndex::new(dim);
        for vector in &vectors {
            index.add(vector)?;
        }
        let partition = SubjectIndex::new(subject.clone(), index, chunks, self.embedder.embedder_id())?;
        info!(%subject, vectors = partition.len(), dim, "index built");
        self.install(partition);
        Ok(())
    }

    fn install(&self, partition: SubjectIndex) {
        let key = partition.subject().key();
        let mut guard = self.partitions.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key, Arc::new(partition));
    }

    /// Current handle for a subject, if it has been built or restored.
    pub fn partition(&self, subject: &Subject) -> Option<Arc<SubjectIndex>> {
        let guard = self.partitions.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&subject.key()).cloned()
    }

    /// Top-k search within one subject. Missing or empty indices yield no hits.
    pub fn search(&self, query: &str, subject: &Subject, top_k: usize, filter: Option<&MetadataFilter>) -> Result<Vec<SearchResult>> {
        let Some(partition) = self.partition(subject).filter(|p| !p.is_empty()) else {
            debug!(%subject, "no index for subject");
            return Ok(Vec::new());
        };
        let query_vec = self.embed_query(query)?;
        Ok(partition.search(&query_vec, top_k, filter, self.settings.filter_overfetch))
    }

    /// Search every subject that has a populated index. The query is embedded
    /// once and reused; each subject is ranked independently.
    pub fn search_all(&self, query: &str, top_k: usize) -> Result<SubjectResults> {
        let populated: Vec<Arc<SubjectIndex>> = self
            .subjects
            .iter()
            .filter_map(|s| self.partition(s))
            .filter(|p| !p.is_empty())
            .collect();
        if populated.is_empty() {
            return Ok(SubjectResults::default());
        }
        let query_vec = self.embed_query(query)?;
        let results = populated
            .iter()
            .map(|p| (p.subject().clone(), p.search(&query_vec, top_k, None, self.settings.filter_overfetch)))
            .collect();
        Ok(SubjectResults(results))
    }

    /// Write artifacts for every populated subject. Returns how many were written.
    pub fn persist(&self, dir: &Path) -> Result<usize> {
        let mut written = 0;
        for subject in &self.subjects {
            if let Some(partition) = self.partition(subject).filter(|p| !p.is_empty()) {
                persist::write_subject(dir, &partition)?;
                info!(%subject, vectors = partition.len(), dir = %dir.display(), "saved index");
                written += 1;
            }
        }
        Ok(written)
    }

    /// Delete the artifact pairs of subjects that have no populated index.
    /// Run after a full rebuild so a subject that lost all its chunks is not
    /// restored from an older run. Returns how many pairs were removed.
    pub fn prune(&self, dir: &Path) -> Result<usize> {
        let mut removed = 0;
        for subject in &self.subjects {
            if self.partition(subject).is_some_and(|p| !p.is_empty()) {
                continue;
            }
            if persist::remove_subject(dir, subject)? {
                info!(%subject, dir = %dir.display(), "removed stale index");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Load whatever artifact pairs exist under `dir`. Subjects without a pair
    /// keep their current state. Returns how many subjects were loaded.
    ///
    /// Every pair is read and checked before any is installed: one corrupt or
    /// dimension-mismatched pair fails the whole call and leaves the store as
    /// it was.
    pub fn restore(&self, dir: &Path) -> Result<usize> {
        let mut staged = Vec::new();
        let mut dim = self.dim.get().copied();
        for subject in &self.subjects {
            let Some(partition) = persist::read_subject(dir, subject)? else {
                debug!(%subject, dir = %dir.display(), "no artifacts for subject");
                continue;
            };
            if !partition.is_empty() {
                let expected = *dim.get_or_insert(partition.dim());
                if expected != partition.dim() {
                    return Err(Error::DimensionMismatch { expected, actual: partition.dim() });
                }
            }
            if partition.embedder_id() != self.embedder.embedder_id() {
                warn!(%subject, stored = partition.embedder_id(), current = self.embedder.embedder_id(), "index was built with a different embedder");
            }
            staged.push(partition);
        }
        if let Some(dim) = dim {
            self.establish_dim(dim)?;
        }
        let loaded = staged.len();
        for partition in staged {
            info!(subject = %partition.subject(), vectors = partition.len(), "loaded index");
            self.install(partition);
        }
        Ok(loaded)
    }

    /// Vector count per subject in enumeration order; 0 when not built.
    pub fn stats(&self) -> Vec<(Subject, usize)> {
        self.subjects
            .iter()
            .map(|s| (s.clone(), self.partition(s).map_or(0, |p| p.len())))
            .collect()
    }
}
