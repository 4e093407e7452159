//! Reads pre-extracted chunk records for ingestion.
//!
//! Text extraction and chunking happen upstream; this loader only walks a
//! directory of `*.jsonl` files (one `{text, metadata}` record per line) and
//! groups the records by subject in enumeration order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::{DocumentChunk, Subject};

pub struct ChunkLoader {
    subjects: Vec<Subject>,
}

impl ChunkLoader {
    pub fn new(subjects: Vec<Subject>) -> Self { Self { subjects } }

    /// Load every record under `data_dir`, grouped per configured subject.
    ///
    /// Subjects without records are still present with an empty list so the
    /// caller can decide to skip them. Records whose `metadata.subject` is
    /// missing or unknown are dropped with a warning.
    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<(Subject, Vec<DocumentChunk>)>> {
        let files = list_jsonl_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no .jsonl chunk files found");
        }
        let mut grouped: Vec<(Subject, Vec<DocumentChunk>)> =
            self.subjects.iter().map(|s| (s.clone(), Vec::new())).collect();
        let mut skipped = 0usize;
        for (file_index, path) in files.iter().enumerate() {
            info!(file = %path.display(), n = file_index + 1, of = files.len(), "reading chunk file");
            for chunk in read_chunk_file(path)? {
                let slot = chunk
                    .metadata
                    .subject
                    .as_deref()
                    .and_then(|raw| grouped.iter_mut().find(|(s, _)| s.matches(raw)));
                match slot {
                    Some((_, chunks)) => chunks.push(chunk),
                    None => {
                        skipped += 1;
                        warn!(file = %path.display(), subject = ?chunk.metadata.subject, "skipping chunk with unknown subject");
                    }
                }
            }
        }
        let total: usize = grouped.iter().map(|(_, c)| c.len()).sum();
        info!(files = files.len(), chunks = total, skipped, "loaded chunk records");
        Ok(grouped)
    }
}

/// Parse one JSON-lines file. Blank lines are ignored; a malformed line is an error
/// naming the file and line.
pub fn read_chunk_file(path: &Path) -> Result<Vec<DocumentChunk>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
    };
    let mut chunks = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        let chunk: DocumentChunk = serde_json::from_str(line).map_err(|e| Error::CorruptArtifact {
            path: path.to_path_buf(),
            reason: format!("line {}: {e}", line_no + 1),
        })?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn list_jsonl_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("jsonl"))
        .collect();
    files.sort();
    files
}
