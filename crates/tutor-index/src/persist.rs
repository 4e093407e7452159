//! On-disk artifacts: `<subject>_index.bin` + `<subject>_docs.json`.
//!
//! Index layout (little-endian):
//! `magic[4] | version u32 | dim u32 | count u64 | blake3(docs)[32] | count*dim f32`.
//! The digest ties the index to the exact docs file it was written with, so a
//! pair that drifted apart is rejected instead of silently misaligned.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tutor_core::{DocumentChunk, Error, Result, Subject};

use crate::flat::FlatIpIndex;
use crate::partition::SubjectIndex;

const MAGIC: &[u8; 4] = b"TIDX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 32;

#[derive(Serialize, Deserialize)]
struct DocsArtifact {
    subject: String,
    embedder_id: String,
    built_at: DateTime<Utc>,
    chunks: Vec<DocumentChunk>,
}

pub fn index_path(dir: &Path, subject: &Subject) -> PathBuf { dir.join(format!("{}_index.bin", subject.key())) }

pub fn docs_path(dir: &Path, subject: &Subject) -> PathBuf { dir.join(format!("{}_docs.json", subject.key())) }

/// Write both artifacts for one subject. Each file is written beside its final
/// name and renamed into place.
pub fn write_subject(dir: &Path, partition: &SubjectIndex) -> Result<()> {
    fs::create_dir_all(dir)?;
    let docs = DocsArtifact {
        subject: partition.subject().name().to_string(),
        embedder_id: partition.embedder_id().to_string(),
        built_at: Utc::now(),
        chunks: partition.chunks().to_vec(),
    };
    let docs_bytes = serde_json::to_vec(&docs)?;
    let digest = blake3::hash(&docs_bytes);

    let index = partition.index();
    let mut bytes = Vec::with_capacity(HEADER_LEN + index.rows().len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&dim_u32(index.dim())?.to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    bytes.extend_from_slice(digest.as_bytes());
    for value in index.rows() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    write_replace(&docs_path(dir, partition.subject()), &docs_bytes)?;
    write_replace(&index_path(dir, partition.subject()), &bytes)?;
    Ok(())
}

/// Read one subject's artifacts. `Ok(None)` when either file is absent.
pub fn read_subject(dir: &Path, subject: &Subject) -> Result<Option<SubjectIndex>> {
    let (index_file, docs_file) = (index_path(dir, subject), docs_path(dir, subject));
    if !index_file.exists() || !docs_file.exists() {
        return Ok(None);
    }
    let docs_bytes = fs::read(&docs_file)?;
    let docs: DocsArtifact = serde_json::from_slice(&docs_bytes)
        .map_err(|e| corrupt(&docs_file, format!("unreadable docs: {e}")))?;

    let bytes = fs::read(&index_file)?;
    let header = Header::parse(&bytes).ok_or_else(|| corrupt(&index_file, "truncated header"))?;
    if &header.magic != MAGIC {
        return Err(corrupt(&index_file, "bad magic"));
    }
    if header.version != VERSION {
        return Err(corrupt(&index_file, format!("unsupported version {}", header.version)));
    }
    if header.digest != *blake3::hash(&docs_bytes).as_bytes() {
        return Err(corrupt(&index_file, "docs digest mismatch"));
    }
    let count = usize::try_from(header.count).map_err(|_| corrupt(&index_file, "count overflow"))?;
    if count != docs.chunks.len() {
        return Err(corrupt(&index_file, format!("{count} vectors for {} chunk records", docs.chunks.len())));
    }
    let body = &bytes[HEADER_LEN..];
    if body.len() != count * header.dim * 4 {
        return Err(corrupt(&index_file, "vector payload length does not match header"));
    }
    let rows = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let index = FlatIpIndex::from_rows(header.dim, rows)?;
    SubjectIndex::new(subject.clone(), index, docs.chunks, docs.embedder_id).map(Some)
}

/// Remove both artifacts for one subject. `Ok(false)` when neither existed.
pub fn remove_subject(dir: &Path, subject: &Subject) -> Result<bool> {
    let mut removed = false;
    for path in [index_path(dir, subject), docs_path(dir, subject)] {
        match fs::remove_file(&path) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

struct Header {
    magic: [u8; 4],
    version: u32,
    dim: usize,
    count: u64,
    digest: [u8; 32],
}

impl Header {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..HEADER_LEN)?;
        Some(Self {
            magic: head[0..4].try_into().ok()?,
            version: u32::from_le_bytes(head[4..8].try_into().ok()?),
            dim: u32::from_le_bytes(head[8..12].try_into().ok()?) as usize,
            count: u64::from_le_bytes(head[12..20].try_into().ok()?),
            digest: head[20..52].try_into().ok()?,
        })
    }
}

fn dim_u32(dim: usize) -> Result<u32> {
    u32::try_from(dim).map_err(|_| Error::Operation(format!("dimension {dim} does not fit the index header")))
}

fn corrupt(path: &Path, reason: impl Into<String>) -> Error {
    Error::CorruptArtifact { path: path.to_path_buf(), reason: reason.into() }
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
