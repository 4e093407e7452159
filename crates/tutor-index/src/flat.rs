use tutor_core::{Error, Result};

/// Exact inner-product index over row-major `f32` vectors.
///
/// Vectors are expected to be L2-normalized, which makes the inner product a
/// cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub position: usize,
    pub score: f32,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self { Self { dim, data: Vec::new() } }

    /// Rebuild from raw rows, e.g. when restoring from disk.
    pub fn from_rows(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(Error::Operation(format!("{} values do not form rows of dimension {dim}", data.len())));
        }
        Ok(Self { dim, data })
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { if self.dim == 0 { 0 } else { self.data.len() / self.dim } }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn rows(&self) -> &[f32] { &self.data }

    /// Up to `k` best candidates, highest score first; equal scores keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Candidate> {
        if k == 0 || query.len() != self.dim {
            return Vec::new();
        }
        let mut scored: Vec<Candidate> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| Candidate { position, score: row.iter().zip(query).map(|(a, b)| a * b).sum() })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.position.cmp(&b.position)));
        scored.truncate(k);
        scored
    }
}
