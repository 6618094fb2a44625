//! Exact inner-product vector index.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use passage_core::{PassageError, Result};

/// In-memory vector index over unit-normalized embeddings.
///
/// Stored vectors and query vectors are L2-normalized, so the inner
/// product equals cosine similarity. Search is an exact scan over the full
/// corpus. The dimension is fixed by the first inserted vector; inserting
/// a vector of any other length fails with `DimensionMismatch`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Fixed after the first insertion.
    dimension: Option<usize>,

    /// Passage ids, in insertion order.
    ids: Vec<i64>,

    /// Unit vectors, parallel to `ids`.
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The fixed dimension, if any vector has been inserted.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Insert `(id, vector)` pairs, normalizing each vector to unit length.
    ///
    /// An empty index adopts the first vector's length as its dimension.
    pub fn add(&mut self, ids: &[i64], vectors: Vec<Vec<f32>>) -> Result<()> {
        if ids.len() != vectors.len() {
            return Err(PassageError::invalid_argument(format!(
                "ids and vectors must have same length ({} vs {})",
                ids.len(),
                vectors.len()
            )));
        }

        for (id, vector) in ids.iter().zip(vectors) {
            match self.dimension {
                None => self.dimension = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(PassageError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }

            self.ids.push(*id);
            self.vectors.push(l2_normalize(vector));
        }

        debug!("Vector index now holds {} vectors", self.len());
        Ok(())
    }

    /// Top-k exact inner-product search.
    ///
    /// Returns `(id, similarity)` pairs ordered by descending similarity,
    /// ties broken by insertion order. An empty index yields an empty
    /// result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let expected = self.dimension.unwrap_or(query.len());
        if query.len() != expected {
            return Err(PassageError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        let query = l2_normalize(query.to_vec());

        let mut hits: Vec<(i64, f32)> = self
            .ids
            .iter()
            .zip(&self.vectors)
            .map(|(id, vector)| {
                let dot: f32 = query.iter().zip(vector).map(|(a, b)| a * b).sum();
                (*id, dot)
            })
            .collect();

        // Stable sort keeps insertion order for equal scores
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        Ok(hits)
    }

    /// Serialize the full index to a blob at `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(self)?;
        std::fs::write(path, bytes)?;

        debug!("Persisted vector index ({} vectors) to {:?}", self.len(), path);
        Ok(())
    }

    /// Load an index from `path`.
    ///
    /// A missing blob yields an explicitly empty index. Corrupt bytes
    /// surface as `IndexLoad`; the caller decides whether to proceed with
    /// an empty index.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("No vector index at {:?}, starting empty", path);
            return Ok(Self::new());
        }

        let bytes = std::fs::read(path)?;
        let index: Self = serde_json::from_slice(&bytes)
            .map_err(|e| PassageError::index_load(format!("{:?}: {}", path, e)))?;

        info!("Loaded vector index ({} vectors) from {:?}", index.len(), path);
        Ok(index)
    }
}

/// L2 normalize a vector. Zero vectors are returned unchanged.
fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
