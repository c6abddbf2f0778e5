//! Per-worker confusion matrix `M` and blind-guess vector `N`.

use crate::index::FlatIndex;
use crate::types::{CrowdError, CrowdResult};

/// A worker's confusion distributions over taxonomy nodes.
///
/// `M[r, c]` is the probability of reporting sibling `c` when the true
/// sibling is `r`. `N[z]` is the probability of reporting `z` once the
/// reported path has left the true path.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionModel {
    /// Row-major `num_nodes x num_nodes`.
    m: Vec<f64>,
    n: Vec<f64>,
    num_nodes: usize,
}

impl ConfusionModel {
    /// Build `M` and `N` from a skill vector (one entry per inner node).
    /// The skill vector is used as given; clipping is done by the estimator.
    pub fn build(index: &FlatIndex, skill_vector: &[f64]) -> CrowdResult<Self> {
        if skill_vector.len() != index.num_inner() {
            return Err(CrowdError::SkillDimensionMismatch {
                expected: index.num_inner(),
                got: skill_vector.len(),
            });
        }

        let num_nodes = index.num_nodes();
        let mut m = vec![0.0; num_nodes * num_nodes];
        let layout = index.layout();

        for cell in &layout.diagonal {
            m[cell.node * num_nodes + cell.node] = if cell.only_child {
                1.0
            } else {
                skill_vector[cell.parent]
            };
        }
        for cell in &layout.off_diagonal {
            m[cell.row * num_nodes + cell.col] = (1.0 - skill_vector[cell.parent]) * cell.weight;
        }

        // The root keeps 1 so indexing stays aligned with node ids.
        let priors = index.node_priors();
        let mut n = vec![1.0; num_nodes];
        for (offset, &parent) in index.parent_ids().iter().enumerate() {
            let node = offset + 1;
            n[node] = (1.0 - skill_vector[parent]) * priors[node];
        }

        Ok(Self { m, n, num_nodes })
    }

    /// `M[row, col]`.
    pub fn m(&self, row: usize, col: usize) -> f64 {
        self.m[row * self.num_nodes + col]
    }

    /// `N[node]`.
    pub fn n(&self, node: usize) -> f64 {
        self.n[node]
    }

    /// The full `N` vector.
    pub fn blind_guess(&self) -> &[f64] {
        &self.n
    }

    /// One row of `M`.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.m[row * self.num_nodes..(row + 1) * self.num_nodes]
    }

    /// Matrix dimension.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// `P(worker reports node | true class)`: the product of the scatter
    /// reads for that pair. The root annotation has probability 1.
    pub fn annotation_probability(&self, index: &FlatIndex, class: usize, node: usize) -> f64 {
        let (confusion, blind_guess) = index.scatter().cells(class, node);
        let from_m: f64 = confusion.iter().map(|c| self.m(c.row, c.col)).product();
        let from_n: f64 = blind_guess.iter().map(|c| self.n(c.col)).product();
        from_m * from_n
    }
}
