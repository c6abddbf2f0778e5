//! Workers and their skill parameters.

use serde::{Deserialize, Serialize};

/// A worker's latent parameters. Replaced wholesale every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSkill {
    /// Probability of choosing the correct child, one entry per inner node.
    pub skill_vector: Vec<f64>,
    /// Probability of repeating the immediately preceding annotation.
    pub prob_trust: f64,
    /// Fraction of items where the report equals the current label exactly.
    pub accuracy: Option<f64>,
}

impl WorkerSkill {
    /// A skill profile with the given vector and trust.
    pub fn new(skill_vector: Vec<f64>, prob_trust: f64) -> Self {
        Self {
            skill_vector,
            prob_trust,
            accuracy: None,
        }
    }
}

/// An annotator: identity, parameters, and annotation history.
#[derive(Debug, Clone)]
pub struct Worker {
    /// Unique identifier.
    pub id: String,
    /// Current parameters.
    pub skill: WorkerSkill,
    /// IDs of annotated items, in annotation order.
    pub items: Vec<String>,
    /// Finished workers keep their parameters when initialization skips them.
    pub finished: bool,
}

impl Worker {
    /// Create a worker with the given starting parameters.
    pub fn new(id: impl Into<String>, skill: WorkerSkill) -> Self {
        Self {
            id: id.into(),
            skill,
            items: Vec::new(),
            finished: false,
        }
    }

    /// Number of annotated items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
