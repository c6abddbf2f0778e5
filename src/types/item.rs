//! Items and their current label estimates.

use serde::{Deserialize, Serialize};

use super::annotation::Annotation;
use crate::types::error::{CrowdError, CrowdResult};

/// The current best label for an item. Replaced wholesale every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEstimate {
    /// Key of the selected class (always a leaf).
    pub label: String,
    /// 1 - posterior probability of `label`.
    pub risk: f64,
    /// Unnormalized log posterior of `label`.
    pub log_likelihood: f64,
}

/// An item to be labeled, with its annotations in arrival order.
#[derive(Debug, Clone)]
pub struct Item {
    /// Unique identifier.
    pub id: String,
    /// Annotations in arrival order, at most one per worker.
    annotations: Vec<Annotation>,
    /// Current estimate, `None` until the first labeling pass.
    pub estimate: Option<LabelEstimate>,
    /// Set once the risk drops to the dataset threshold. Never cleared.
    pub finished: bool,
}

impl Item {
    /// Create an item without annotations.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            annotations: Vec::new(),
            estimate: None,
            finished: false,
        }
    }

    /// Append an annotation. A worker may annotate an item only once.
    pub fn add_annotation(&mut self, annotation: Annotation) -> CrowdResult<()> {
        if self.position_of(&annotation.worker_id).is_some() {
            return Err(CrowdError::DuplicateAnnotation {
                item: self.id.clone(),
                worker: annotation.worker_id,
            });
        }
        self.annotations.push(annotation);
        Ok(())
    }

    /// All annotations in arrival order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Number of annotations.
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Arrival position of a worker's annotation.
    pub fn position_of(&self, worker_id: &str) -> Option<usize> {
        self.annotations
            .iter()
            .position(|a| a.worker_id == worker_id)
    }

    /// The annotation made by a worker.
    pub fn annotation_by(&self, worker_id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.worker_id == worker_id)
    }

    /// Annotations that take part in inference, in arrival order.
    pub fn contributing(&self, naive_automated: bool) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |a| a.contributes(naive_automated))
    }

    /// Current label key, if any.
    pub fn label(&self) -> Option<&str> {
        self.estimate.as_ref().map(|e| e.label.as_str())
    }

    /// Current risk; 1.0 before the first estimate.
    pub fn risk(&self) -> f64 {
        self.estimate.as_ref().map(|e| e.risk).unwrap_or(1.0)
    }

    /// Store the prior-response probabilities computed for this item,
    /// aligned with `annotations()`. `None` entries leave the cache as is.
    pub fn cache_prior_responses(&mut self, probs: &[Option<f64>]) {
        for (annotation, prob) in self.annotations.iter_mut().zip(probs) {
            if let Some(p) = prob {
                annotation.prob_prev_annos = Some(*p);
            }
        }
    }

    /// Whether the item is finished: its risk is at or below `min_risk`.
    /// With `set_finished` the flag is stored.
    pub fn check_finished(&mut self, min_risk: f64, set_finished: bool) -> bool {
        if self.finished {
            return true;
        }
        let finished = self.risk() <= min_risk;
        if set_finished {
            self.finished = finished;
        }
        finished
    }
}
