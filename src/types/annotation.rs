//! A single label reported by a worker on an item.

use serde::{Deserialize, Serialize};

/// One worker's report for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// The worker that produced this annotation.
    pub worker_id: String,
    /// Key of the reported taxonomy node (leaf or inner).
    pub label: String,
    /// Whether the annotation comes from an automated source.
    pub automated: bool,
    /// p(previous annotations | this label, this worker), cached by the
    /// posterior engine for the annotation log-likelihood.
    #[serde(skip)]
    pub prob_prev_annos: Option<f64>,
}

impl Annotation {
    /// A human annotation.
    pub fn new(worker_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            label: label.into(),
            automated: false,
            prob_prev_annos: None,
        }
    }

    /// An annotation from an automated source.
    pub fn automated(worker_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            automated: true,
            ..Self::new(worker_id, label)
        }
    }

    /// Whether this annotation takes part in inference.
    pub fn contributes(&self, naive_automated: bool) -> bool {
        !self.automated || naive_automated
    }

    /// 0/1 loss of this report against a reference label.
    pub fn loss(&self, label: &str) -> f64 {
        if self.label == label {
            0.0
        } else {
            1.0
        }
    }
}
