//! Dataset-wide hyperparameters, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::error::{CrowdError, CrowdResult};

/// How to label an item that has no usable annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// The class with the largest prior.
    #[default]
    MostProbable,
    /// A class sampled in proportion to the class priors.
    PriorWeighted,
    /// A class sampled uniformly.
    Uniform,
}

/// Immutable hyperparameters threaded through every engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdParams {
    /// Beta strength used when re-estimating the class priors.
    pub class_probs_prior_beta: f64,

    /// Beta strength of the prior on pooled correctness.
    pub prob_correct_prior_beta: f64,
    /// Prior mean of pooled correctness.
    pub prob_correct_prior: f64,
    /// Beta strength pulling each worker toward pooled correctness.
    pub prob_correct_beta: f64,
    /// Skill assigned to every inner node for a new worker.
    pub prob_correct: f64,

    /// Beta strength of the prior on dataset-wide trust.
    pub prob_trust_prior_beta: f64,
    /// Prior mean of dataset-wide trust.
    pub prob_trust_prior: f64,
    /// Beta strength pulling each worker toward dataset-wide trust.
    pub prob_trust_beta: f64,
    /// Initial dataset-wide (and per-worker) trust.
    pub prob_trust: f64,

    /// Re-estimate worker trust and score the prior-response probabilities
    /// in the annotation log-likelihood. The posterior always conditions on
    /// earlier annotations using each worker's current trust.
    pub model_worker_trust: bool,
    /// Trust depends only on the immediately preceding annotation.
    pub recursive_trust: bool,
    /// Treat automated annotations like human ones.
    pub naive_automated: bool,

    /// Items whose risk drops to this value are finished.
    pub min_risk: f64,
    /// Labeling policy for items without usable annotations.
    pub fallback: FallbackPolicy,
}

impl Default for CrowdParams {
    fn default() -> Self {
        Self {
            class_probs_prior_beta: 10.0,
            prob_correct_prior_beta: 15.0,
            prob_correct_prior: 0.8,
            prob_correct_beta: 10.0,
            prob_correct: 0.8,
            prob_trust_prior_beta: 15.0,
            prob_trust_prior: 0.8,
            prob_trust_beta: 10.0,
            prob_trust: 0.8,
            model_worker_trust: false,
            recursive_trust: true,
            naive_automated: false,
            min_risk: 0.005,
            fallback: FallbackPolicy::MostProbable,
        }
    }
}

impl CrowdParams {
    /// Parse and validate parameters from a TOML document.
    /// Missing keys take their default values.
    pub fn from_toml_str(text: &str) -> CrowdResult<Self> {
        let params: CrowdParams = toml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Load and validate parameters from a TOML file.
    pub fn load(path: &Path) -> CrowdResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that every probability lies in (0, 1), every Beta strength is
    /// non-negative and the risk threshold lies in [0, 1].
    pub fn validate(&self) -> CrowdResult<()> {
        let probabilities = [
            ("prob_correct_prior", self.prob_correct_prior),
            ("prob_correct", self.prob_correct),
            ("prob_trust_prior", self.prob_trust_prior),
            ("prob_trust", self.prob_trust),
        ];
        for (name, value) in probabilities {
            if !(value > 0.0 && value < 1.0) {
                return Err(CrowdError::InvalidProbability {
                    name: name.to_string(),
                    value,
                });
            }
        }

        let strengths = [
            ("class_probs_prior_beta", self.class_probs_prior_beta),
            ("prob_correct_prior_beta", self.prob_correct_prior_beta),
            ("prob_correct_beta", self.prob_correct_beta),
            ("prob_trust_prior_beta", self.prob_trust_prior_beta),
            ("prob_trust_beta", self.prob_trust_beta),
        ];
        for (name, value) in strengths {
            if !value.is_finite() || value < 0.0 {
                return Err(CrowdError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.min_risk) {
            return Err(CrowdError::InvalidConfig(format!(
                "min_risk must lie in [0, 1], got {}",
                self.min_risk
            )));
        }
        Ok(())
    }

    /// The skill vector a worker starts with: `prob_correct` at every inner node.
    pub fn default_skill_vector(&self, num_inner: usize) -> Vec<f64> {
        vec![self.prob_correct; num_inner]
    }
}
