//! Log-likelihoods of items, workers and annotations under the current model.

use crate::index::FlatIndex;
use crate::types::{
    safe_ln, Annotation, CrowdError, CrowdParams, CrowdResult, Item, WorkerSkill,
};

use super::confusion::ConfusionModel;
use super::priors::DatasetPriors;

/// Log posterior of the item's current label, 0 before the first estimate.
pub fn item_log_likelihood(item: &Item) -> f64 {
    item.estimate
        .as_ref()
        .map(|e| e.log_likelihood)
        .unwrap_or(0.0)
}

/// Beta log-density of a worker's skill vector around the pooled
/// correctness, plus the trust term when trust is modeled.
pub fn worker_log_likelihood(
    skill: &WorkerSkill,
    params: &CrowdParams,
    priors: &DatasetPriors,
) -> f64 {
    let beta = params.prob_correct_beta;
    let mut ll: f64 = skill
        .skill_vector
        .iter()
        .zip(&priors.pooled_prob_correct)
        .map(|(&s, &pooled)| {
            (pooled * beta - 1.0) * safe_ln(s) + ((1.0 - pooled) * beta - 1.0) * safe_ln(1.0 - s)
        })
        .sum();

    if params.model_worker_trust {
        let t = skill.prob_trust;
        let tau = priors.prob_trust;
        let beta_t = params.prob_trust_beta;
        ll += (tau * beta_t - 1.0) * safe_ln(t) + ((1.0 - tau) * beta_t - 1.0) * safe_ln(1.0 - t);
    }
    ll
}

/// `log P(annotation | item label, worker)`, plus the log of the cached
/// prior-response probability when trust is modeled.
pub fn annotation_log_likelihood(
    index: &FlatIndex,
    params: &CrowdParams,
    model: &ConfusionModel,
    item: &Item,
    annotation: &Annotation,
) -> CrowdResult<f64> {
    let label = item
        .label()
        .ok_or_else(|| CrowdError::Unlabeled(item.id.clone()))?;
    let class = index
        .class_index(index.require_id(label)?)
        .ok_or_else(|| CrowdError::NotAClass(label.to_string()))?;
    let node = index.require_id(&annotation.label)?;

    let mut ll = safe_ln(model.annotation_probability(index, class, node));

    if params.model_worker_trust {
        let prev = annotation
            .prob_prev_annos
            .ok_or_else(|| CrowdError::MissingPriorResponse {
                item: item.id.clone(),
                worker: annotation.worker_id.clone(),
            })?;
        ll += safe_ln(prev);
    }
    Ok(ll)
}
