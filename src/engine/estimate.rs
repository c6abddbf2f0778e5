//! Worker parameter re-estimation from the current labels.

use std::collections::BTreeMap;

use crate::index::FlatIndex;
use crate::types::{
    CrowdError, CrowdParams, CrowdResult, Item, Worker, WorkerSkill, MAX_SKILL, MAX_TRUST,
    MIN_DENOMINATOR, MIN_PROB,
};

use super::priors::DatasetPriors;

/// Add one (true node, reported node) observation to per-inner-node counts.
///
/// Every inner node on the true path gets a trial. A parent gets a success
/// when the reported path takes the same child there.
pub(crate) fn accumulate_path_counts(
    index: &FlatIndex,
    true_id: usize,
    reported_id: usize,
    correct: &mut [f64],
    total: &mut [f64],
) {
    let y_path = index.root_path(true_id);
    let z_path = index.root_path(reported_id);

    for &ancestor in &y_path[..y_path.len() - 1] {
        total[ancestor] += 1.0;
    }
    for child in 1..y_path.len() {
        if child >= z_path.len() {
            break;
        }
        if y_path[child] == z_path[child] {
            correct[y_path[child - 1]] += 1.0;
        }
    }
}

/// Count agreements between a worker's report and the annotations before it.
/// Returns `(matches, comparisons)`.
pub(crate) fn trust_counts(
    item: &Item,
    worker_id: &str,
    recursive: bool,
    naive_automated: bool,
) -> (f64, f64) {
    let annotations = item.annotations();
    let Some(own_position) = item.position_of(worker_id) else {
        return (0.0, 0.0);
    };
    let own_label = &annotations[own_position].label;

    if recursive {
        // Only the immediately preceding annotation matters.
        if own_position == 0 {
            return (0.0, 0.0);
        }
        let matched = annotations[own_position - 1].label == *own_label;
        return (if matched { 1.0 } else { 0.0 }, 1.0);
    }

    let mut matches = 0.0;
    let mut comparisons = 0.0;
    for previous in &annotations[..own_position] {
        if previous.contributes(naive_automated) {
            comparisons += 1.0;
            if previous.label == *own_label {
                matches += 1.0;
            }
        }
    }
    (matches, comparisons)
}

/// Beta-smoothed ratio `(beta * prior + successes) / (beta + trials)`.
pub(crate) fn smoothed(beta: f64, prior: f64, successes: f64, trials: f64) -> f64 {
    (beta * prior + successes) / (beta + trials).max(MIN_DENOMINATOR)
}

/// Re-estimates worker skill and trust.
pub struct ParameterEstimator<'a> {
    index: &'a FlatIndex,
    params: &'a CrowdParams,
    priors: &'a DatasetPriors,
}

impl<'a> ParameterEstimator<'a> {
    /// Create an estimator over an index, parameters and dataset-wide priors.
    pub fn new(index: &'a FlatIndex, params: &'a CrowdParams, priors: &'a DatasetPriors) -> Self {
        Self {
            index,
            params,
            priors,
        }
    }

    /// New parameters for `worker` from its history and the current labels.
    /// The worker itself is not modified.
    pub fn reestimate(
        &self,
        worker: &Worker,
        items: &BTreeMap<String, Item>,
    ) -> CrowdResult<WorkerSkill> {
        let num_inner = self.index.num_inner();
        let mut correct = vec![0.0; num_inner];
        let mut total = vec![0.0; num_inner];
        let mut usable = 0usize;
        let mut exact_matches = 0.0;

        for item_id in &worker.items {
            let item = items
                .get(item_id)
                .ok_or_else(|| CrowdError::UnknownItem(item_id.clone()))?;
            let Some(annotation) = item.annotation_by(&worker.id) else {
                continue;
            };
            let Some(label) = item.label() else {
                continue;
            };

            if annotation.label == label {
                exact_matches += 1.0;
            }

            // A lone annotation would only agree with itself.
            if item.annotation_count() <= 1 {
                continue;
            }
            usable += 1;

            let true_id = self.index.require_id(label)?;
            let reported_id = self.index.require_id(&annotation.label)?;
            accumulate_path_counts(self.index, true_id, reported_id, &mut correct, &mut total);
        }

        let skill_vector = if usable == 0 {
            self.params.default_skill_vector(num_inner)
        } else {
            let beta = self.params.prob_correct_beta;
            (0..num_inner)
                .map(|n| {
                    smoothed(beta, self.priors.pooled_prob_correct[n], correct[n], total[n])
                        .clamp(MIN_PROB, MAX_SKILL)
                })
                .collect()
        };

        let prob_trust = if self.params.model_worker_trust {
            self.estimate_trust(worker, items)?
        } else {
            worker.skill.prob_trust
        };

        let accuracy = exact_matches / (worker.items.len() as f64).max(0.0001);

        Ok(WorkerSkill {
            skill_vector,
            prob_trust,
            accuracy: Some(accuracy),
        })
    }

    fn estimate_trust(&self, worker: &Worker, items: &BTreeMap<String, Item>) -> CrowdResult<f64> {
        let mut matches = 0.0;
        let mut comparisons = 0.0;
        for item_id in &worker.items {
            let item = items
                .get(item_id)
                .ok_or_else(|| CrowdError::UnknownItem(item_id.clone()))?;
            let (m, c) = trust_counts(
                item,
                &worker.id,
                self.params.recursive_trust,
                self.params.naive_automated,
            );
            matches += m;
            comparisons += c;
        }

        Ok(smoothed(
            self.params.prob_trust_beta,
            self.priors.prob_trust,
            matches,
            comparisons,
        )
        .clamp(MIN_PROB, MAX_TRUST))
    }
}
