//! Dataset-wide priors: pooled correctness, pooled trust and class priors.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::index::FlatIndex;
use crate::types::{
    CrowdError, CrowdParams, CrowdResult, Item, Worker, MAX_CLASS_PROB, MAX_SKILL, MAX_TRUST,
    MIN_PROB,
};

use super::estimate::{accumulate_path_counts, smoothed, trust_counts};

/// Priors shared by every worker and item of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPriors {
    /// Pooled probability of choosing the correct child, per inner node.
    pub pooled_prob_correct: Vec<f64>,
    /// Dataset-wide trust.
    pub prob_trust: f64,
    /// Class prior per leaf key.
    pub class_probs: BTreeMap<String, f64>,
}

impl DatasetPriors {
    /// Starting priors: the configured means and the index's class priors.
    pub fn initial(index: &FlatIndex, params: &CrowdParams) -> Self {
        let class_probs = index
            .leaf_ids()
            .iter()
            .filter_map(|&id| {
                index
                    .key_of(id)
                    .map(|key| (key.to_string(), index.node_priors()[id]))
            })
            .collect();

        Self {
            pooled_prob_correct: vec![params.prob_correct_prior; index.num_inner()],
            prob_trust: params.prob_trust,
            class_probs,
        }
    }

    /// Class priors in the form taken by `Taxonomy::initialize_priors`.
    pub fn class_prob_map(&self) -> HashMap<String, f64> {
        self.class_probs
            .iter()
            .map(|(k, &v)| (k.clone(), v))
            .collect()
    }
}

/// Re-estimate the dataset-wide priors.
///
/// Only items with more than one contributing annotation are counted. The
/// true label of an item is taken from `ground_truth` when given, else from
/// its current estimate; items with neither are skipped. Class priors are
/// pulled toward `initial_class_probs`.
pub fn estimate_dataset_priors(
    index: &FlatIndex,
    params: &CrowdParams,
    initial_class_probs: &BTreeMap<String, f64>,
    items: &BTreeMap<String, Item>,
    workers: &BTreeMap<String, Worker>,
    ground_truth: Option<&HashMap<String, String>>,
) -> CrowdResult<DatasetPriors> {
    let num_inner = index.num_inner();
    let naive = params.naive_automated;
    let mut correct = vec![0.0; num_inner];
    let mut total = vec![0.0; num_inner];
    let mut class_counts: BTreeMap<&str, f64> = BTreeMap::new();
    let mut counted = 0.0;

    for item in items.values() {
        if item.contributing(naive).count() <= 1 {
            continue;
        }
        let label = match ground_truth {
            Some(truth) => truth.get(&item.id).map(|l| l.as_str()),
            None => item.label(),
        };
        let Some(label) = label else {
            continue;
        };
        let true_id = index.require_id(label)?;
        if index.class_index(true_id).is_none() {
            return Err(CrowdError::NotAClass(label.to_string()));
        }

        *class_counts.entry(label).or_insert(0.0) += 1.0;
        counted += 1.0;

        for annotation in item.contributing(naive) {
            let reported_id = index.require_id(&annotation.label)?;
            accumulate_path_counts(index, true_id, reported_id, &mut correct, &mut total);
        }
    }

    let pooled_prob_correct: Vec<f64> = (0..num_inner)
        .map(|n| {
            smoothed(
                params.prob_correct_prior_beta,
                params.prob_correct_prior,
                correct[n],
                total[n],
            )
            .clamp(MIN_PROB, MAX_SKILL)
        })
        .collect();

    let beta = params.class_probs_prior_beta;
    let class_probs: BTreeMap<String, f64> = initial_class_probs
        .iter()
        .map(|(key, &prior)| {
            let count = class_counts.get(key.as_str()).copied().unwrap_or(0.0);
            let prob = smoothed(beta, prior, count, counted).clamp(MIN_PROB, MAX_CLASS_PROB);
            (key.clone(), prob)
        })
        .collect();

    let prob_trust = if params.model_worker_trust {
        let mut matches = 0.0;
        let mut comparisons = 0.0;
        for worker in workers.values() {
            for item_id in &worker.items {
                let item = items
                    .get(item_id)
                    .ok_or_else(|| CrowdError::UnknownItem(item_id.clone()))?;
                let (m, c) = trust_counts(item, &worker.id, params.recursive_trust, naive);
                matches += m;
                comparisons += c;
            }
        }
        smoothed(
            params.prob_trust_prior_beta,
            params.prob_trust_prior,
            matches,
            comparisons,
        )
        .clamp(MIN_PROB, MAX_TRUST)
    } else {
        params.prob_trust
    };

    log::info!(
        "Estimated dataset priors from {} items (trust {:.4})",
        counted,
        prob_trust
    );

    Ok(DatasetPriors {
        pooled_prob_correct,
        prob_trust,
        class_probs,
    })
}
