//! Label posterior: the most likely class of an item given its annotations.

use std::collections::BTreeMap;

use crate::index::FlatIndex;
use crate::types::{
    safe_ln, CrowdError, CrowdParams, CrowdResult, Item, Worker, MIN_DENOMINATOR,
};

use super::confusion::ConfusionModel;
use super::trust::prior_response_chain;

/// The posterior summary for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// Key of the most likely class.
    pub label: String,
    /// Class index of `label`.
    pub class_index: usize,
    /// 1 - posterior probability of `label`.
    pub risk: f64,
    /// Unnormalized log posterior of `label`.
    pub log_likelihood: f64,
    /// Unnormalized log posterior of every class.
    pub class_log_likelihoods: Vec<f64>,
}

/// Everything computed for one item in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPrediction {
    /// `None` when the item was skipped or has no contributing annotations.
    pub posterior: Option<Posterior>,
    /// Prior-response probability per annotation (aligned with the item's
    /// annotations), `None` for annotations that do not contribute.
    pub prev_annotation_probs: Vec<Option<f64>>,
}

/// `P(worker w reports node z | true class y)` for the contributing workers
/// of one item, stored as `[worker, class, node]`.
#[derive(Debug, Clone)]
pub struct AnnotationTensor {
    values: Vec<f64>,
    num_classes: usize,
    num_nodes: usize,
}

impl AnnotationTensor {
    /// Fill a `[worker, class, node, level]` tensor of ones from the scatter
    /// tables, then take the product over the level axis.
    pub fn assemble(index: &FlatIndex, models: &[ConfusionModel]) -> Self {
        let num_classes = index.num_classes();
        let num_nodes = index.num_nodes();
        let levels = index.max_path_length().saturating_sub(1);
        let scatter = index.scatter();

        let mut values = Vec::with_capacity(models.len() * num_classes * num_nodes);
        let mut path_factors = vec![1.0; num_classes * num_nodes * levels];

        for model in models {
            path_factors.fill(1.0);

            for cell in scatter.confusion_cells() {
                let slot = (cell.class * num_nodes + cell.node) * levels + cell.level;
                path_factors[slot] = model.m(cell.row, cell.col);
            }
            for cell in scatter.blind_guess_cells() {
                let slot = (cell.class * num_nodes + cell.node) * levels + cell.level;
                path_factors[slot] = model.n(cell.col);
            }

            if levels == 0 {
                values.extend(std::iter::repeat(1.0).take(num_classes * num_nodes));
            } else {
                values.extend(
                    path_factors
                        .chunks_exact(levels)
                        .map(|factors| factors.iter().product::<f64>()),
                );
            }
        }

        Self {
            values,
            num_classes,
            num_nodes,
        }
    }

    /// `P(z | y, w)`.
    pub fn get(&self, worker: usize, class: usize, node: usize) -> f64 {
        self.values[(worker * self.num_classes + class) * self.num_nodes + node]
    }

    /// `P(· | y, w)` over all nodes.
    pub fn distribution(&self, worker: usize, class: usize) -> &[f64] {
        let start = (worker * self.num_classes + class) * self.num_nodes;
        &self.values[start..start + self.num_nodes]
    }
}

/// Contributing annotations of one item, resolved against the index.
struct Evidence {
    /// Position of each contributing annotation in the item.
    positions: Vec<usize>,
    /// Reported node ids.
    labels: Vec<usize>,
    /// Prior-response chain, one row per contributing annotation.
    chain: Vec<Vec<f64>>,
    /// Confusion models of the contributing workers.
    models: Vec<ConfusionModel>,
}

/// Computes class posteriors for items.
pub struct LabelPosteriorEngine<'a> {
    index: &'a FlatIndex,
    params: &'a CrowdParams,
}

impl<'a> LabelPosteriorEngine<'a> {
    /// Create an engine over an index and a parameter set.
    pub fn new(index: &'a FlatIndex, params: &'a CrowdParams) -> Self {
        Self { index, params }
    }

    /// Predict the label and risk of an item.
    ///
    /// With `skip_if_finished`, a finished item gets no new posterior; when
    /// trust is modeled its prior-response probabilities are still refreshed.
    pub fn predict(
        &self,
        item: &Item,
        workers: &BTreeMap<String, Worker>,
        skip_if_finished: bool,
    ) -> CrowdResult<ItemPrediction> {
        let skip = skip_if_finished && item.finished;
        if skip && !self.params.model_worker_trust {
            return Ok(ItemPrediction {
                posterior: None,
                prev_annotation_probs: vec![None; item.annotation_count()],
            });
        }

        let evidence = self.gather(item, workers)?;
        let mut prev_annotation_probs = vec![None; item.annotation_count()];
        for (k, &position) in evidence.positions.iter().enumerate() {
            prev_annotation_probs[position] = Some(evidence.chain[k][evidence.labels[k]]);
        }

        if skip || evidence.labels.is_empty() {
            return Ok(ItemPrediction {
                posterior: None,
                prev_annotation_probs,
            });
        }

        let class_log_likelihoods = self.class_log_likelihoods(&evidence);
        let posterior = self.summarize(class_log_likelihoods)?;

        Ok(ItemPrediction {
            posterior: Some(posterior),
            prev_annotation_probs,
        })
    }

    /// Unnormalized log posterior of every class, or `None` when the item
    /// has no contributing annotations.
    pub fn log_posteriors(
        &self,
        item: &Item,
        workers: &BTreeMap<String, Worker>,
    ) -> CrowdResult<Option<Vec<f64>>> {
        let evidence = self.gather(item, workers)?;
        if evidence.labels.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.class_log_likelihoods(&evidence)))
    }

    fn gather(&self, item: &Item, workers: &BTreeMap<String, Worker>) -> CrowdResult<Evidence> {
        let naive = self.params.naive_automated;
        let mut positions = Vec::new();
        let mut labels = Vec::new();
        let mut trusts = Vec::new();
        let mut models = Vec::new();

        for (position, annotation) in item.annotations().iter().enumerate() {
            if !annotation.contributes(naive) {
                continue;
            }
            let worker = workers
                .get(&annotation.worker_id)
                .ok_or_else(|| CrowdError::UnknownWorker(annotation.worker_id.clone()))?;
            positions.push(position);
            labels.push(self.index.require_id(&annotation.label)?);
            trusts.push(worker.skill.prob_trust);
            models.push(ConfusionModel::build(self.index, &worker.skill.skill_vector)?);
        }

        let chain = prior_response_chain(&labels, &trusts, self.index.node_priors());
        Ok(Evidence {
            positions,
            labels,
            chain,
            models,
        })
    }

    /// `log p(y) + Σ_w [log(P(z_w|y,w) p(H|z_w,w)) - log Σ_z P(z|y,w) p(H|z,w)]`.
    fn class_log_likelihoods(&self, evidence: &Evidence) -> Vec<f64> {
        let tensor = AnnotationTensor::assemble(self.index, &evidence.models);

        self.index
            .class_priors()
            .iter()
            .enumerate()
            .map(|(class, &prior)| {
                let mut ll = safe_ln(prior);
                for (w, &label) in evidence.labels.iter().enumerate() {
                    // The chain uses each worker's current trust whether or
                    // not trust is being re-estimated.
                    let history = &evidence.chain[w];
                    let probs = tensor.distribution(w, class);
                    let num = safe_ln(probs[label] * history[label]);
                    let denom: f64 = probs.iter().zip(history.iter()).map(|(p, h)| p * h).sum();
                    ll += num - denom.max(MIN_DENOMINATOR).ln();
                }
                ll
            })
            .collect()
    }

    fn summarize(&self, class_log_likelihoods: Vec<f64>) -> CrowdResult<Posterior> {
        let mut best = 0;
        for (class, &ll) in class_log_likelihoods.iter().enumerate() {
            if ll > class_log_likelihoods[best] {
                best = class;
            }
        }

        // Subtract the maximum for numerical stability.
        let max = class_log_likelihoods[best];
        let denom: f64 = class_log_likelihoods
            .iter()
            .map(|&ll| (ll - max).exp())
            .sum();
        let risk = (1.0 - 1.0 / denom).clamp(0.0, 1.0);

        let label = self
            .index
            .class_key(best)
            .ok_or_else(|| CrowdError::UnknownNode(format!("class #{}", best)))?
            .to_string();

        Ok(Posterior {
            label,
            class_index: best,
            risk,
            log_likelihood: max,
            class_log_likelihoods,
        })
    }
}
