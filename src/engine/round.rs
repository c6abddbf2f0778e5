//! One EM alternation over a dataset.

use std::collections::BTreeMap;

use rand::Rng;
use rayon::prelude::*;

use crate::index::FlatIndex;
use crate::types::{CrowdError, CrowdParams, CrowdResult, Item, LabelEstimate, Worker, WorkerSkill};

use super::estimate::ParameterEstimator;
use super::posterior::{ItemPrediction, LabelPosteriorEngine};
use super::priors::DatasetPriors;

/// What one round changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    /// Workers whose parameters were re-estimated.
    pub workers_updated: usize,
    /// Items that got a new posterior estimate.
    pub items_updated: usize,
    /// Items labeled by the fallback policy.
    pub items_fallback: usize,
    /// Finished items after the round.
    pub items_finished: usize,
    /// Mean risk over labeled items.
    pub mean_risk: f64,
}

/// Run one round: re-estimate every worker from the current labels, then
/// predict every item from the new parameters.
///
/// Both phases run in parallel against read-only state; results are applied
/// once each phase is complete. With `skip_finished`, finished workers keep
/// their parameters, and finished items as well as labeled items without
/// contributing annotations keep their estimates.
pub fn run_round<R: Rng + ?Sized>(
    index: &FlatIndex,
    params: &CrowdParams,
    priors: &DatasetPriors,
    workers: &mut BTreeMap<String, Worker>,
    items: &mut BTreeMap<String, Item>,
    skip_finished: bool,
    rng: &mut R,
) -> CrowdResult<RoundReport> {
    let mut report = RoundReport::default();

    // Workers.
    let estimator = ParameterEstimator::new(index, params, priors);
    let skills: Vec<(String, WorkerSkill)> = {
        let items = &*items;
        workers
            .par_iter()
            .filter(|(_, w)| !(skip_finished && w.finished))
            .map(|(id, w)| estimator.reestimate(w, items).map(|s| (id.clone(), s)))
            .collect::<CrowdResult<_>>()?
    };
    for (id, skill) in skills {
        let worker = workers
            .get_mut(&id)
            .ok_or_else(|| CrowdError::UnknownWorker(id.clone()))?;
        worker.skill = skill;
        report.workers_updated += 1;
    }

    // Items.
    let engine = LabelPosteriorEngine::new(index, params);
    let predictions: Vec<(String, ItemPrediction)> = {
        let workers = &*workers;
        items
            .par_iter()
            .map(|(id, item)| {
                engine
                    .predict(item, workers, skip_finished)
                    .map(|p| (id.clone(), p))
            })
            .collect::<CrowdResult<_>>()?
    };

    for (id, prediction) in predictions {
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CrowdError::UnknownItem(id.clone()))?;
        item.cache_prior_responses(&prediction.prev_annotation_probs);

        match prediction.posterior {
            Some(posterior) => {
                item.estimate = Some(LabelEstimate {
                    label: posterior.label,
                    risk: posterior.risk,
                    log_likelihood: posterior.log_likelihood,
                });
                report.items_updated += 1;
            }
            None if skip_finished && item.finished => {
                log::debug!("Skipped finished item {}", item.id);
            }
            None if skip_finished && item.estimate.is_some() => {
                log::debug!("Item {} has no usable annotations, keeping its label", item.id);
            }
            None => {
                log::warn!(
                    "Item {} has no usable annotations, using {:?} fallback",
                    item.id,
                    params.fallback
                );
                item.estimate = Some(params.fallback.estimate(index, rng)?);
                report.items_fallback += 1;
            }
        }
    }

    let mut risk_sum = 0.0;
    let mut labeled = 0usize;
    for item in items.values_mut() {
        // A label with no evidence behind it never finishes an item.
        let has_evidence = item.contributing(params.naive_automated).next().is_some();
        if (item.finished || has_evidence) && item.check_finished(params.min_risk, true) {
            report.items_finished += 1;
        }
        if item.estimate.is_some() {
            risk_sum += item.risk();
            labeled += 1;
        }
    }
    report.mean_risk = if labeled == 0 {
        0.0
    } else {
        risk_sum / labeled as f64
    };

    log::info!(
        "Round: {} workers updated, {} items updated, {} fallback, {} finished, mean risk {:.4}",
        report.workers_updated,
        report.items_updated,
        report.items_fallback,
        report.items_finished,
        report.mean_risk
    );

    Ok(report)
}
