//! Labels for items the posterior cannot speak to.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::index::FlatIndex;
use crate::types::{safe_ln, CrowdError, CrowdResult, FallbackPolicy, Item, LabelEstimate};

impl FallbackPolicy {
    /// Pick a class index.
    pub fn choose<R: Rng + ?Sized>(&self, index: &FlatIndex, rng: &mut R) -> usize {
        let priors = index.class_priors();
        match self {
            FallbackPolicy::MostProbable => most_probable(&priors),
            FallbackPolicy::PriorWeighted => match WeightedIndex::new(&priors) {
                Ok(dist) => dist.sample(rng),
                // All-zero or invalid weights.
                Err(_) => most_probable(&priors),
            },
            FallbackPolicy::Uniform => rng.gen_range(0..priors.len()),
        }
    }

    /// An estimate for a class chosen by this policy: risk `1 - prior`,
    /// log-likelihood `log prior`.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        index: &FlatIndex,
        rng: &mut R,
    ) -> CrowdResult<LabelEstimate> {
        let class = self.choose(index, rng);
        prior_estimate(index, class)
    }
}

/// First class with the largest prior.
fn most_probable(priors: &[f64]) -> usize {
    let mut best = 0;
    for (class, &p) in priors.iter().enumerate() {
        if p > priors[best] {
            best = class;
        }
    }
    best
}

/// An estimate for `class` backed only by its prior.
pub fn prior_estimate(index: &FlatIndex, class: usize) -> CrowdResult<LabelEstimate> {
    let label = index
        .class_key(class)
        .ok_or_else(|| CrowdError::UnknownNode(format!("class #{}", class)))?;
    let prior = index.class_priors()[class];
    Ok(LabelEstimate {
        label: label.to_string(),
        risk: 1.0 - prior,
        log_likelihood: safe_ln(prior),
    })
}

/// The most common leaf label among the item's annotations, ties broken by
/// first appearance. `None` when no annotation names a leaf.
pub fn majority_vote(item: &Item, index: &FlatIndex) -> Option<String> {
    let mut votes: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, annotation) in item.annotations().iter().enumerate() {
        let is_leaf = index
            .id_of(&annotation.label)
            .and_then(|id| index.class_index(id))
            .is_some();
        if !is_leaf {
            continue;
        }
        votes
            .entry(annotation.label.as_str())
            .or_insert((0, position))
            .0 += 1;
    }

    votes
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(label, _)| label.to_string())
}
