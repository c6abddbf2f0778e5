//! The prior-response chain `p(H_{t-1} | z, w_t)`.
//!
//! Row `t` holds, for every node `z`, the probability of the annotations
//! before position `t` given that the worker at `t` reports `z`. A trusting
//! worker repeats the previous label with probability `pt`; otherwise the
//! label is drawn by prior. Rows depend on the row before them, so the
//! annotations must be given in arrival order.

use crate::types::MIN_DENOMINATOR;

/// Compute the chain for annotations reporting `labels` (node ids) by
/// workers with trust `trusts`, in arrival order. Returns one row of length
/// `priors.len()` per annotation.
pub fn prior_response_chain(labels: &[usize], trusts: &[f64], priors: &[f64]) -> Vec<Vec<f64>> {
    let num_nodes = priors.len();
    let mut chain: Vec<Vec<f64>> = Vec::with_capacity(labels.len());
    if labels.is_empty() {
        return chain;
    }

    // No history before the first annotation.
    chain.push(vec![1.0; num_nodes]);

    for t in 1..labels.len() {
        let previous_label = labels[t - 1];
        let pt = trusts[t];
        let pnt = 1.0 - pt;

        if t == 1 {
            let row = (0..num_nodes)
                .map(|z| if z == previous_label { pt } else { pnt * priors[z] })
                .collect();
            chain.push(row);
            continue;
        }

        let previous = &chain[t - 1];
        let ppr = previous[previous_label];
        let total: f64 = previous.iter().sum();

        let row = (0..num_nodes)
            .map(|z| {
                let num = if z == previous_label {
                    pt * ppr
                } else {
                    pnt * priors[z] * ppr
                };
                let denom = pt * previous[z] + pnt * priors[z] * (total - previous[z]);
                num / denom.max(MIN_DENOMINATOR)
            })
            .collect();
        chain.push(row);
    }

    chain
}
