//! taxonomic-crowd: crowdsourced label aggregation over a class taxonomy.
//!
//! Annotators report nodes of a rooted taxonomy whose leaves are the classes.
//! Each annotator has one skill per inner node (how often it picks the right
//! child there) and optionally a trust (how often it repeats the annotation
//! before it). Labels and skills are estimated by alternating the posterior
//! engine and the parameter estimator.

pub mod dataset;
pub mod engine;
pub mod format;
pub mod index;
pub mod taxonomy;
pub mod types;

// Re-export commonly used types at the crate root
pub use dataset::CrowdDataset;
pub use engine::{
    annotation_log_likelihood, estimate_dataset_priors, item_log_likelihood, majority_vote,
    prior_response_chain, run_round, worker_log_likelihood, AnnotationTensor, ConfusionModel,
    DatasetPriors, ItemPrediction, LabelPosteriorEngine, ParameterEstimator, Posterior,
    RoundReport,
};
pub use format::{ItemSnapshot, WorkerSnapshot};
pub use index::FlatIndex;
pub use taxonomy::{Taxonomy, TaxonomyBuilder, TaxonomyNode};
pub use types::{
    Annotation, CrowdError, CrowdParams, CrowdResult, FallbackPolicy, Item, LabelEstimate, Worker,
    WorkerSkill,
};
