//! Numeric engines: confusion models, posteriors, re-estimation and the EM round.

pub mod confusion;
pub mod estimate;
pub mod likelihood;
pub mod policy;
pub mod posterior;
pub mod priors;
pub mod round;
pub mod trust;

pub use confusion::ConfusionModel;
pub use estimate::ParameterEstimator;
pub use likelihood::{annotation_log_likelihood, item_log_likelihood, worker_log_likelihood};
pub use policy::{majority_vote, prior_estimate};
pub use posterior::{AnnotationTensor, ItemPrediction, LabelPosteriorEngine, Posterior};
pub use priors::{estimate_dataset_priors, DatasetPriors};
pub use round::{run_round, RoundReport};
pub use trust::prior_response_chain;
