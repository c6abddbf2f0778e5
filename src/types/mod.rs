//! All data types for the taxonomic-crowd library.

pub mod annotation;
pub mod error;
pub mod item;
pub mod params;
pub mod worker;

pub use annotation::Annotation;
pub use error::{CrowdError, CrowdResult};
pub use item::{Item, LabelEstimate};
pub use params::{CrowdParams, FallbackPolicy};
pub use worker::{Worker, WorkerSkill};

/// Lower clamp for every probability and skill value.
pub const MIN_PROB: f64 = 1e-8;

/// Upper clamp for skill values.
pub const MAX_SKILL: f64 = 0.99999;

/// Upper clamp for trust values.
pub const MAX_TRUST: f64 = 0.9999;

/// Upper clamp for class priors.
pub const MAX_CLASS_PROB: f64 = 0.999999;

/// Upper clamp applied to probabilities before taking logarithms.
pub const MAX_LOG_PROB: f64 = 1.0 - 1e-5;

/// Smallest denominator allowed in a ratio of counts or probabilities.
pub const MIN_DENOMINATOR: f64 = 1e-8;

/// Clamp a probability to `[MIN_PROB, MAX_LOG_PROB]` and take its logarithm.
pub fn safe_ln(p: f64) -> f64 {
    p.clamp(MIN_PROB, MAX_LOG_PROB).ln()
}
