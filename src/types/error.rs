//! Error types for the taxonomic-crowd library.

use thiserror::Error;

/// All errors that can occur in the taxonomic-crowd library.
#[derive(Error, Debug)]
pub enum CrowdError {
    /// The taxonomy must be finalized before it can be indexed.
    #[error("The taxonomy must be finalized")]
    TaxonomyNotFinalized,

    /// The taxonomy is frozen and cannot be mutated.
    #[error("The taxonomy is finalized and cannot be modified")]
    TaxonomyFinalized,

    /// Occurrence priors have not been initialized.
    #[error("The taxonomy priors must be initialized")]
    PriorsNotInitialized,

    /// The taxonomy has no root node.
    #[error("The taxonomy has no root node")]
    MissingRoot,

    /// A second root was added.
    #[error("The taxonomy already has a root: {0}")]
    DuplicateRoot(String),

    /// The root has no children, so there is nothing to classify.
    #[error("The taxonomy root has no children")]
    NoClasses,

    /// Node key already present.
    #[error("Duplicate taxonomy node: {0}")]
    DuplicateNode(String),

    /// Node key not present in the taxonomy.
    #[error("Unknown taxonomy node: {0}")]
    UnknownNode(String),

    /// A leaf has no class prior.
    #[error("Missing class prior for leaf node: {0}")]
    MissingClassPrior(String),

    /// Probability out of its valid range.
    #[error("Invalid probability for {name}: {value}")]
    InvalidProbability { name: String, value: f64 },

    /// Skill vector length does not match the number of inner nodes.
    #[error("Skill vector dimension mismatch: expected {expected}, got {got}")]
    SkillDimensionMismatch { expected: usize, got: usize },

    /// Worker not found by ID.
    #[error("Worker {0} not found")]
    UnknownWorker(String),

    /// Item not found by ID.
    #[error("Item {0} not found")]
    UnknownItem(String),

    /// A worker annotated the same item twice.
    #[error("Worker {worker} already annotated item {item}")]
    DuplicateAnnotation { item: String, worker: String },

    /// The cached trust-chain value is required but was never computed.
    #[error("Annotation by worker {worker} on item {item} has no prior-response probability")]
    MissingPriorResponse { item: String, worker: String },

    /// The item has no label estimate yet.
    #[error("Item {0} has no label")]
    Unlabeled(String),

    /// The label is a taxonomy node but not a class.
    #[error("Node {0} is not a leaf class")]
    NotAClass(String),

    /// Invalid hyperparameter configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for taxonomic-crowd operations.
pub type CrowdResult<T> = Result<T, CrowdError>;
