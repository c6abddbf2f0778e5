//! Fluent API for building Taxonomy instances.

use std::collections::HashMap;

use crate::types::CrowdResult;

use super::Taxonomy;

/// Fluent builder for a finalized taxonomy with initialized priors.
pub struct TaxonomyBuilder {
    root: String,
    edges: Vec<(String, String)>,
    class_probs: HashMap<String, f64>,
}

impl TaxonomyBuilder {
    /// Start a taxonomy with the given root key.
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            edges: Vec::new(),
            class_probs: HashMap::new(),
        }
    }

    /// Add `key` as the next child of `parent`.
    pub fn child(&mut self, parent: &str, key: &str) -> &mut Self {
        self.edges.push((parent.to_string(), key.to_string()));
        self
    }

    /// Add several children of `parent`, in order.
    pub fn children(&mut self, parent: &str, keys: &[&str]) -> &mut Self {
        for key in keys {
            self.child(parent, key);
        }
        self
    }

    /// Set the prior of a class.
    pub fn class_prior(&mut self, key: &str, prob: f64) -> &mut Self {
        self.class_probs.insert(key.to_string(), prob);
        self
    }

    /// Build, finalize, and initialize priors. Without any explicit class
    /// prior every class gets the same prior.
    pub fn build(self) -> CrowdResult<Taxonomy> {
        let mut taxonomy = Taxonomy::new();
        taxonomy.add_node(&self.root, None)?;
        for (parent, key) in &self.edges {
            taxonomy.add_node(key, Some(parent))?;
        }
        taxonomy.finalize()?;

        if self.class_probs.is_empty() {
            taxonomy.initialize_uniform_priors()?;
        } else {
            taxonomy.initialize_priors(&self.class_probs)?;
        }
        Ok(taxonomy)
    }
}
