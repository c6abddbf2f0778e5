//! Core taxonomy structure: an arena of nodes with a key lookup.

use std::collections::HashMap;

use crate::types::{CrowdError, CrowdResult};

use super::traversal::{ancestors, breadth_first};

/// A node of the taxonomy. Leaves are classes; inner nodes hold skills.
#[derive(Debug, Clone)]
pub struct TaxonomyNode {
    /// Unique key.
    pub key: String,
    /// Arena position of the parent, `None` for the root.
    pub parent: Option<usize>,
    /// Arena positions of the children, in insertion order.
    pub children: Vec<usize>,
    /// Depth below the root (root = 0).
    pub level: u32,
    /// Occurrence prior. For inner nodes, the sum of descendant leaf priors.
    pub prob: f64,
}

impl TaxonomyNode {
    /// Whether this node is a class.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this node is the root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A rooted tree of class nodes.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    /// All nodes, in insertion order.
    nodes: Vec<TaxonomyNode>,
    /// Key -> arena position.
    lookup: HashMap<String, usize>,
    /// Arena position of the root.
    root: Option<usize>,
    /// Structure frozen.
    finalized: bool,
    /// Occurrence priors computed.
    priors_initialized: bool,
    /// Largest node level.
    max_depth: u32,
}

impl Taxonomy {
    /// Create an empty taxonomy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` (or as the root when `parent` is `None`).
    /// Returns the arena position.
    pub fn add_node(&mut self, key: &str, parent: Option<&str>) -> CrowdResult<usize> {
        if self.finalized {
            return Err(CrowdError::TaxonomyFinalized);
        }
        if self.lookup.contains_key(key) {
            return Err(CrowdError::DuplicateNode(key.to_string()));
        }

        let position = self.nodes.len();
        let (parent, level) = match parent {
            Some(parent_key) => {
                let parent = *self
                    .lookup
                    .get(parent_key)
                    .ok_or_else(|| CrowdError::UnknownNode(parent_key.to_string()))?;
                (Some(parent), self.nodes[parent].level + 1)
            }
            None => {
                if let Some(root) = self.root {
                    return Err(CrowdError::DuplicateRoot(self.nodes[root].key.clone()));
                }
                self.root = Some(position);
                (None, 0)
            }
        };

        if let Some(parent) = parent {
            self.nodes[parent].children.push(position);
        }
        self.nodes.push(TaxonomyNode {
            key: key.to_string(),
            parent,
            children: Vec::new(),
            level,
            prob: 0.0,
        });
        self.lookup.insert(key.to_string(), position);
        Ok(position)
    }

    /// Freeze the structure. The root must have at least one child.
    pub fn finalize(&mut self) -> CrowdResult<()> {
        let root = self.root.ok_or(CrowdError::MissingRoot)?;
        if self.nodes[root].is_leaf() {
            return Err(CrowdError::NoClasses);
        }
        self.max_depth = self.nodes.iter().map(|n| n.level).max().unwrap_or(0);
        self.finalized = true;
        Ok(())
    }

    /// Set leaf priors from `class_probs` and propagate sums to the ancestors.
    /// Every leaf needs a finite, non-negative prior. On error the current
    /// priors are left as they were.
    pub fn initialize_priors(&mut self, class_probs: &HashMap<String, f64>) -> CrowdResult<()> {
        if !self.finalized {
            return Err(CrowdError::TaxonomyNotFinalized);
        }

        let mut leaf_probs = Vec::new();
        for (position, node) in self.nodes.iter().enumerate() {
            if !node.is_leaf() {
                continue;
            }
            let prob = *class_probs
                .get(&node.key)
                .ok_or_else(|| CrowdError::MissingClassPrior(node.key.clone()))?;
            if !prob.is_finite() || prob < 0.0 {
                return Err(CrowdError::InvalidProbability {
                    name: node.key.clone(),
                    value: prob,
                });
            }
            leaf_probs.push((position, prob));
        }

        for node in &mut self.nodes {
            node.prob = 0.0;
        }
        for (leaf, prob) in leaf_probs {
            self.nodes[leaf].prob = prob;
            for ancestor in ancestors(&self.nodes, leaf) {
                self.nodes[ancestor].prob += prob;
            }
        }

        self.priors_initialized = true;
        Ok(())
    }

    /// Give every class the same prior.
    pub fn initialize_uniform_priors(&mut self) -> CrowdResult<()> {
        let leaves = self.leaf_nodes();
        let prob = 1.0 / leaves.len().max(1) as f64;
        let class_probs: HashMap<String, f64> =
            leaves.iter().map(|n| (n.key.clone(), prob)).collect();
        self.initialize_priors(&class_probs)
    }

    /// Class priors keyed by leaf key.
    pub fn class_probs(&self) -> HashMap<String, f64> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| (n.key.clone(), n.prob))
            .collect()
    }

    /// Breadth-first traversal from the root.
    pub fn breadth_first_traversal(&self) -> Vec<&TaxonomyNode> {
        match self.root {
            Some(root) => breadth_first(&self.nodes, root)
                .into_iter()
                .map(|i| &self.nodes[i])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Inner nodes (root included) in breadth-first order.
    pub fn inner_nodes(&self) -> Vec<&TaxonomyNode> {
        self.breadth_first_traversal()
            .into_iter()
            .filter(|n| !n.is_leaf())
            .collect()
    }

    /// Leaf nodes in breadth-first order.
    pub fn leaf_nodes(&self) -> Vec<&TaxonomyNode> {
        self.breadth_first_traversal()
            .into_iter()
            .filter(|n| n.is_leaf())
            .collect()
    }

    /// Look up a node by key.
    pub fn node(&self, key: &str) -> Option<&TaxonomyNode> {
        self.lookup.get(key).map(|&i| &self.nodes[i])
    }

    /// Arena position of a key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// Node at an arena position.
    pub fn node_at(&self, position: usize) -> Option<&TaxonomyNode> {
        self.nodes.get(position)
    }

    /// The root node.
    pub fn root(&self) -> Option<&TaxonomyNode> {
        self.root.map(|i| &self.nodes[i])
    }

    /// Ancestors of `key`, parent first, root last.
    pub fn ancestors(&self, key: &str) -> CrowdResult<Vec<&TaxonomyNode>> {
        let position = self
            .position(key)
            .ok_or_else(|| CrowdError::UnknownNode(key.to_string()))?;
        Ok(ancestors(&self.nodes, position)
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect())
    }

    /// The ancestor-or-self of `key` that sits at `level`.
    pub fn node_at_level_from_node(&self, level: u32, key: &str) -> Option<&TaxonomyNode> {
        let mut current = self.node(key)?;
        if level > current.level {
            return None;
        }
        while current.level > level {
            current = &self.nodes[current.parent?];
        }
        Some(current)
    }

    /// Largest node level (root = 0).
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the taxonomy has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of inner nodes (root included).
    pub fn num_inner_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// Number of classes.
    pub fn num_leaf_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Whether the structure is frozen.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Whether occurrence priors are set.
    pub fn priors_initialized(&self) -> bool {
        self.priors_initialized
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }
}
