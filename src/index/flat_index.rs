//! Flat integer index over a finalized taxonomy.
//!
//! Inner nodes get ids `0..num_inner` (the root is 0) and leaves get
//! `num_inner..num_nodes`, both in breadth-first order. Every derived table
//! is indexed by these ids and is read-only after construction; changing the
//! taxonomy means building a new index.

use std::collections::HashMap;

use crate::taxonomy::{root_path, Taxonomy};
use crate::types::{CrowdError, CrowdResult};

use super::layout::ConfusionLayout;
use super::path_table::{PathTable, ANNOTATION_PATH_PAD, CLASS_PATH_PAD};
use super::scatter::ScatterTables;

/// Dense integer view of a taxonomy.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    /// Node key -> id.
    key_to_id: HashMap<String, usize>,
    /// Id -> node key.
    id_to_key: Vec<String>,
    /// Number of inner nodes.
    num_inner: usize,
    /// Ids of the leaves; class index `c` is `leaf_ids[c]`.
    leaf_ids: Vec<usize>,
    /// Occurrence prior per id.
    node_priors: Vec<f64>,
    /// Per inner node: `[id, child ids...]`.
    parent_and_siblings: Vec<Vec<usize>>,
    /// Parent id of node `id`, stored at `id - 1` (the root has none).
    parent_ids: Vec<usize>,
    /// Unpadded root-to-node id path per id.
    root_paths: Vec<Vec<usize>>,
    /// Padded paths, one row per class.
    class_paths: PathTable,
    /// Padded paths, one row per node.
    annotation_paths: PathTable,
    /// Tensor scatter reads.
    scatter: ScatterTables,
    /// Confusion-matrix cell layout.
    layout: ConfusionLayout,
    /// Max depth + 1.
    max_path_length: usize,
}

impl FlatIndex {
    /// Index a finalized taxonomy with initialized priors.
    pub fn build(taxonomy: &Taxonomy) -> CrowdResult<Self> {
        if !taxonomy.is_finalized() {
            return Err(CrowdError::TaxonomyNotFinalized);
        }
        if !taxonomy.priors_initialized() {
            return Err(CrowdError::PriorsNotInitialized);
        }

        // Inner nodes first: they are the ones holding skill values.
        let inner = taxonomy.inner_nodes();
        let leaves = taxonomy.leaf_nodes();
        let num_inner = inner.len();
        let num_nodes = num_inner + leaves.len();

        let mut key_to_id = HashMap::with_capacity(num_nodes);
        let mut id_to_key = Vec::with_capacity(num_nodes);
        for node in inner.iter().chain(leaves.iter()) {
            key_to_id.insert(node.key.clone(), id_to_key.len());
            id_to_key.push(node.key.clone());
        }
        let leaf_ids: Vec<usize> = (num_inner..num_nodes).collect();

        // Arena position -> id, so tree walks can be translated.
        let mut position_to_id = vec![0usize; taxonomy.len()];
        let mut id_to_position = vec![0usize; num_nodes];
        for (id, key) in id_to_key.iter().enumerate() {
            let position = taxonomy
                .position(key)
                .ok_or_else(|| CrowdError::UnknownNode(key.clone()))?;
            position_to_id[position] = id;
            id_to_position[id] = position;
        }

        let nodes = taxonomy.nodes();
        let node_priors: Vec<f64> = id_to_position.iter().map(|&p| nodes[p].prob).collect();

        let parent_and_siblings: Vec<Vec<usize>> = (0..num_inner)
            .map(|id| {
                let node = &nodes[id_to_position[id]];
                std::iter::once(id)
                    .chain(node.children.iter().map(|&c| position_to_id[c]))
                    .collect()
            })
            .collect();

        let parent_ids: Vec<usize> = (0..num_nodes)
            .filter_map(|id| nodes[id_to_position[id]].parent.map(|p| position_to_id[p]))
            .collect();

        let max_path_length = taxonomy.max_depth() as usize + 1;
        let mut class_paths = PathTable::new(leaves.len(), max_path_length, CLASS_PATH_PAD);
        let mut annotation_paths = PathTable::new(num_nodes, max_path_length, ANNOTATION_PATH_PAD);
        let mut root_paths = Vec::with_capacity(num_nodes);

        for id in 0..num_nodes {
            let path: Vec<usize> = root_path(nodes, id_to_position[id])
                .into_iter()
                .map(|p| position_to_id[p])
                .collect();
            debug_assert!(path[..path.len() - 1].iter().all(|&a| a < num_inner));

            annotation_paths.set_row(id, &path);
            if id >= num_inner {
                class_paths.set_row(id - num_inner, &path);
            }
            root_paths.push(path);
        }

        let scatter = ScatterTables::build(&class_paths, &annotation_paths);
        let layout = ConfusionLayout::build(&parent_and_siblings, &node_priors);

        log::debug!(
            "Indexed taxonomy: {} inner nodes, {} classes, {} confusion reads, {} blind-guess reads",
            num_inner,
            leaf_ids.len(),
            scatter.confusion_cells().len(),
            scatter.blind_guess_cells().len()
        );

        Ok(Self {
            key_to_id,
            id_to_key,
            num_inner,
            leaf_ids,
            node_priors,
            parent_and_siblings,
            parent_ids,
            root_paths,
            class_paths,
            annotation_paths,
            scatter,
            layout,
            max_path_length,
        })
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.id_to_key.len()
    }

    /// Number of inner nodes (length of a skill vector).
    pub fn num_inner(&self) -> usize {
        self.num_inner
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.leaf_ids.len()
    }

    /// Id of a node key.
    pub fn id_of(&self, key: &str) -> Option<usize> {
        self.key_to_id.get(key).copied()
    }

    /// Id of a node key, or `UnknownNode`.
    pub fn require_id(&self, key: &str) -> CrowdResult<usize> {
        self.id_of(key)
            .ok_or_else(|| CrowdError::UnknownNode(key.to_string()))
    }

    /// Key of an id.
    pub fn key_of(&self, id: usize) -> Option<&str> {
        self.id_to_key.get(id).map(|k| k.as_str())
    }

    /// Whether an id belongs to an inner node.
    pub fn is_inner(&self, id: usize) -> bool {
        id < self.num_inner
    }

    /// Class index of a leaf id.
    pub fn class_index(&self, id: usize) -> Option<usize> {
        if id >= self.num_inner && id < self.num_nodes() {
            Some(id - self.num_inner)
        } else {
            None
        }
    }

    /// Key of a class index.
    pub fn class_key(&self, class: usize) -> Option<&str> {
        self.leaf_ids.get(class).and_then(|&id| self.key_of(id))
    }

    /// Ids of all leaves, in class order.
    pub fn leaf_ids(&self) -> &[usize] {
        &self.leaf_ids
    }

    /// Occurrence prior per id.
    pub fn node_priors(&self) -> &[f64] {
        &self.node_priors
    }

    /// Prior of every class, in class order.
    pub fn class_priors(&self) -> Vec<f64> {
        self.leaf_ids.iter().map(|&id| self.node_priors[id]).collect()
    }

    /// `[id, child ids...]` for every inner node.
    pub fn parent_and_siblings(&self) -> &[Vec<usize>] {
        &self.parent_and_siblings
    }

    /// Parent id, `None` for the root.
    pub fn parent_of(&self, id: usize) -> Option<usize> {
        if id == 0 {
            None
        } else {
            self.parent_ids.get(id - 1).copied()
        }
    }

    /// Parent ids of nodes `1..num_nodes`.
    pub fn parent_ids(&self) -> &[usize] {
        &self.parent_ids
    }

    /// Root-to-node id path, root first, node last.
    pub fn root_path(&self, id: usize) -> &[usize] {
        &self.root_paths[id]
    }

    /// Padded class path table.
    pub fn class_paths(&self) -> &PathTable {
        &self.class_paths
    }

    /// Padded annotation path table.
    pub fn annotation_paths(&self) -> &PathTable {
        &self.annotation_paths
    }

    /// Scatter reads for the annotation-likelihood tensor.
    pub fn scatter(&self) -> &ScatterTables {
        &self.scatter
    }

    /// Confusion-matrix cell layout.
    pub fn layout(&self) -> &ConfusionLayout {
        &self.layout
    }

    /// Max depth + 1.
    pub fn max_path_length(&self) -> usize {
        self.max_path_length
    }
}
