//! Scatter tables: where each annotation-likelihood factor is read from.
//!
//! For a true class `y` and a reported node `z`, the probability that a
//! worker reports `z` is a product of one factor per level of `z`'s root
//! path. While the two paths share the ancestor at a level, the factor is
//! the confusion-matrix cell for the two children taken there. At the first
//! level where they differ, the factor is the blind-guess cell of `z`'s
//! child, and deeper levels contribute nothing.
//!
//! The tables list those reads for every `(y, z)` pair once per taxonomy,
//! so every worker's likelihood tensor is filled by plain scatter copies.

use super::path_table::PathTable;

/// Copy `M[row, col]` into `tensor[class, node, level]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionCell {
    pub class: usize,
    pub node: usize,
    pub level: usize,
    pub row: usize,
    pub col: usize,
}

/// Copy `N[col]` into `tensor[class, node, level]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlindGuessCell {
    pub class: usize,
    pub node: usize,
    pub level: usize,
    pub col: usize,
}

/// Precomputed scatter lists for all `(class, node)` pairs.
#[derive(Debug, Clone)]
pub struct ScatterTables {
    confusion: Vec<ConfusionCell>,
    blind_guess: Vec<BlindGuessCell>,
    /// Start of each `(class, node)` pair in `confusion`; one extra entry.
    confusion_offsets: Vec<usize>,
    /// Start of each `(class, node)` pair in `blind_guess`; one extra entry.
    blind_guess_offsets: Vec<usize>,
    num_nodes: usize,
}

impl ScatterTables {
    /// Walk every class path against every non-root annotation path.
    pub fn build(class_paths: &PathTable, annotation_paths: &PathTable) -> Self {
        let num_classes = class_paths.len();
        let num_nodes = annotation_paths.len();
        let pairs = num_classes * num_nodes;

        let mut confusion = Vec::new();
        let mut blind_guess = Vec::new();
        let mut confusion_offsets = Vec::with_capacity(pairs + 1);
        let mut blind_guess_offsets = Vec::with_capacity(pairs + 1);

        for class in 0..num_classes {
            let path_y = class_paths.row(class);

            for node in 0..num_nodes {
                confusion_offsets.push(confusion.len());
                blind_guess_offsets.push(blind_guess.len());

                // Annotations at the root carry no information.
                if node == 0 {
                    continue;
                }

                let path_z = annotation_paths.row(node);
                let z_level = annotation_paths.depth(node).saturating_sub(1);

                for level in 0..z_level {
                    if path_y[level] == path_z[level] {
                        // Same parent: index the confusion matrix by the two children.
                        // Both paths continue below a shared inner node.
                        let (Some(row), Some(col)) = (
                            class_paths.get(class, level + 1),
                            annotation_paths.get(node, level + 1),
                        ) else {
                            break;
                        };
                        confusion.push(ConfusionCell {
                            class,
                            node,
                            level,
                            row,
                            col,
                        });
                    } else {
                        if let Some(col) = annotation_paths.get(node, level + 1) {
                            blind_guess.push(BlindGuessCell {
                                class,
                                node,
                                level,
                                col,
                            });
                        }
                        break;
                    }
                }
            }
        }
        confusion_offsets.push(confusion.len());
        blind_guess_offsets.push(blind_guess.len());

        Self {
            confusion,
            blind_guess,
            confusion_offsets,
            blind_guess_offsets,
            num_nodes,
        }
    }

    /// All confusion-matrix reads.
    pub fn confusion_cells(&self) -> &[ConfusionCell] {
        &self.confusion
    }

    /// All blind-guess reads.
    pub fn blind_guess_cells(&self) -> &[BlindGuessCell] {
        &self.blind_guess
    }

    /// The reads for one `(class, node)` pair.
    pub fn cells(&self, class: usize, node: usize) -> (&[ConfusionCell], &[BlindGuessCell]) {
        let pair = class * self.num_nodes + node;
        (
            &self.confusion[self.confusion_offsets[pair]..self.confusion_offsets[pair + 1]],
            &self.blind_guess[self.blind_guess_offsets[pair]..self.blind_guess_offsets[pair + 1]],
        )
    }
}
