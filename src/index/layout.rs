//! Cell layout of the per-worker confusion matrix.

use crate::types::MIN_DENOMINATOR;

/// `M[node, node]` reads the skill of `parent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagonalCell {
    pub node: usize,
    pub parent: usize,
    /// An only child is always chosen correctly.
    pub only_child: bool,
}

/// `M[row, col] = (1 - skill[parent]) * weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffDiagonalCell {
    pub row: usize,
    pub col: usize,
    pub parent: usize,
    /// Prior of `col` normalized over the siblings of `row`.
    pub weight: f64,
}

/// Which matrix cells are filled for each sibling group, and how.
#[derive(Debug, Clone, Default)]
pub struct ConfusionLayout {
    pub diagonal: Vec<DiagonalCell>,
    pub off_diagonal: Vec<OffDiagonalCell>,
}

impl ConfusionLayout {
    /// Build from `[parent, child...]` groups and the node priors.
    pub fn build(parent_and_siblings: &[Vec<usize>], priors: &[f64]) -> Self {
        let mut layout = Self::default();

        for group in parent_and_siblings {
            let Some((&parent, siblings)) = group.split_first() else {
                continue;
            };
            let only_child = siblings.len() == 1;

            for &row in siblings {
                layout.diagonal.push(DiagonalCell {
                    node: row,
                    parent,
                    only_child,
                });

                let others = siblings.len() - 1;
                let mass: f64 = siblings
                    .iter()
                    .filter(|&&c| c != row)
                    .map(|&c| priors[c])
                    .sum();
                for &col in siblings {
                    if col == row {
                        continue;
                    }
                    let weight = if mass > 0.0 {
                        priors[col] / mass.max(MIN_DENOMINATOR)
                    } else {
                        1.0 / others as f64
                    };
                    layout.off_diagonal.push(OffDiagonalCell {
                        row,
                        col,
                        parent,
                        weight,
                    });
                }
            }
        }

        layout
    }
}
