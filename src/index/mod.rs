//! Flat index structures built once per taxonomy. All read-only after construction.

pub mod flat_index;
pub mod layout;
pub mod path_table;
pub mod scatter;

pub use flat_index::FlatIndex;
pub use layout::{ConfusionLayout, DiagonalCell, OffDiagonalCell};
pub use path_table::{PathTable, ANNOTATION_PATH_PAD, CLASS_PATH_PAD};
pub use scatter::{BlindGuessCell, ConfusionCell, ScatterTables};
