//! The class taxonomy, a rooted tree stored as an arena.

pub mod builder;
pub mod traversal;
pub mod tree;

pub use builder::TaxonomyBuilder;
pub use traversal::{ancestors, breadth_first, root_path};
pub use tree::{Taxonomy, TaxonomyNode};
