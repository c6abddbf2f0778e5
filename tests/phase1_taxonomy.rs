//! Phase 1 tests: Taxonomy + flat index.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use taxonomic_crowd::index::{FlatIndex, ANNOTATION_PATH_PAD, CLASS_PATH_PAD};
use taxonomic_crowd::taxonomy::{Taxonomy, TaxonomyBuilder};
use taxonomic_crowd::types::CrowdError;

// ==================== Helpers ====================

/// root -> {animal -> {cat, dog}, plant -> {oak, pine, fern}, fungus}
fn sample_taxonomy() -> Taxonomy {
    let mut builder = TaxonomyBuilder::new("root");
    builder
        .children("root", &["animal", "plant", "fungus"])
        .children("animal", &["cat", "dog"])
        .children("plant", &["oak", "pine", "fern"]);
    builder.build().unwrap()
}

/// A random tree with `size` nodes: each new node hangs off a random
/// earlier node.
fn random_taxonomy(rng: &mut StdRng, size: usize) -> Taxonomy {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_node("n0", None).unwrap();
    // Make sure the root has a child.
    taxonomy.add_node("n1", Some("n0")).unwrap();
    for i in 2..size {
        let parent = rng.gen_range(0..i);
        taxonomy
            .add_node(&format!("n{}", i), Some(&format!("n{}", parent)))
            .unwrap();
    }
    taxonomy.finalize().unwrap();

    let class_probs: HashMap<String, f64> = taxonomy
        .leaf_nodes()
        .iter()
        .map(|n| (n.key.clone(), rng.gen_range(0.0..1.0)))
        .collect();
    taxonomy.initialize_priors(&class_probs).unwrap();
    taxonomy
}

// ==================== Taxonomy Tests ====================

#[test]
fn test_add_node_errors() {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_node("root", None).unwrap();

    assert!(matches!(
        taxonomy.add_node("root", Some("root")),
        Err(CrowdError::DuplicateNode(_))
    ));
    assert!(matches!(
        taxonomy.add_node("other", None),
        Err(CrowdError::DuplicateRoot(_))
    ));
    assert!(matches!(
        taxonomy.add_node("a", Some("missing")),
        Err(CrowdError::UnknownNode(_))
    ));

    taxonomy.add_node("a", Some("root")).unwrap();
    taxonomy.finalize().unwrap();
    assert!(matches!(
        taxonomy.add_node("b", Some("root")),
        Err(CrowdError::TaxonomyFinalized)
    ));
}

#[test]
fn test_finalize_requires_classes() {
    let mut empty = Taxonomy::new();
    assert!(matches!(empty.finalize(), Err(CrowdError::MissingRoot)));

    let mut lonely = Taxonomy::new();
    lonely.add_node("root", None).unwrap();
    assert!(matches!(lonely.finalize(), Err(CrowdError::NoClasses)));
}

#[test]
fn test_priors_sum_up_the_tree() {
    let mut builder = TaxonomyBuilder::new("root");
    builder
        .children("root", &["animal", "plant"])
        .children("animal", &["cat", "dog"])
        .class_prior("cat", 0.1)
        .class_prior("dog", 0.3)
        .class_prior("plant", 0.6);
    let taxonomy = builder.build().unwrap();

    assert!((taxonomy.node("animal").unwrap().prob - 0.4).abs() < 1e-12);
    assert!((taxonomy.node("root").unwrap().prob - 1.0).abs() < 1e-12);
    assert!((taxonomy.node("plant").unwrap().prob - 0.6).abs() < 1e-12);
}

#[test]
fn test_priors_recomputed_on_each_call() {
    let mut taxonomy = sample_taxonomy();
    taxonomy.initialize_uniform_priors().unwrap();
    taxonomy.initialize_uniform_priors().unwrap();
    let root = taxonomy.root().unwrap().prob;
    assert!((root - 1.0).abs() < 1e-12);
}

#[test]
fn test_missing_class_prior() {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_node("root", None).unwrap();
    taxonomy.add_node("a", Some("root")).unwrap();
    taxonomy.add_node("b", Some("root")).unwrap();
    taxonomy.finalize().unwrap();

    let mut class_probs = HashMap::new();
    class_probs.insert("a".to_string(), 1.0);
    assert!(matches!(
        taxonomy.initialize_priors(&class_probs),
        Err(CrowdError::MissingClassPrior(_))
    ));

    class_probs.insert("b".to_string(), -0.5);
    assert!(matches!(
        taxonomy.initialize_priors(&class_probs),
        Err(CrowdError::InvalidProbability { .. })
    ));
}

#[test]
fn test_failed_prior_update_keeps_old_priors() {
    let mut taxonomy = sample_taxonomy();
    let before: Vec<f64> = taxonomy.nodes().iter().map(|n| n.prob).collect();

    let mut class_probs = taxonomy.class_probs();
    class_probs.insert("cat".to_string(), 0.9);
    class_probs.remove("fern");
    assert!(matches!(
        taxonomy.initialize_priors(&class_probs),
        Err(CrowdError::MissingClassPrior(key)) if key == "fern"
    ));

    let after: Vec<f64> = taxonomy.nodes().iter().map(|n| n.prob).collect();
    assert_eq!(before, after);
    assert!(taxonomy.priors_initialized());
}

#[test]
fn test_breadth_first_order() {
    let taxonomy = sample_taxonomy();
    let keys: Vec<&str> = taxonomy
        .breadth_first_traversal()
        .iter()
        .map(|n| n.key.as_str())
        .collect();
    assert_eq!(
        keys,
        vec!["root", "animal", "plant", "fungus", "cat", "dog", "oak", "pine", "fern"]
    );

    let inner: Vec<&str> = taxonomy.inner_nodes().iter().map(|n| n.key.as_str()).collect();
    assert_eq!(inner, vec!["root", "animal", "plant"]);
    assert_eq!(taxonomy.num_leaf_nodes(), 6);
    assert_eq!(taxonomy.max_depth(), 2);
}

#[test]
fn test_ancestors_and_levels() {
    let taxonomy = sample_taxonomy();
    let ancestors: Vec<&str> = taxonomy
        .ancestors("pine")
        .unwrap()
        .iter()
        .map(|n| n.key.as_str())
        .collect();
    assert_eq!(ancestors, vec!["plant", "root"]);

    assert_eq!(
        taxonomy.node_at_level_from_node(1, "pine").unwrap().key,
        "plant"
    );
    assert_eq!(taxonomy.node_at_level_from_node(0, "pine").unwrap().key, "root");
    assert!(taxonomy.node_at_level_from_node(3, "pine").is_none());
}

// ==================== Flat Index Tests ====================

#[test]
fn test_index_requires_finalized_taxonomy() {
    let mut taxonomy = Taxonomy::new();
    taxonomy.add_node("root", None).unwrap();
    taxonomy.add_node("a", Some("root")).unwrap();
    assert!(matches!(
        FlatIndex::build(&taxonomy),
        Err(CrowdError::TaxonomyNotFinalized)
    ));

    taxonomy.finalize().unwrap();
    assert!(matches!(
        FlatIndex::build(&taxonomy),
        Err(CrowdError::PriorsNotInitialized)
    ));
}

#[test]
fn test_index_id_ranges() {
    let taxonomy = sample_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();

    assert_eq!(index.num_nodes(), 9);
    assert_eq!(index.num_inner(), 3);
    assert_eq!(index.num_classes(), 6);
    assert_eq!(index.id_of("root"), Some(0));

    for node in taxonomy.inner_nodes() {
        let id = index.id_of(&node.key).unwrap();
        assert!(id < index.num_inner());
    }
    for node in taxonomy.leaf_nodes() {
        let id = index.id_of(&node.key).unwrap();
        assert!(id >= index.num_inner() && id < index.num_nodes());
    }
    assert_eq!(index.class_key(0), Some("fungus"));
}

#[test]
fn test_index_parent_and_siblings() {
    let taxonomy = sample_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();

    let plant = index.id_of("plant").unwrap();
    let expected: Vec<usize> = ["plant", "oak", "pine", "fern"]
        .iter()
        .map(|k| index.id_of(k).unwrap())
        .collect();
    assert_eq!(index.parent_and_siblings()[plant], expected);

    assert_eq!(index.parent_of(0), None);
    assert_eq!(index.parent_of(index.id_of("oak").unwrap()), Some(plant));
    assert_eq!(index.parent_ids().len(), index.num_nodes() - 1);
}

#[test]
fn test_index_padded_paths() {
    let taxonomy = sample_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();

    let fungus = index.id_of("fungus").unwrap();
    let class = index.class_index(fungus).unwrap();
    let class_row = index.class_paths().row(class);
    assert_eq!(class_row, &[0, fungus as isize, CLASS_PATH_PAD]);

    let animal = index.id_of("animal").unwrap();
    let annotation_row = index.annotation_paths().row(animal);
    assert_eq!(annotation_row, &[0, animal as isize, ANNOTATION_PATH_PAD]);

    assert_eq!(index.annotation_paths().row(0), &[0, ANNOTATION_PATH_PAD, ANNOTATION_PATH_PAD]);
}

#[test]
fn test_random_taxonomies_bijection_and_paths() {
    let mut rng = StdRng::seed_from_u64(7);
    for trial in 0..20 {
        let size = 2 + trial * 3;
        let taxonomy = random_taxonomy(&mut rng, size);
        let index = FlatIndex::build(&taxonomy).unwrap();

        assert_eq!(index.num_nodes(), taxonomy.len());
        assert_eq!(index.num_inner(), taxonomy.num_inner_nodes());
        assert_eq!(index.num_classes(), taxonomy.num_leaf_nodes());

        for id in 0..index.num_nodes() {
            let key = index.key_of(id).unwrap();
            assert_eq!(index.id_of(key), Some(id));
            assert_eq!(index.is_inner(id), !taxonomy.node(key).unwrap().is_leaf());

            // Reversed ancestors followed by the node itself.
            let mut expected: Vec<usize> = taxonomy
                .ancestors(key)
                .unwrap()
                .iter()
                .rev()
                .map(|n| index.id_of(&n.key).unwrap())
                .collect();
            expected.push(id);
            assert_eq!(index.root_path(id), expected.as_slice());

            let padded = index.annotation_paths().row(id);
            for (i, &step) in expected.iter().enumerate() {
                assert_eq!(padded[i], step as isize);
            }
            assert!(padded[expected.len()..]
                .iter()
                .all(|&p| p == ANNOTATION_PATH_PAD));
        }
    }
}

#[test]
fn test_scatter_stops_after_divergence() {
    let taxonomy = sample_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();

    let cat = index.class_index(index.id_of("cat").unwrap()).unwrap();
    let oak = index.id_of("oak").unwrap();
    let dog = index.id_of("dog").unwrap();

    // cat vs oak: confused at the root, then one blind guess, nothing more.
    let (confusion, blind) = index.scatter().cells(cat, oak);
    assert_eq!(confusion.len(), 1);
    assert_eq!(confusion[0].row, index.id_of("animal").unwrap());
    assert_eq!(confusion[0].col, index.id_of("plant").unwrap());
    assert_eq!(blind.len(), 1);
    assert_eq!(blind[0].col, oak);
    assert_eq!(blind[0].level, 1);

    // cat vs dog: agree at level 0, siblings at level 1.
    let (confusion, blind) = index.scatter().cells(cat, dog);
    assert_eq!(confusion.len(), 2);
    assert!(blind.is_empty());

    // Annotating the root reads nothing.
    let (confusion, blind) = index.scatter().cells(cat, 0);
    assert!(confusion.is_empty() && blind.is_empty());
}
