//! Phase 3 tests: Label posterior engine.

use std::collections::BTreeMap;

use taxonomic_crowd::engine::LabelPosteriorEngine;
use taxonomic_crowd::index::FlatIndex;
use taxonomic_crowd::taxonomy::{Taxonomy, TaxonomyBuilder};
use taxonomic_crowd::types::{
    Annotation, CrowdError, CrowdParams, Item, Worker, WorkerSkill,
};

// ==================== Helpers ====================

fn two_class_taxonomy() -> Taxonomy {
    let mut builder = TaxonomyBuilder::new("root");
    builder
        .children("root", &["A", "B"])
        .class_prior("A", 0.5)
        .class_prior("B", 0.5);
    builder.build().unwrap()
}

fn deep_taxonomy() -> Taxonomy {
    let mut builder = TaxonomyBuilder::new("root");
    builder
        .children("root", &["animal", "plant"])
        .children("animal", &["cat", "dog"])
        .children("plant", &["oak", "pine"]);
    builder.build().unwrap()
}

fn workers(specs: &[(&str, Vec<f64>)]) -> BTreeMap<String, Worker> {
    specs
        .iter()
        .map(|(id, skill)| {
            (
                id.to_string(),
                Worker::new(*id, WorkerSkill::new(skill.clone(), 0.8)),
            )
        })
        .collect()
}

fn item(id: &str, annotations: &[(&str, &str)]) -> Item {
    let mut item = Item::new(id);
    for (worker, label) in annotations {
        item.add_annotation(Annotation::new(*worker, *label)).unwrap();
    }
    item
}

fn trust_params() -> CrowdParams {
    CrowdParams {
        model_worker_trust: true,
        ..CrowdParams::default()
    }
}

// ==================== Posterior Tests ====================

#[test]
fn test_single_worker_two_classes() {
    let taxonomy = two_class_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);

    let workers = workers(&[("w1", vec![0.9])]);
    let item = item("img", &[("w1", "A")]);

    let prediction = engine.predict(&item, &workers, false).unwrap();
    let posterior = prediction.posterior.unwrap();

    assert_eq!(posterior.label, "A");
    assert!((posterior.risk - 0.1).abs() < 1e-9);

    let lls = &posterior.class_log_likelihoods;
    let p_a = 1.0 / (1.0 + (lls[1] - lls[0]).exp());
    assert!((p_a - 0.9).abs() < 1e-9);
    assert_eq!(posterior.log_likelihood, lls[posterior.class_index]);
}

#[test]
fn test_perfect_worker_gives_near_zero_risk() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);

    let workers = workers(&[("w1", vec![1.0; index.num_inner()])]);
    for label in ["cat", "dog", "oak", "pine"] {
        let item = item("img", &[("w1", label)]);
        let posterior = engine.predict(&item, &workers, false).unwrap().posterior.unwrap();
        assert_eq!(posterior.label, label);
        assert!(posterior.risk < 1e-6, "risk {} for {}", posterior.risk, label);
    }
}

#[test]
fn test_random_guessing_worker_leaves_prior() {
    let mut builder = TaxonomyBuilder::new("root");
    builder.children("root", &["a", "b", "c"]);
    let taxonomy = builder.build().unwrap();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);

    // With uniform priors, skill 1/3 makes every report equally likely.
    let workers = workers(&[("w1", vec![1.0 / 3.0]), ("w2", vec![1.0 / 3.0])]);
    let item = item("img", &[("w1", "b"), ("w2", "c")]);

    let lls = engine.log_posteriors(&item, &workers).unwrap().unwrap();
    let max = lls.iter().cloned().fold(f64::MIN, f64::max);
    let total: f64 = lls.iter().map(|ll| (ll - max).exp()).sum();
    for ll in &lls {
        let posterior = (ll - max).exp() / total;
        assert!((posterior - 1.0 / 3.0).abs() < 1e-9);
    }

    let posterior = engine.predict(&item, &workers, false).unwrap().posterior.unwrap();
    assert!((posterior.risk - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_two_agreeing_workers_beat_one() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.8; 3]), ("w2", vec![0.8; 3])]);

    let one = engine
        .predict(&item("a", &[("w1", "dog")]), &workers, false)
        .unwrap()
        .posterior
        .unwrap();
    let two = engine
        .predict(&item("b", &[("w1", "dog"), ("w2", "dog")]), &workers, false)
        .unwrap()
        .posterior
        .unwrap();

    assert_eq!(one.label, "dog");
    assert_eq!(two.label, "dog");
    assert!(two.risk < one.risk);
}

#[test]
fn test_inner_node_annotation_narrows_subtree() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.9; 3]), ("w2", vec![0.6; 3])]);

    // "plant" from a good worker and "pine" from a weaker one.
    let item = item("img", &[("w1", "plant"), ("w2", "pine")]);
    let posterior = engine.predict(&item, &workers, false).unwrap().posterior.unwrap();
    assert_eq!(posterior.label, "pine");

    let lls = &posterior.class_log_likelihoods;
    let cat = index.class_index(index.id_of("cat").unwrap()).unwrap();
    let oak = index.class_index(index.id_of("oak").unwrap()).unwrap();
    assert!(lls[oak] > lls[cat]);
}

#[test]
fn test_no_contributing_annotations() {
    let taxonomy = two_class_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("bot", vec![0.9])]);

    let mut item = Item::new("img");
    item.add_annotation(Annotation::automated("bot", "A")).unwrap();

    let prediction = engine.predict(&item, &workers, false).unwrap();
    assert!(prediction.posterior.is_none());
    assert_eq!(prediction.prev_annotation_probs, vec![None]);
    assert!(engine.log_posteriors(&item, &workers).unwrap().is_none());

    // Counted once automated annotations are trusted like human ones.
    let naive = CrowdParams {
        naive_automated: true,
        ..CrowdParams::default()
    };
    let engine = LabelPosteriorEngine::new(&index, &naive);
    let prediction = engine.predict(&item, &workers, false).unwrap();
    assert_eq!(prediction.posterior.unwrap().label, "A");
}

#[test]
fn test_skip_finished_item() {
    let taxonomy = two_class_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let workers = workers(&[("w1", vec![0.9]), ("w2", vec![0.9])]);
    let mut item = item("img", &[("w1", "A"), ("w2", "A")]);
    item.finished = true;

    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let prediction = engine.predict(&item, &workers, true).unwrap();
    assert!(prediction.posterior.is_none());
    assert_eq!(prediction.prev_annotation_probs, vec![None, None]);

    // With trust modeled the chain is still refreshed.
    let params = trust_params();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let prediction = engine.predict(&item, &workers, true).unwrap();
    assert!(prediction.posterior.is_none());
    assert_eq!(prediction.prev_annotation_probs[0], Some(1.0));
    assert!((prediction.prev_annotation_probs[1].unwrap() - 0.8).abs() < 1e-12);

    // Not skipped without the flag.
    let prediction = engine.predict(&item, &workers, false).unwrap();
    assert!(prediction.posterior.is_some());
}

#[test]
fn test_trust_chain_cached_per_annotation() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = trust_params();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.8; 3]), ("w2", vec![0.8; 3]), ("w3", vec![0.8; 3])]);

    let mut item = item("img", &[("w1", "cat"), ("w2", "dog")]);
    item.add_annotation(Annotation::automated("bot", "cat")).unwrap();
    item.add_annotation(Annotation::new("w3", "dog")).unwrap();
    let workers = {
        let mut w = workers;
        w.insert(
            "bot".to_string(),
            Worker::new("bot", WorkerSkill::new(vec![0.8; 3], 0.8)),
        );
        w
    };

    let prediction = engine.predict(&item, &workers, false).unwrap();
    let probs = &prediction.prev_annotation_probs;
    assert_eq!(probs.len(), 4);
    assert_eq!(probs[0], Some(1.0));
    // w2 disagreed with w1: no trust, dog drawn by prior.
    let dog_prior = index.node_priors()[index.id_of("dog").unwrap()];
    assert!((probs[1].unwrap() - 0.2 * dog_prior).abs() < 1e-12);
    // The automated annotation is not part of the chain.
    assert_eq!(probs[2], None);
    assert!(probs[3].is_some());

    item.cache_prior_responses(probs);
    assert_eq!(item.annotations()[0].prob_prev_annos, Some(1.0));
    assert_eq!(item.annotations()[2].prob_prev_annos, None);
}

#[test]
fn test_two_worker_posterior_with_trust() {
    let taxonomy = two_class_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let workers = workers(&[("w1", vec![0.9]), ("w2", vec![0.9])]);
    let item = item("img", &[("w1", "A"), ("w2", "A")]);

    // P(. | A) = [root 1, A 0.9, B 0.1]; w2's history row is
    // [root 0.2, A 0.8, B 0.1].
    let expected_a = 0.5f64.ln() + (0.9f64 / 2.0).ln() + (0.72f64 / 0.93).ln();
    let expected_b = 0.5f64.ln() + (0.1f64 / 2.0).ln() + (0.08f64 / 0.37).ln();
    let expected_risk = 1.0 - 1.0 / (1.0 + (expected_b - expected_a).exp());

    for params in [trust_params(), CrowdParams::default()] {
        let engine = LabelPosteriorEngine::new(&index, &params);
        let posterior = engine.predict(&item, &workers, false).unwrap().posterior.unwrap();
        let lls = &posterior.class_log_likelihoods;
        assert!((lls[0] - expected_a).abs() < 1e-9, "A: {}", lls[0]);
        assert!((lls[1] - expected_b).abs() < 1e-9, "B: {}", lls[1]);
        assert_eq!(posterior.label, "A");
        assert!((posterior.risk - expected_risk).abs() < 1e-9);
    }
}

#[test]
fn test_history_shapes_posterior_without_trust_reestimation() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.8; 3]), ("w2", vec![0.8; 3])]);

    // Independent annotations would tie cat and dog; a trusting second
    // worker who still disagrees is the stronger evidence.
    let item = item("img", &[("w1", "dog"), ("w2", "cat")]);
    let posterior = engine.predict(&item, &workers, false).unwrap().posterior.unwrap();
    let lls = &posterior.class_log_likelihoods;
    let cat = index.class_index(index.id_of("cat").unwrap()).unwrap();
    let dog = index.class_index(index.id_of("dog").unwrap()).unwrap();

    assert_eq!(posterior.label, "cat");
    assert!((lls[cat] - -6.923274850015).abs() < 1e-9, "cat: {}", lls[cat]);
    assert!((lls[dog] - -7.500399916471).abs() < 1e-9, "dog: {}", lls[dog]);
}

#[test]
fn test_annotation_order_changes_posterior() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = trust_params();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.8; 3]), ("w2", vec![0.8; 3]), ("w3", vec![0.8; 3])]);

    let dog_first = item("a", &[("w1", "dog"), ("w2", "dog"), ("w3", "cat")]);
    let cat_first = item("b", &[("w3", "cat"), ("w1", "dog"), ("w2", "dog")]);

    let first = engine.predict(&dog_first, &workers, false).unwrap().posterior.unwrap();
    let second = engine.predict(&cat_first, &workers, false).unwrap().posterior.unwrap();

    // Same reports, different arrival order.
    assert_eq!(first.label, "dog");
    assert_eq!(second.label, "dog");
    let dog = index.class_index(index.id_of("dog").unwrap()).unwrap();
    assert!((first.class_log_likelihoods[dog] - -6.533047112879).abs() < 1e-9);
    assert!((second.class_log_likelihoods[dog] - -7.113578935776).abs() < 1e-9);
    assert!((first.risk - second.risk).abs() > 0.05);
}

#[test]
fn test_unknown_worker_and_label() {
    let taxonomy = two_class_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = CrowdParams::default();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.9])]);

    let missing_worker = item("img", &[("ghost", "A")]);
    assert!(matches!(
        engine.predict(&missing_worker, &workers, false),
        Err(CrowdError::UnknownWorker(_))
    ));

    let missing_label = item("img", &[("w1", "Z")]);
    assert!(matches!(
        engine.predict(&missing_label, &workers, false),
        Err(CrowdError::UnknownNode(_))
    ));
}

#[test]
fn test_prediction_is_deterministic() {
    let taxonomy = deep_taxonomy();
    let index = FlatIndex::build(&taxonomy).unwrap();
    let params = trust_params();
    let engine = LabelPosteriorEngine::new(&index, &params);
    let workers = workers(&[("w1", vec![0.7, 0.8, 0.9]), ("w2", vec![0.6, 0.5, 0.95])]);
    let item = item("img", &[("w1", "oak"), ("w2", "pine")]);

    let first = engine.predict(&item, &workers, false).unwrap();
    let second = engine.predict(&item, &workers, false).unwrap();
    assert_eq!(first, second);
}
