//! CrowdDataset owns the taxonomy, workers, items and priors.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;

use crate::engine::{
    annotation_log_likelihood, estimate_dataset_priors, item_log_likelihood, majority_vote,
    run_round, worker_log_likelihood, ConfusionModel, DatasetPriors, LabelPosteriorEngine,
    ParameterEstimator, RoundReport,
};
use crate::index::FlatIndex;
use crate::taxonomy::Taxonomy;
use crate::types::{
    safe_ln, Annotation, CrowdError, CrowdParams, CrowdResult, Item, LabelEstimate, Worker,
    WorkerSkill,
};

/// A labeling dataset over one taxonomy.
pub struct CrowdDataset {
    taxonomy: Taxonomy,
    index: FlatIndex,
    params: CrowdParams,
    priors: DatasetPriors,
    /// Class priors the dataset was created with.
    initial_class_probs: BTreeMap<String, f64>,
    workers: BTreeMap<String, Worker>,
    items: BTreeMap<String, Item>,
}

impl CrowdDataset {
    /// Create an empty dataset. The taxonomy must be finalized with priors.
    pub fn new(taxonomy: Taxonomy, params: CrowdParams) -> CrowdResult<Self> {
        params.validate()?;
        let index = FlatIndex::build(&taxonomy)?;
        let priors = DatasetPriors::initial(&index, &params);
        let initial_class_probs = priors.class_probs.clone();

        Ok(Self {
            taxonomy,
            index,
            params,
            priors,
            initial_class_probs,
            workers: BTreeMap::new(),
            items: BTreeMap::new(),
        })
    }

    /// Record that `worker_id` reported `label` for `item_id`. Unknown
    /// workers and items are created; new workers start with default skill.
    pub fn add_annotation(
        &mut self,
        item_id: &str,
        worker_id: &str,
        label: &str,
        automated: bool,
    ) -> CrowdResult<()> {
        self.index.require_id(label)?;

        let annotation = if automated {
            Annotation::automated(worker_id, label)
        } else {
            Annotation::new(worker_id, label)
        };
        self.items
            .entry(item_id.to_string())
            .or_insert_with(|| Item::new(item_id))
            .add_annotation(annotation)?;

        let default_skill = self.default_skill();
        self.workers
            .entry(worker_id.to_string())
            .or_insert_with(|| Worker::new(worker_id, default_skill))
            .items
            .push(item_id.to_string());
        Ok(())
    }

    /// Register an item with no annotations.
    pub fn add_item(&mut self, item_id: &str) {
        self.items
            .entry(item_id.to_string())
            .or_insert_with(|| Item::new(item_id));
    }

    fn default_skill(&self) -> WorkerSkill {
        WorkerSkill::new(
            self.params.default_skill_vector(self.index.num_inner()),
            self.priors.prob_trust,
        )
    }

    /// Reset worker parameters to the defaults. With `skip_finished`,
    /// finished workers keep theirs.
    pub fn initialize_parameters(&mut self, skip_finished: bool) {
        let default_skill = self.default_skill();
        for worker in self.workers.values_mut() {
            if skip_finished && worker.finished {
                continue;
            }
            worker.skill = default_skill.clone();
        }
    }

    /// Give every unfinished item a starting label by majority vote over
    /// leaf annotations, or by the fallback policy when there is none.
    pub fn initialize_labels<R: Rng + ?Sized>(&mut self, rng: &mut R) -> CrowdResult<()> {
        let class_priors = self.index.class_priors();
        for item in self.items.values_mut() {
            if item.finished {
                continue;
            }
            let estimate = match majority_vote(item, &self.index) {
                Some(label) => {
                    let class = self
                        .index
                        .class_index(self.index.require_id(&label)?)
                        .ok_or_else(|| CrowdError::NotAClass(label.clone()))?;
                    LabelEstimate {
                        label,
                        risk: 1.0,
                        log_likelihood: safe_ln(class_priors[class]),
                    }
                }
                None => self.params.fallback.estimate(&self.index, rng)?,
            };
            item.estimate = Some(estimate);
        }
        Ok(())
    }

    /// Re-estimate the dataset-wide priors from the current labels, or from
    /// `ground_truth` (item id -> class key) when given. The dataset is not
    /// changed; see `apply_dataset_priors`.
    pub fn estimate_dataset_priors(
        &self,
        ground_truth: Option<&HashMap<String, String>>,
    ) -> CrowdResult<DatasetPriors> {
        estimate_dataset_priors(
            &self.index,
            &self.params,
            &self.initial_class_probs,
            &self.items,
            &self.workers,
            ground_truth,
        )
    }

    /// Install new dataset-wide priors. The class priors are pushed into the
    /// taxonomy and the index is rebuilt; node ids do not change. On error
    /// the dataset is left as it was.
    pub fn apply_dataset_priors(&mut self, priors: DatasetPriors) -> CrowdResult<()> {
        if priors.pooled_prob_correct.len() != self.index.num_inner() {
            return Err(CrowdError::SkillDimensionMismatch {
                expected: self.index.num_inner(),
                got: priors.pooled_prob_correct.len(),
            });
        }
        let mut taxonomy = self.taxonomy.clone();
        taxonomy.initialize_priors(&priors.class_prob_map())?;
        self.index = FlatIndex::build(&taxonomy)?;
        self.taxonomy = taxonomy;
        self.priors = priors;
        Ok(())
    }

    /// Run one EM round.
    pub fn run_round<R: Rng + ?Sized>(
        &mut self,
        skip_finished: bool,
        rng: &mut R,
    ) -> CrowdResult<RoundReport> {
        run_round(
            &self.index,
            &self.params,
            &self.priors,
            &mut self.workers,
            &mut self.items,
            skip_finished,
            rng,
        )
    }

    /// Sum of item, worker and annotation log-likelihoods. Unlabeled items
    /// contribute nothing.
    pub fn log_likelihood(&self) -> CrowdResult<f64> {
        let mut ll = 0.0;
        let mut models: HashMap<&str, ConfusionModel> = HashMap::new();
        for worker in self.workers.values() {
            ll += worker_log_likelihood(&worker.skill, &self.params, &self.priors);
            models.insert(
                worker.id.as_str(),
                ConfusionModel::build(&self.index, &worker.skill.skill_vector)?,
            );
        }

        let naive = self.params.naive_automated;
        for item in self.items.values() {
            if item.estimate.is_none() {
                continue;
            }
            ll += item_log_likelihood(item);
            for annotation in item.contributing(naive) {
                let model = models
                    .get(annotation.worker_id.as_str())
                    .ok_or_else(|| CrowdError::UnknownWorker(annotation.worker_id.clone()))?;
                ll += annotation_log_likelihood(&self.index, &self.params, model, item, annotation)?;
            }
        }
        Ok(ll)
    }

    /// A posterior engine over this dataset's index and parameters.
    pub fn posterior_engine(&self) -> LabelPosteriorEngine<'_> {
        LabelPosteriorEngine::new(&self.index, &self.params)
    }

    /// A parameter estimator over this dataset's index, parameters and priors.
    pub fn estimator(&self) -> ParameterEstimator<'_> {
        ParameterEstimator::new(&self.index, &self.params, &self.priors)
    }

    /// Overwrite a worker's parameters, e.g. from a snapshot.
    pub fn set_worker_skill(&mut self, worker_id: &str, skill: WorkerSkill) -> CrowdResult<()> {
        if skill.skill_vector.len() != self.index.num_inner() {
            return Err(CrowdError::SkillDimensionMismatch {
                expected: self.index.num_inner(),
                got: skill.skill_vector.len(),
            });
        }
        let worker = self
            .workers
            .get_mut(worker_id)
            .ok_or_else(|| CrowdError::UnknownWorker(worker_id.to_string()))?;
        worker.skill = skill;
        Ok(())
    }

    /// The taxonomy.
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// The flat index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// The hyperparameters.
    pub fn params(&self) -> &CrowdParams {
        &self.params
    }

    /// The dataset-wide priors in use.
    pub fn priors(&self) -> &DatasetPriors {
        &self.priors
    }

    /// All workers by id.
    pub fn workers(&self) -> &BTreeMap<String, Worker> {
        &self.workers
    }

    /// All items by id.
    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    /// A worker by id.
    pub fn worker(&self, id: &str) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// An item by id.
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Mutable access to a worker.
    pub fn worker_mut(&mut self, id: &str) -> Option<&mut Worker> {
        self.workers.get_mut(id)
    }

    /// Mutable access to an item.
    pub fn item_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
