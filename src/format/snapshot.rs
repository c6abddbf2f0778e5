//! JSON snapshots of worker parameters and item labels.

use serde::{Deserialize, Serialize};

use crate::index::FlatIndex;
use crate::types::{CrowdError, CrowdResult, Item, Worker, WorkerSkill};

/// A worker's parameters as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub id: String,
    pub skill_vector: Vec<f64>,
    pub prob_trust: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// An item's current label as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub label: Option<String>,
    pub risk: f64,
    pub finished: bool,
}

/// Capture a worker's parameters.
pub fn encode_worker(worker: &Worker) -> WorkerSnapshot {
    WorkerSnapshot {
        id: worker.id.clone(),
        skill_vector: worker.skill.skill_vector.clone(),
        prob_trust: worker.skill.prob_trust,
        accuracy: worker.skill.accuracy,
    }
}

/// Restore worker parameters, checking the vector against the index.
pub fn decode_worker(snapshot: &WorkerSnapshot, index: &FlatIndex) -> CrowdResult<WorkerSkill> {
    if snapshot.skill_vector.len() != index.num_inner() {
        return Err(CrowdError::SkillDimensionMismatch {
            expected: index.num_inner(),
            got: snapshot.skill_vector.len(),
        });
    }
    if !(0.0..=1.0).contains(&snapshot.prob_trust) {
        return Err(CrowdError::InvalidProbability {
            name: format!("{}.prob_trust", snapshot.id),
            value: snapshot.prob_trust,
        });
    }
    Ok(WorkerSkill {
        skill_vector: snapshot.skill_vector.clone(),
        prob_trust: snapshot.prob_trust,
        accuracy: snapshot.accuracy,
    })
}

/// Capture an item's label.
pub fn encode_item(item: &Item) -> ItemSnapshot {
    ItemSnapshot {
        id: item.id.clone(),
        label: item.label().map(|l| l.to_string()),
        risk: item.risk(),
        finished: item.finished,
    }
}

/// Serialize any snapshot value to pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> CrowdResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Parse a snapshot value from JSON.
pub fn from_json<T: for<'de> Deserialize<'de>>(text: &str) -> CrowdResult<T> {
    Ok(serde_json::from_str(text)?)
}
