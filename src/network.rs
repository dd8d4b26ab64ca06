//! Trainer contract and the bundled discrete Bayesian network.
//!
//! The pipeline only relies on [`ProbabilisticModel`]: a declared attribute
//! set, a training call over flat string records, and a save call. The
//! [`BayesianNetwork`] implementation fills conditional probability tables by
//! counting value frequencies under each parent-value combination.

use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::errors::PipelineError;
use crate::types::{AttributeName, WireRecord};

/// Contract every trainer must honor.
pub trait ProbabilisticModel {
    /// Open a model-structure artifact.
    fn load(path: &Path) -> Result<Self, PipelineError>
    where
        Self: Sized;

    /// Attribute names the model is parameterized over, in sampling order.
    fn declared_attributes(&self) -> Vec<AttributeName>;

    /// Fit internal probability tables from `rows`, replacing previous state.
    fn train(&mut self, rows: &[WireRecord]) -> Result<(), PipelineError>;

    /// Persist the learned definition to `path`.
    fn save(&self, path: &Path) -> Result<(), PipelineError>;
}

/// One network node as stored in structure and definition files.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Attribute the node samples.
    pub name: AttributeName,
    /// Parent attributes, each declared earlier in the network.
    #[serde(default)]
    pub parent_names: Vec<AttributeName>,
    /// Distinct wire values in first-seen order.
    #[serde(default)]
    pub possible_values: Vec<String>,
    /// Nested probability table keyed by parent values.
    #[serde(default)]
    pub conditional_probabilities: Value,
}

/// Serialized network: nodes in sampling order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkDefinition {
    /// Nodes, parents before children.
    pub nodes: Vec<NodeDefinition>,
}

/// Discrete Bayesian network backed by a [`NetworkDefinition`].
#[derive(Clone, Debug)]
pub struct BayesianNetwork {
    name: String,
    definition: NetworkDefinition,
}

impl BayesianNetwork {
    /// Wrap an in-memory definition, checking that parents precede children.
    pub fn from_definition(
        name: impl Into<String>,
        definition: NetworkDefinition,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let mut seen: IndexSet<&str> = IndexSet::with_capacity(definition.nodes.len());
        for node in &definition.nodes {
            if seen.contains(node.name.as_str()) {
                return Err(PipelineError::Model {
                    model: name.clone(),
                    details: format!("duplicate node '{}'", node.name),
                });
            }
            if let Some(parent) = node
                .parent_names
                .iter()
                .find(|parent| !seen.contains(parent.as_str()))
            {
                return Err(PipelineError::Model {
                    model: name.clone(),
                    details: format!(
                        "node '{}' lists parent '{}' that does not precede it",
                        node.name, parent
                    ),
                });
            }
            seen.insert(&node.name);
        }
        Ok(Self { name, definition })
    }

    /// Current definition, trained or not.
    pub fn definition(&self) -> &NetworkDefinition {
        &self.definition
    }

    /// Node for `name`, if declared.
    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.definition.nodes.iter().find(|node| node.name == name)
    }

    fn model_error(&self, details: impl Into<String>) -> PipelineError {
        PipelineError::Model {
            model: self.name.clone(),
            details: details.into(),
        }
    }
}

impl ProbabilisticModel for BayesianNetwork {
    fn load(path: &Path) -> Result<Self, PipelineError> {
        let body = fs::read_to_string(path)?;
        let definition: NetworkDefinition =
            serde_json::from_str(&body).map_err(|source| PipelineError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_definition(path.display().to_string(), definition)
    }

    fn declared_attributes(&self) -> Vec<AttributeName> {
        self.definition
            .nodes
            .iter()
            .map(|node| node.name.clone())
            .collect()
    }

    fn train(&mut self, rows: &[WireRecord]) -> Result<(), PipelineError> {
        if rows.is_empty() {
            return Err(self.model_error("no training rows"));
        }
        for (idx, row) in rows.iter().enumerate() {
            if let Some(node) = self
                .definition
                .nodes
                .iter()
                .find(|node| !row.contains_key(&node.name))
            {
                return Err(self.model_error(format!(
                    "training row {idx} is missing attribute '{}'",
                    node.name
                )));
            }
        }

        let all_rows: Vec<&WireRecord> = rows.iter().collect();
        for node in &mut self.definition.nodes {
            node.possible_values = distinct_values(&all_rows, &node.name);
            node.conditional_probabilities =
                probability_tree(&all_rows, &node.name, &node.parent_names);
        }
        info!(
            "[networks:train] fitted {} nodes of '{}' from {} rows",
            self.definition.nodes.len(),
            self.name,
            rows.len()
        );
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let body = serde_json::to_string(&self.definition)
            .map_err(|err| self.model_error(format!("failed serializing definition: {err}")))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)?;
        Ok(())
    }
}

fn distinct_values(rows: &[&WireRecord], attribute: &str) -> Vec<String> {
    let values: IndexSet<&str> = rows
        .iter()
        .filter_map(|row| row.get(attribute))
        .map(String::as_str)
        .collect();
    values.into_iter().map(str::to_string).collect()
}

/// Nested `{"deeper": {parentValue: ...}}` tables ending in `{value: probability}` leaves.
fn probability_tree(rows: &[&WireRecord], attribute: &str, parents: &[AttributeName]) -> Value {
    let Some((parent, rest)) = parents.split_first() else {
        let mut counts: IndexMap<&str, u64> = IndexMap::new();
        for row in rows {
            if let Some(value) = row.get(attribute) {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }
        }
        let total: u64 = counts.values().sum();
        let leaf: Map<String, Value> = counts
            .into_iter()
            .map(|(value, count)| (value.to_string(), json!(count as f64 / total as f64)))
            .collect();
        return Value::Object(leaf);
    };

    let mut groups: IndexMap<&str, Vec<&WireRecord>> = IndexMap::new();
    for row in rows {
        if let Some(parent_value) = row.get(parent) {
            groups.entry(parent_value.as_str()).or_default().push(*row);
        }
    }
    let deeper: Map<String, Value> = groups
        .into_iter()
        .map(|(parent_value, group)| {
            (
                parent_value.to_string(),
                probability_tree(&group, attribute, rest),
            )
        })
        .collect();
    json!({ "deeper": deeper })
}
