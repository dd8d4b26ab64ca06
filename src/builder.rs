//! Dataset assembly and trainer hand-off for the three networks.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::info;

use crate::constants::nodes::BROWSER_HTTP_NODE;
use crate::data::{BuildPath, PreparedRecord};
use crate::derive::{DerivedAttributes, SyntheticAttribute};
use crate::encode::Cell;
use crate::errors::PipelineError;
use crate::network::ProbabilisticModel;
use crate::types::{AttributeName, BrowserHttpKey, WireRecord};

/// The three generator networks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Browser/OS/device/HTTP-version network that seeds generation.
    Input,
    /// Request-header network.
    Header,
    /// Browser fingerprint network.
    Fingerprint,
}

impl DatasetKind {
    /// Every network, in build order.
    pub const ALL: [DatasetKind; 3] = [Self::Input, Self::Header, Self::Fingerprint];

    /// Lower-case label used in logs and the CLI.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Header => "header",
            Self::Fingerprint => "fingerprint",
        }
    }

    /// Which record projection feeds this network.
    pub const fn build_path(&self) -> BuildPath {
        match self {
            Self::Input | Self::Header => BuildPath::Header,
            Self::Fingerprint => BuildPath::Fingerprint,
        }
    }

    /// Whether synthetic user-agent columns are merged after projection.
    pub const fn attaches_synthetic(&self) -> bool {
        matches!(self, Self::Input | Self::Header)
    }

    /// Whether the build also writes the browser/http helper artifact.
    pub const fn writes_browser_helper(&self) -> bool {
        matches!(self, Self::Header)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows projected onto one model's attribute set, in input order.
#[derive(Clone, Debug, Default)]
pub struct TrainingDataset {
    rows: Vec<IndexMap<AttributeName, Cell>>,
}

impl TrainingDataset {
    /// Projected rows.
    pub fn rows(&self) -> &[IndexMap<AttributeName, Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows were projected.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flat string rows for the trainer.
    pub fn wire_rows(&self) -> Vec<WireRecord> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(name, cell)| (name.clone(), cell.to_wire()))
                    .collect()
            })
            .collect()
    }

    /// Deduplicated `*BROWSER_HTTP` values in first-seen order.
    pub fn browser_http_values(&self) -> Vec<BrowserHttpKey> {
        let values: IndexSet<BrowserHttpKey> = self
            .rows
            .iter()
            .filter_map(|row| row.get(BROWSER_HTTP_NODE))
            .map(Cell::to_wire)
            .collect();
        values.into_iter().collect()
    }
}

/// Project `cells` onto `desired`; absent attributes become `Cell::Missing`.
pub fn project(
    cells: &IndexMap<AttributeName, Cell>,
    desired: &[AttributeName],
) -> IndexMap<AttributeName, Cell> {
    desired
        .iter()
        .map(|name| {
            let cell = cells.get(name).cloned().unwrap_or(Cell::Missing);
            (name.clone(), cell)
        })
        .collect()
}

/// Post-projection merge: attach every synthetic column unconditionally.
pub fn merge_synthetic(cells: &mut IndexMap<AttributeName, Cell>, derived: &DerivedAttributes) {
    for attribute in SyntheticAttribute::ALL {
        cells.insert(attribute.node_name().to_string(), attribute.produce(derived));
    }
}

/// Where a build writes its artifacts.
#[derive(Clone, Debug)]
pub struct BuildOutputs {
    /// Trained model definition.
    pub model_path: PathBuf,
    /// Deduplicated `*BROWSER_HTTP` list (header network only).
    pub browser_helper_path: Option<PathBuf>,
}

/// Files written by a successful build.
#[derive(Clone, Debug)]
pub struct BuildArtifacts {
    /// Rows the model was trained on.
    pub rows: usize,
    /// Saved model definition.
    pub model_path: PathBuf,
    /// Browser helper file, when one was written.
    pub browser_helper_path: Option<PathBuf>,
}

/// Projects prepared records onto a model and drives training and persistence.
pub struct DatasetBuilder<M> {
    kind: DatasetKind,
    model: M,
}

impl<M: ProbabilisticModel> DatasetBuilder<M> {
    /// Open the model-structure artifact for `kind`.
    pub fn open(kind: DatasetKind, structure_path: &Path) -> Result<Self, PipelineError> {
        Ok(Self::from_model(kind, M::load(structure_path)?))
    }

    /// Wrap an already-loaded model.
    pub fn from_model(kind: DatasetKind, model: M) -> Self {
        Self { kind, model }
    }

    /// Network this builder trains.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Declared attributes minus synthetic ones on the header/input path.
    pub fn desired_attributes(&self) -> Vec<AttributeName> {
        let declared = self.model.declared_attributes();
        if !self.kind.attaches_synthetic() {
            return declared;
        }
        declared
            .into_iter()
            .filter(|name| !SyntheticAttribute::is_synthetic(name))
            .collect()
    }

    /// Project every record and merge synthetic columns where applicable.
    pub fn assemble(&self, records: &[PreparedRecord]) -> Result<TrainingDataset, PipelineError> {
        let desired = self.desired_attributes();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut cells = project(&record.cells, &desired);
            if self.kind.attaches_synthetic() {
                let derived = record.derived.as_ref().ok_or_else(|| PipelineError::Model {
                    model: self.kind.to_string(),
                    details: "record is missing derived user-agent attributes".into(),
                })?;
                merge_synthetic(&mut cells, derived);
            }
            rows.push(cells);
        }
        Ok(TrainingDataset { rows })
    }

    /// Assemble, train, then persist. Nothing is written unless training succeeds.
    pub fn build(
        mut self,
        records: &[PreparedRecord],
        outputs: &BuildOutputs,
    ) -> Result<BuildArtifacts, PipelineError> {
        let helper_path = match (&outputs.browser_helper_path, self.kind.writes_browser_helper()) {
            (Some(path), true) => Some(path.clone()),
            (None, true) => {
                return Err(PipelineError::Configuration(format!(
                    "{} build requires a browser helper output path",
                    self.kind
                )));
            }
            (_, false) => None,
        };

        let dataset = self.assemble(records)?;
        info!(
            "[networks:build] training {} network on {} rows",
            self.kind,
            dataset.len()
        );
        self.model.train(&dataset.wire_rows())?;
        self.model.save(&outputs.model_path)?;
        info!(
            "[networks:build] wrote {} network definition to {}",
            self.kind,
            outputs.model_path.display()
        );

        if let Some(path) = &helper_path {
            write_browser_helper(path, &dataset.browser_http_values())?;
        }

        Ok(BuildArtifacts {
            rows: dataset.len(),
            model_path: outputs.model_path.clone(),
            browser_helper_path: helper_path,
        })
    }
}

fn write_browser_helper(path: &Path, values: &[BrowserHttpKey]) -> Result<(), PipelineError> {
    let body = serde_json::to_string(values).map_err(|err| {
        PipelineError::Io(std::io::Error::other(format!(
            "failed serializing browser helper: {err}"
        )))
    })?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    info!(
        "[networks:build] wrote {} browser/http keys to {}",
        values.len(),
        path.display()
    );
    Ok(())
}
