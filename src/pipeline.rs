//! End-to-end build for one network: load, filter, prepare, reconcile, train.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::builder::{BuildOutputs, DatasetBuilder, DatasetKind};
use crate::config::BuildConfig;
use crate::constants::nodes::HTTP_VERSION_NODE;
use crate::data::{BuildPath, DeconstructedRecord, PreparedRecord, RawCaptureRecord};
use crate::derive::DerivedAttributes;
use crate::encode::{Cell, encode_fingerprint_attributes};
use crate::errors::PipelineError;
use crate::filter::RecordFilter;
use crate::network::{BayesianNetwork, ProbabilisticModel};
use crate::robots::{RobotMatcher, RobotPatternSource};
use crate::schema::reconcile_records;

/// Outcome of one network build.
#[derive(Clone, Debug)]
pub struct BuildSummary {
    /// Network that was built.
    pub kind: DatasetKind,
    /// Records in the input dataset.
    pub captured: usize,
    /// Records that survived filtering and were trained on.
    pub retained: usize,
    /// Records dropped by the filter.
    pub rejected: usize,
    /// Size of the reconciled attribute union.
    pub schema_attributes: usize,
    /// Saved model definition.
    pub model_path: PathBuf,
    /// Browser helper file (header network only).
    pub browser_helper_path: Option<PathBuf>,
}

/// Read the whole capture dataset (a JSON array) into memory.
pub fn load_capture_records(path: &Path) -> Result<Vec<RawCaptureRecord>, PipelineError> {
    let body = fs::read_to_string(path)?;
    let records: Vec<RawCaptureRecord> =
        serde_json::from_str(&body).map_err(|source| PipelineError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "[networks:build] loaded {} capture records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Encode filtered records; header-path records also get derived attributes.
pub fn prepare_records(path: BuildPath, records: Vec<DeconstructedRecord>) -> Vec<PreparedRecord> {
    records
        .into_iter()
        .map(|record| match path {
            BuildPath::Header => {
                let http_version = record
                    .attributes
                    .get(HTTP_VERSION_NODE)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default();
                let derived = DerivedAttributes::from_user_agent(&record.user_agent, http_version);
                let cells = record
                    .attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), Cell::from_value(value)))
                    .collect();
                PreparedRecord {
                    cells,
                    derived: Some(derived),
                }
            }
            BuildPath::Fingerprint => PreparedRecord {
                cells: encode_fingerprint_attributes(&record.attributes),
                derived: None,
            },
        })
        .collect()
}

/// Build one network from in-memory capture records.
///
/// Robot patterns are retrieved first; a retrieval failure aborts before any
/// record is examined.
pub fn build_network<M: ProbabilisticModel>(
    kind: DatasetKind,
    records: &[RawCaptureRecord],
    robot_source: &dyn RobotPatternSource,
    structure_path: &Path,
    outputs: &BuildOutputs,
) -> Result<BuildSummary, PipelineError> {
    let robots = RobotMatcher::from_source(robot_source)?;
    let builder = DatasetBuilder::<M>::open(kind, structure_path)?;

    let outcome = RecordFilter::new(&robots, kind.build_path()).apply(records);
    let rejected = outcome.rejected.len();
    let mut prepared = prepare_records(kind.build_path(), outcome.accepted);
    let schema = reconcile_records(&mut prepared);
    info!(
        "[networks:build] {kind} schema has {} attributes across {} records",
        schema.len(),
        prepared.len()
    );

    let artifacts = builder.build(&prepared, outputs)?;
    let summary = BuildSummary {
        kind,
        captured: records.len(),
        retained: artifacts.rows,
        rejected,
        schema_attributes: schema.len(),
        model_path: artifacts.model_path,
        browser_helper_path: artifacts.browser_helper_path,
    };
    info!(
        "[networks:build] {kind} build finished: {} of {} records retained",
        summary.retained, summary.captured
    );
    Ok(summary)
}

/// Run the configured builds sequentially with the bundled Bayesian network trainer.
///
/// The dataset is loaded once; robot patterns are re-fetched for every build.
pub fn run_builds(
    config: &BuildConfig,
    kinds: &[DatasetKind],
) -> Result<Vec<BuildSummary>, PipelineError> {
    config.validate()?;
    let records = load_capture_records(&config.dataset_path)?;
    let mut summaries = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let robot_source = config.robot_source.source();
        let summary = build_network::<BayesianNetwork>(
            *kind,
            &records,
            robot_source.as_ref(),
            &config.network_paths(*kind).structure,
            &config.outputs(*kind),
        )?;
        summaries.push(summary);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::{Value, json};

    #[test]
    fn header_records_derive_from_injected_http_version() {
        let mut attributes: IndexMap<String, Value> = IndexMap::new();
        attributes.insert("accept".into(), json!("*/*"));
        attributes.insert("dnt".into(), json!(""));
        attributes.insert(HTTP_VERSION_NODE.into(), json!("_1.1_"));
        let records = vec![DeconstructedRecord {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0"
                .into(),
            attributes,
        }];
        let prepared = prepare_records(BuildPath::Header, records);
        let derived = prepared[0].derived.as_ref().unwrap();
        assert_eq!(derived.browser_http, "firefox/115.0|1");
        assert_eq!(prepared[0].cells["dnt"], Cell::Missing);
        assert_eq!(prepared[0].cells["accept"], Cell::Plain("*/*".into()));
    }

    #[test]
    fn fingerprint_records_are_encoded_without_derivation() {
        let mut attributes: IndexMap<String, Value> = IndexMap::new();
        attributes.insert("hardwareConcurrency".into(), json!(8));
        let records = vec![DeconstructedRecord {
            user_agent: "ua".into(),
            attributes,
        }];
        let prepared = prepare_records(BuildPath::Fingerprint, records);
        assert!(prepared[0].derived.is_none());
        assert_eq!(
            prepared[0].cells["hardwareConcurrency"].to_wire(),
            "*STRINGIFIED*8"
        );
        assert_eq!(prepared[0].cells["pluginsData"], Cell::Missing);
    }

    #[test]
    fn malformed_dataset_is_a_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("dataset.json");
        fs::write(&path, "[{\"requestFingerprint\": 5}]").unwrap();
        assert!(matches!(
            load_capture_records(&path),
            Err(PipelineError::Parse { .. })
        ));
        assert!(matches!(
            load_capture_records(&temp.path().join("absent.json")),
            Err(PipelineError::Io(_))
        ));
    }
}
