use std::path::{Path, PathBuf};

use crate::builder::{BuildOutputs, DatasetKind};
use crate::constants::files::{
    BROWSER_HELPER_FILENAME, DEFAULT_DATASET_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_STRUCTURES_DIR,
    FINGERPRINT_NETWORK_FILENAME, HEADER_NETWORK_FILENAME, INPUT_NETWORK_FILENAME,
};
use crate::constants::robots::DEFAULT_ROBOT_PATTERNS_URL;
use crate::errors::PipelineError;
use crate::robots::{FileRobotPatterns, InlineRobotPatterns, RemoteRobotPatterns, RobotPatternSource};
use crate::types::RobotPatternText;

/// Where robot patterns are retrieved from on each build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RobotSourceConfig {
    /// JSON list fetched over HTTP.
    Remote {
        /// Endpoint returning the JSON pattern list.
        url: String,
    },
    /// JSON list read from disk.
    File(PathBuf),
    /// Patterns supplied in-process.
    Inline(Vec<RobotPatternText>),
}

impl Default for RobotSourceConfig {
    fn default() -> Self {
        Self::Remote {
            url: DEFAULT_ROBOT_PATTERNS_URL.to_string(),
        }
    }
}

impl RobotSourceConfig {
    /// Instantiate the configured source.
    pub fn source(&self) -> Box<dyn RobotPatternSource> {
        match self {
            Self::Remote { url } => Box::new(RemoteRobotPatterns::new(url.clone())),
            Self::File(path) => Box::new(FileRobotPatterns::new(path.clone())),
            Self::Inline(patterns) => Box::new(InlineRobotPatterns::new(patterns.iter().cloned())),
        }
    }
}

/// Structure input and definition output for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkPaths {
    /// Pre-existing model-structure artifact.
    pub structure: PathBuf,
    /// Trained definition written after a successful build.
    pub output: PathBuf,
}

impl NetworkPaths {
    fn in_dirs(structures_dir: &Path, output_dir: &Path, filename: &str) -> Self {
        Self {
            structure: structures_dir.join(filename),
            output: output_dir.join(filename),
        }
    }
}

/// Top-level build configuration.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// JSON array of capture records.
    pub dataset_path: PathBuf,
    /// Robot-pattern origin, re-read on every build.
    pub robot_source: RobotSourceConfig,
    /// Input network paths.
    pub input: NetworkPaths,
    /// Header network paths.
    pub header: NetworkPaths,
    /// Fingerprint network paths.
    pub fingerprint: NetworkPaths,
    /// Destination of the deduplicated `*BROWSER_HTTP` list.
    pub browser_helper_path: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET_PATH, DEFAULT_STRUCTURES_DIR, DEFAULT_OUTPUT_DIR)
    }
}

impl BuildConfig {
    /// Use the canonical network filenames under `structures_dir` and `output_dir`.
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        structures_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        let structures_dir = structures_dir.as_ref();
        let output_dir = output_dir.as_ref();
        Self {
            dataset_path: dataset_path.into(),
            robot_source: RobotSourceConfig::default(),
            input: NetworkPaths::in_dirs(structures_dir, output_dir, INPUT_NETWORK_FILENAME),
            header: NetworkPaths::in_dirs(structures_dir, output_dir, HEADER_NETWORK_FILENAME),
            fingerprint: NetworkPaths::in_dirs(
                structures_dir,
                output_dir,
                FINGERPRINT_NETWORK_FILENAME,
            ),
            browser_helper_path: output_dir.join(BROWSER_HELPER_FILENAME),
        }
    }

    /// Override the robot-pattern source.
    pub fn with_robot_source(mut self, robot_source: RobotSourceConfig) -> Self {
        self.robot_source = robot_source;
        self
    }

    /// Override the browser helper destination.
    pub fn with_browser_helper_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_helper_path = path.into();
        self
    }

    /// Override the structure/output pair of one network.
    pub fn with_network_paths(mut self, kind: DatasetKind, paths: NetworkPaths) -> Self {
        match kind {
            DatasetKind::Input => self.input = paths,
            DatasetKind::Header => self.header = paths,
            DatasetKind::Fingerprint => self.fingerprint = paths,
        }
        self
    }

    /// Structure and output paths for `kind`.
    pub fn network_paths(&self, kind: DatasetKind) -> &NetworkPaths {
        match kind {
            DatasetKind::Input => &self.input,
            DatasetKind::Header => &self.header,
            DatasetKind::Fingerprint => &self.fingerprint,
        }
    }

    /// Output locations for `kind`.
    pub fn outputs(&self, kind: DatasetKind) -> BuildOutputs {
        BuildOutputs {
            model_path: self.network_paths(kind).output.clone(),
            browser_helper_path: kind
                .writes_browser_helper()
                .then(|| self.browser_helper_path.clone()),
        }
    }

    /// Reject empty paths and an empty robot-pattern url.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.dataset_path.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(
                "dataset path must not be empty".into(),
            ));
        }
        if self.browser_helper_path.as_os_str().is_empty() {
            return Err(PipelineError::Configuration(
                "browser helper path must not be empty".into(),
            ));
        }
        if let RobotSourceConfig::Remote { url } = &self.robot_source
            && url.trim().is_empty()
        {
            return Err(PipelineError::Configuration(
                "robot pattern url must not be empty".into(),
            ));
        }
        for kind in DatasetKind::ALL {
            let paths = self.network_paths(kind);
            if paths.structure.as_os_str().is_empty() || paths.output.as_os_str().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "{kind} network paths must not be empty"
                )));
            }
        }
        Ok(())
    }
}
