#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the binaries.
pub mod apps;
/// Dataset projection, synthetic-column merge, and trainer hand-off.
pub mod builder;
/// Build configuration types.
pub mod config;
/// Centralized constants: reserved tokens, node names, default paths.
pub mod constants;
/// Capture record and intermediate record types.
pub mod data;
/// Browser, OS, and device classification from user-agents.
pub mod derive;
/// Cell representation and fingerprint value encoding.
pub mod encode;
/// Consistency, plausibility, and robot predicates.
pub mod filter;
/// Trainer contract and the bundled Bayesian network.
pub mod network;
/// End-to-end build orchestration.
pub mod pipeline;
/// Robot user-agent pattern sources and matcher.
pub mod robots;
/// Attribute-schema union and gap filling.
pub mod schema;
/// Shared type aliases.
pub mod types;

mod errors;

pub use builder::{BuildOutputs, DatasetBuilder, DatasetKind, TrainingDataset};
pub use config::{BuildConfig, NetworkPaths, RobotSourceConfig};
pub use data::{BuildPath, DeconstructedRecord, PreparedRecord, RawCaptureRecord};
pub use derive::{DerivedAttributes, Device, OperatingSystem, SyntheticAttribute};
pub use encode::{Cell, ValueTag};
pub use errors::PipelineError;
pub use filter::{FilterOutcome, RecordFilter, RejectReason};
pub use network::{BayesianNetwork, ProbabilisticModel};
pub use pipeline::{BuildSummary, build_network, run_builds};
pub use robots::{RobotMatcher, RobotPattern, RobotPatternSource};
pub use schema::AttributeSchema;
pub use types::{AttributeName, UserAgent, WireRecord};
