//! Record filtering and path projection.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::capture::{HTTP_1_1, USER_AGENT_HEADER};
use crate::constants::filter::MIN_DESKTOP_WIDTH;
use crate::constants::nodes::HTTP_VERSION_NODE;
use crate::data::{BuildPath, DeconstructedRecord, RawCaptureRecord};
use crate::derive::is_mobile_user_agent;
use crate::robots::RobotMatcher;
use crate::types::UserAgent;

/// Why a capture record was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectReason {
    /// Header user-agent differs from the fingerprint user-agent.
    UserAgentMismatch,
    /// Screen geometry does not fit a landscape desktop or portrait mobile.
    ImplausibleDevice,
    /// User-agent is a known robot.
    Robot,
    /// HTTP/1.1 capture whose raw headers already carry `user-agent`.
    DuplicateUserAgentHeader,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UserAgentMismatch => "user_agent_mismatch",
            Self::ImplausibleDevice => "implausible_device",
            Self::Robot => "robot",
            Self::DuplicateUserAgentHeader => "duplicate_user_agent_header",
        };
        f.write_str(label)
    }
}

/// Diagnostic entry for a dropped record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Header user-agent, when present.
    pub user_agent: Option<UserAgent>,
    /// First predicate that failed.
    pub reason: RejectReason,
}

/// Result of filtering one dataset.
#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    /// Surviving records in input order.
    pub accepted: Vec<DeconstructedRecord>,
    /// Dropped records in input order.
    pub rejected: Vec<Rejection>,
}

impl FilterOutcome {
    /// Rejection counts per reason.
    pub fn rejection_counts(&self) -> BTreeMap<RejectReason, usize> {
        let mut counts = BTreeMap::new();
        for rejection in &self.rejected {
            *counts.entry(rejection.reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Applies consistency, plausibility, and robot predicates, then projects.
pub struct RecordFilter<'a> {
    robots: &'a RobotMatcher,
    path: BuildPath,
}

impl<'a> RecordFilter<'a> {
    /// Filter for one build path.
    pub fn new(robots: &'a RobotMatcher, path: BuildPath) -> Self {
        Self { robots, path }
    }

    /// Filter every record; rejected records are kept only as diagnostics.
    pub fn apply(&self, records: &[RawCaptureRecord]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for record in records {
            match self.check(record) {
                Ok(accepted) => outcome.accepted.push(accepted),
                Err(reason) => {
                    let user_agent = record.fingerprint_user_agent().map(str::to_string);
                    debug!(
                        "[networks:filter] dropped record ({reason}): {}",
                        user_agent.as_deref().unwrap_or("<none>")
                    );
                    outcome.rejected.push(Rejection { user_agent, reason });
                }
            }
        }
        let breakdown = outcome
            .rejection_counts()
            .iter()
            .map(|(reason, count)| format!("{reason}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "[networks:filter] kept {} of {} records ({:?} path); rejected: [{}]",
            outcome.accepted.len(),
            records.len(),
            self.path,
            breakdown
        );
        outcome
    }

    /// Run the predicates in order and project the surviving record.
    pub fn check(&self, record: &RawCaptureRecord) -> Result<DeconstructedRecord, RejectReason> {
        let user_agent = consistent_user_agent(record).ok_or(RejectReason::UserAgentMismatch)?;
        if !is_plausible_device(record, user_agent) {
            return Err(RejectReason::ImplausibleDevice);
        }
        if self.robots.is_robot(user_agent) {
            return Err(RejectReason::Robot);
        }
        let attributes = match self.path {
            BuildPath::Header => project_headers(record)?,
            BuildPath::Fingerprint => record
                .browser_fingerprint
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        };
        Ok(DeconstructedRecord {
            user_agent: user_agent.to_string(),
            attributes,
        })
    }
}

/// The shared user-agent when both capture views agree exactly.
fn consistent_user_agent(record: &RawCaptureRecord) -> Option<&str> {
    let header = record.header_user_agent()?;
    let fingerprint = record.fingerprint_user_agent()?;
    (header == fingerprint).then_some(fingerprint)
}

/// Landscape desktop (`width >= 1280`, wider than tall) or portrait mobile.
pub fn is_plausible_device(record: &RawCaptureRecord, user_agent: &str) -> bool {
    let Some(screen) = record.screen_size() else {
        return false;
    };
    let desktop_landscape = screen.width >= MIN_DESKTOP_WIDTH && screen.width > screen.height;
    let mobile_portrait = screen.width < screen.height && is_mobile_user_agent(user_agent);
    desktop_landscape || mobile_portrait
}

fn project_headers(
    record: &RawCaptureRecord,
) -> Result<IndexMap<String, Value>, RejectReason> {
    let request = &record.request_fingerprint;
    if request.http_version == HTTP_1_1 && request.headers.contains_key(USER_AGENT_HEADER) {
        return Err(RejectReason::DuplicateUserAgentHeader);
    }
    let mut attributes: IndexMap<String, Value> = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();
    attributes.insert(
        HTTP_VERSION_NODE.to_string(),
        Value::String(format!("_{}_", request.http_version)),
    );
    Ok(attributes)
}
