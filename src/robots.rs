//! Robot user-agent oracle.
//!
//! Patterns are retrieved once per build through a [`RobotPatternSource`] and
//! compiled into a case-insensitive [`RobotMatcher`]. Any retrieval, payload, or
//! compile failure aborts the build before records are examined.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::{Regex, RegexSet, RegexSetBuilder};
use serde::Deserialize;
use tracing::info;

use crate::errors::PipelineError;
use crate::types::RobotPatternText;

/// Generic crawler tokens matched regardless of the supplied list.
const BOT_TOKEN_PATTERN: &str = r"(?i)\b(bot|bots|slurp|spider|crawler|crawl)\b";

/// One entry of a robot-pattern list; extra fields in the payload are ignored.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RobotPattern {
    /// Regex source, matched case-insensitively.
    pub pattern: RobotPatternText,
}

impl RobotPattern {
    /// Wrap a regex source.
    pub fn new(pattern: impl Into<RobotPatternText>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

/// Where robot patterns come from.
pub trait RobotPatternSource {
    /// Human-readable origin used in logs and errors.
    fn describe(&self) -> String;
    /// Retrieve the full pattern list. Single attempt, no retries.
    fn fetch_patterns(&self) -> Result<Vec<RobotPattern>, PipelineError>;
}

/// Patterns fetched over HTTP from a JSON endpoint.
pub struct RemoteRobotPatterns {
    url: String,
}

impl RemoteRobotPatterns {
    /// Source for the JSON list at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RobotPatternSource for RemoteRobotPatterns {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch_patterns(&self) -> Result<Vec<RobotPattern>, PipelineError> {
        info!("[networks:robots] fetching robot patterns from {}", self.url);
        let response = ureq::get(&self.url)
            .call()
            .map_err(|err| PipelineError::RobotPatterns {
                reason: format!("request to {} failed: {err}", self.url),
            })?;
        let body = response.into_body().read_to_string().map_err(|err| {
            PipelineError::RobotPatterns {
                reason: format!("failed reading response from {}: {err}", self.url),
            }
        })?;
        parse_robot_patterns(&body)
    }
}

/// Patterns read from a local JSON file.
pub struct FileRobotPatterns {
    path: PathBuf,
}

impl FileRobotPatterns {
    /// Source for the JSON list at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RobotPatternSource for FileRobotPatterns {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_patterns(&self) -> Result<Vec<RobotPattern>, PipelineError> {
        let body = fs::read_to_string(&self.path).map_err(|err| PipelineError::RobotPatterns {
            reason: format!("failed reading {}: {err}", self.path.display()),
        })?;
        parse_robot_patterns(&body)
    }
}

/// Patterns supplied directly by the caller.
#[derive(Clone, Debug, Default)]
pub struct InlineRobotPatterns {
    patterns: Vec<RobotPattern>,
}

impl InlineRobotPatterns {
    /// Source over the given regex sources.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RobotPatternText>,
    {
        Self {
            patterns: patterns.into_iter().map(RobotPattern::new).collect(),
        }
    }
}

impl RobotPatternSource for InlineRobotPatterns {
    fn describe(&self) -> String {
        format!("{} inline patterns", self.patterns.len())
    }

    fn fetch_patterns(&self) -> Result<Vec<RobotPattern>, PipelineError> {
        Ok(self.patterns.clone())
    }
}

/// Parse a JSON array of `{ "pattern": ... }` objects.
pub fn parse_robot_patterns(body: &str) -> Result<Vec<RobotPattern>, PipelineError> {
    serde_json::from_str(body).map_err(|err| PipelineError::RobotPatterns {
        reason: format!("invalid robot pattern payload: {err}"),
    })
}

fn bot_token_regex() -> &'static Regex {
    static BOT_TOKEN: OnceLock<Regex> = OnceLock::new();
    BOT_TOKEN.get_or_init(|| Regex::new(BOT_TOKEN_PATTERN).expect("valid bot token regex"))
}

/// Compiled robot oracle.
pub struct RobotMatcher {
    patterns: RegexSet,
}

impl RobotMatcher {
    /// Compile every pattern case-insensitively.
    pub fn compile(patterns: &[RobotPattern]) -> Result<Self, PipelineError> {
        let set = RegexSetBuilder::new(patterns.iter().map(|entry| entry.pattern.as_str()))
            .case_insensitive(true)
            .build()
            .map_err(|err| PipelineError::RobotPatterns {
                reason: format!("failed compiling robot patterns: {err}"),
            })?;
        Ok(Self { patterns: set })
    }

    /// Retrieve and compile patterns from `source`.
    pub fn from_source(source: &dyn RobotPatternSource) -> Result<Self, PipelineError> {
        let patterns = source.fetch_patterns()?;
        let matcher = Self::compile(&patterns)?;
        info!(
            "[networks:robots] compiled {} robot patterns from {}",
            matcher.len(),
            source.describe()
        );
        Ok(matcher)
    }

    /// Number of supplied patterns (the built-in token rule is not counted).
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns were supplied.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if the user-agent carries a crawler token or matches a supplied pattern.
    pub fn is_robot(&self, user_agent: &str) -> bool {
        bot_token_regex().is_match(user_agent) || self.patterns.is_match(user_agent)
    }
}
