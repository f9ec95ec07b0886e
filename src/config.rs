//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Briefing pipeline configuration.
#[derive(Debug, Clone)]
pub struct BriefConfig {
    /// Maximum number of projects rendered in the deep dive.
    pub max_projects: usize,
    /// Whether cluster narratives go through the LLM at all.
    pub use_narrative_synthesis: bool,
    /// Maximum number of synthesis calls in flight at once.
    pub synthesis_concurrency: usize,
    /// Per-call timeout for a synthesis request.
    pub synthesis_timeout: Duration,
    /// How many top-ranked projects feed the executive narrative.
    pub executive_top_n: usize,
    /// Urgency score at or above which a project counts as high urgency.
    pub urgency_threshold: f64,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            max_projects: 10,
            use_narrative_synthesis: true,
            synthesis_concurrency: 4,
            synthesis_timeout: Duration::from_secs(30),
            executive_top_n: 3,
            urgency_threshold: 5.0,
        }
    }
}

impl BriefConfig {
    /// Build config from `BRIEF_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_projects = env_parse("BRIEF_MAX_PROJECTS")?.unwrap_or(defaults.max_projects);
        let use_narrative_synthesis = match std::env::var("BRIEF_USE_NARRATIVE") {
            Ok(raw) => parse_bool("BRIEF_USE_NARRATIVE", &raw)?,
            Err(_) => defaults.use_narrative_synthesis,
        };
        let synthesis_concurrency: usize =
            env_parse("BRIEF_SYNTHESIS_CONCURRENCY")?.unwrap_or(defaults.synthesis_concurrency);
        if synthesis_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BRIEF_SYNTHESIS_CONCURRENCY".into(),
                message: "must be at least 1".into(),
            });
        }
        let synthesis_timeout = env_parse::<u64>("BRIEF_SYNTHESIS_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.synthesis_timeout);
        let executive_top_n =
            env_parse("BRIEF_EXECUTIVE_TOP_N")?.unwrap_or(defaults.executive_top_n);
        let urgency_threshold =
            env_parse("BRIEF_URGENCY_THRESHOLD")?.unwrap_or(defaults.urgency_threshold);

        Ok(Self {
            max_projects,
            use_narrative_synthesis,
            synthesis_concurrency,
            synthesis_timeout,
            executive_top_n,
            urgency_threshold,
        })
    }
}

/// Options that only apply to the command-line binary.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    /// Overall deadline for LLM synthesis; unset means no deadline.
    pub request_timeout: Option<Duration>,
    /// Print the brief as JSON instead of markdown.
    pub output_json: bool,
}

impl CliOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        let request_timeout =
            env_parse::<u64>("BRIEF_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let output_json = match std::env::var("BRIEF_OUTPUT_JSON") {
            Ok(raw) => parse_bool("BRIEF_OUTPUT_JSON", &raw)?,
            Err(_) => false,
        };
        Ok(Self {
            request_timeout,
            output_json,
        })
    }
}

/// Read and parse an optional environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
