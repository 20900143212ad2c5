//! Configuration model
//!
//! ```json
//! {
//!   "limit": 32,
//!   "entries": [
//!     { "input": "<file_or_directory_path>", "output": "<directory_path>" }
//!   ]
//! }
//! ```
//!
//! Timing fields accept either milliseconds (`1500`) or a duration string
//! (`"1m30s"`, `"250ms"`). Entry fields override top-level ones.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_LIMIT: i64 = 128;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Shared defaults for every entry
    #[serde(flatten)]
    pub common: CommonConfig,

    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

/// One backup rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// File or directory to watch and copy
    pub input: PathBuf,

    /// Directory receiving the indexed copies
    pub output: PathBuf,

    #[serde(flatten)]
    pub overrides: CommonConfig,
}

/// Settings that can appear both at the top level and per entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<ConfigDuration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<ConfigDuration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ConfigDuration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Fully resolved settings for a single entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySettings {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Quiet period before acting on a burst
    pub debounce: Duration,
    /// Cap on the total wait since the first event of a burst (zero disables)
    pub deadline: Duration,
    /// Minimum spacing between triggered backups (zero disables)
    pub throttle: Duration,
    /// Retained copies (`<= 0` disables pruning)
    pub limit: i64,
}

impl EntrySettings {
    /// Settings with built-in defaults for the given paths
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            debounce: DEFAULT_DEBOUNCE,
            deadline: DEFAULT_DEADLINE,
            throttle: DEFAULT_THROTTLE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.input.as_os_str().is_empty() {
                return Err(ConfigError::InvalidEntry {
                    index,
                    reason: "missing input path".to_string(),
                });
            }
            if entry.output.as_os_str().is_empty() {
                return Err(ConfigError::InvalidEntry {
                    index,
                    reason: "missing output path".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Entry overrides win over top-level values, which win over defaults
    pub fn resolve(&self, entry: &EntryConfig) -> EntrySettings {
        let pick = |own: Option<ConfigDuration>, shared: Option<ConfigDuration>, default| {
            own.or(shared).map_or(default, Duration::from)
        };
        let own = &entry.overrides;
        let shared = &self.common;

        EntrySettings {
            input: entry.input.clone(),
            output: entry.output.clone(),
            debounce: pick(own.debounce, shared.debounce, DEFAULT_DEBOUNCE),
            deadline: pick(own.deadline, shared.deadline, DEFAULT_DEADLINE),
            throttle: pick(own.throttle, shared.throttle, DEFAULT_THROTTLE),
            limit: own.limit.or(shared.limit).unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Resolved settings for every entry, in file order
    pub fn resolve_all(&self) -> Vec<EntrySettings> {
        self.entries.iter().map(|entry| self.resolve(entry)).collect()
    }
}

/// A duration read from JSON as milliseconds or as a duration string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDuration", into = "RawDuration")]
pub struct ConfigDuration(pub Duration);

impl From<ConfigDuration> for Duration {
    fn from(value: ConfigDuration) -> Self {
        value.0
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(u64),
    Text(String),
}

impl TryFrom<RawDuration> for ConfigDuration {
    type Error = ConfigError;

    fn try_from(raw: RawDuration) -> Result<Self, Self::Error> {
        match raw {
            RawDuration::Millis(ms) => Ok(Self(Duration::from_millis(ms))),
            RawDuration::Text(text) => parse_duration(&text).map(Self),
        }
    }
}

impl From<ConfigDuration> for RawDuration {
    fn from(value: ConfigDuration) -> Self {
        RawDuration::Millis(u64::try_from(value.0.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Parse `"<n><unit>..."` with units `ms`, `s`, `m`, `h`, `d`. `"0"` is zero.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(raw.to_string());
    let text = raw.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = text;
    while !rest.is_empty() {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
        let unit = match &rest[..unit_len] {
            "ms" => Duration::from_millis(1),
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(60 * 60),
            "d" => Duration::from_secs(24 * 60 * 60),
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let part = u32::try_from(value)
            .ok()
            .and_then(|v| unit.checked_mul(v))
            .ok_or_else(invalid)?;
        total = total.checked_add(part).ok_or_else(invalid)?;
    }

    Ok(total)
}
