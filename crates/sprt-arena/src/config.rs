//! Match configuration loading and validation.
//!
//! Settings can come from a TOML file, from command-line flags, or both;
//! a flag overrides the same key from the file. [`MatchConfig::resolve`]
//! turns the merged values into validated [`MatchSettings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::engine_channel::EngineCommand;
use crate::sprt::{SprtError, SprtParameters};
use crate::time_control::{TimeControl, TimeControlError};

const DEFAULT_DEBUG_DIR: &str = "debug";
const DEFAULT_RESPONSE_GRACE_MS: u64 = 5000;

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A required setting was given neither in the file nor as a flag.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    /// A setting is out of range.
    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(transparent)]
    TimeControl(#[from] TimeControlError),
    #[error(transparent)]
    Sprt(#[from] SprtError),
}

/// Raw match settings as written in a config file.
///
/// Every field is optional so a file can be partial and completed by
/// command-line flags.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    pub engine1: Option<PathBuf>,
    pub engine2: Option<PathBuf>,
    /// Arguments passed to engine1 on startup.
    pub engine1_args: Option<Vec<String>>,
    pub engine2_args: Option<Vec<String>>,
    /// Number of workers (engine pairs) playing at once.
    pub concurrency: Option<usize>,
    /// Time control as `<base>+<increment>` in seconds, e.g. `"8+0.08"`.
    pub tc: Option<String>,
    /// Opening book, one position per line.
    pub openings: Option<PathBuf>,
    pub elo0: Option<f64>,
    pub elo1: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub cutechess_llr: Option<bool>,
    /// Print Elo and LLR every this many games.
    pub rating_interval: Option<u64>,
    /// Directory for per-worker transcripts. Defaults to `debug`.
    pub debug_dir: Option<PathBuf>,
    /// Extra wait past an engine's clock before it is declared dead.
    /// Defaults to 5000.
    pub response_grace_ms: Option<u64>,
    /// Stop all workers once the SPRT accepts either hypothesis.
    pub stop_on_verdict: Option<bool>,
}

/// Validated settings for one match.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub engines: [EngineCommand; 2],
    pub concurrency: usize,
    pub time_control: TimeControl,
    pub openings: PathBuf,
    pub sprt: SprtParameters,
    pub rating_interval: u64,
    pub debug_dir: PathBuf,
    pub response_grace: Duration,
    pub stop_on_verdict: bool,
}

impl MatchConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read,
    /// or [`ConfigError::ParseError`] if it contains invalid TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns `self` with every key set in `overrides` replaced.
    pub fn merge(self, overrides: MatchConfig) -> MatchConfig {
        MatchConfig {
            engine1: overrides.engine1.or(self.engine1),
            engine2: overrides.engine2.or(self.engine2),
            engine1_args: overrides.engine1_args.or(self.engine1_args),
            engine2_args: overrides.engine2_args.or(self.engine2_args),
            concurrency: overrides.concurrency.or(self.concurrency),
            tc: overrides.tc.or(self.tc),
            openings: overrides.openings.or(self.openings),
            elo0: overrides.elo0.or(self.elo0),
            elo1: overrides.elo1.or(self.elo1),
            alpha: overrides.alpha.or(self.alpha),
            beta: overrides.beta.or(self.beta),
            cutechess_llr: overrides.cutechess_llr.or(self.cutechess_llr),
            rating_interval: overrides.rating_interval.or(self.rating_interval),
            debug_dir: overrides.debug_dir.or(self.debug_dir),
            response_grace_ms: overrides.response_grace_ms.or(self.response_grace_ms),
            stop_on_verdict: overrides.stop_on_verdict.or(self.stop_on_verdict),
        }
    }

    /// Checks that every required key is present and in range.
    pub fn resolve(self) -> Result<MatchSettings, ConfigError> {
        let engine1 = EngineCommand::new(self.engine1.ok_or(ConfigError::Missing("engine1"))?)
            .args(self.engine1_args.unwrap_or_default());
        let engine2 = EngineCommand::new(self.engine2.ok_or(ConfigError::Missing("engine2"))?)
            .args(self.engine2_args.unwrap_or_default());
        let concurrency = self.concurrency.ok_or(ConfigError::Missing("concurrency"))?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        let time_control: TimeControl = self.tc.ok_or(ConfigError::Missing("tc"))?.parse()?;
        let openings = self.openings.ok_or(ConfigError::Missing("openings"))?;
        let rating_interval = self
            .rating_interval
            .ok_or(ConfigError::Missing("rating_interval"))?;
        if rating_interval == 0 {
            return Err(ConfigError::Invalid {
                key: "rating_interval",
                reason: "must be at least 1".to_string(),
            });
        }
        let sprt = SprtParameters::new(
            self.elo0.ok_or(ConfigError::Missing("elo0"))?,
            self.elo1.ok_or(ConfigError::Missing("elo1"))?,
            self.alpha.ok_or(ConfigError::Missing("alpha"))?,
            self.beta.ok_or(ConfigError::Missing("beta"))?,
            self.cutechess_llr.unwrap_or(false),
        )?;

        Ok(MatchSettings {
            engines: [engine1, engine2],
            concurrency,
            time_control,
            openings,
            sprt,
            rating_interval,
            debug_dir: self
                .debug_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_DIR)),
            response_grace: Duration::from_millis(
                self.response_grace_ms.unwrap_or(DEFAULT_RESPONSE_GRACE_MS),
            ),
            stop_on_verdict: self.stop_on_verdict.unwrap_or(false),
        })
    }
}
