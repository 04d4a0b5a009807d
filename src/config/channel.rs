//! Channel configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ChannelError;
use crate::runtime::Deferral;

/// Environment variable holding the channel name.
pub const ENV_NAME: &str = "CHANNEL_NAME";
/// Environment variable holding the concurrency limit, or `auto` for one slot
/// per logical CPU.
pub const ENV_CONCURRENCY: &str = "CHANNEL_CONCURRENCY";
/// Environment variable selecting the deferral strategy
/// (`next_tick`, `timer`, `immediate`).
pub const ENV_DEFERRAL: &str = "CHANNEL_DEFERRAL";
/// Environment variable holding the timer delay in milliseconds.
pub const ENV_TIMER_DELAY_MS: &str = "CHANNEL_TIMER_DELAY_MS";

const DEFAULT_TIMER_DELAY_MS: u64 = 1;

/// Deferral strategy selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferralConfig {
    /// Spawn the next dispatch round as its own task.
    #[default]
    NextTick,
    /// Start the next dispatch round after a timer delay.
    Timer {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Dispatch inline. Test harnesses only.
    Immediate,
}

impl From<&DeferralConfig> for Deferral {
    fn from(cfg: &DeferralConfig) -> Self {
        match cfg {
            DeferralConfig::NextTick => Self::NextTick,
            DeferralConfig::Timer { delay_ms } => Self::Timer(Duration::from_millis(*delay_ms)),
            DeferralConfig::Immediate => Self::Immediate,
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channel name used in logs and event records.
    pub name: String,
    /// Maximum simultaneously in-flight tasks.
    pub concurrency_limit: usize,
    /// How the next dispatch round is scheduled after a task settles.
    pub deferral: DeferralConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            concurrency_limit: 1,
            deferral: DeferralConfig::NextTick,
        }
    }
}

impl ChannelConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.name.trim().is_empty() {
            return Err(ChannelError::InvalidConfig("name must not be empty".into()));
        }
        if self.concurrency_limit == 0 {
            return Err(ChannelError::InvalidConfig(
                "concurrency_limit must be greater than 0".into(),
            ));
        }
        if let DeferralConfig::Timer { delay_ms: 0 } = self.deferral {
            return Err(ChannelError::InvalidConfig(
                "timer delay_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse failures and validation failures, both as
    /// [`ChannelError::InvalidConfig`].
    pub fn from_json_str(input: &str) -> Result<Self, ChannelError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| ChannelError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from the process environment, loading `.env` first
    /// if present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Env`] for unparsable values, then validation errors.
    pub fn from_env() -> Result<Self, ChannelError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelConfig::from_env`].
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ChannelError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(name) = lookup(ENV_NAME) {
            cfg.name = name;
        }
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            cfg.concurrency_limit = parse_concurrency(&raw)?;
        }
        if let Some(raw) = lookup(ENV_DEFERRAL) {
            cfg.deferral = match raw.trim() {
                "next_tick" => DeferralConfig::NextTick,
                "immediate" => DeferralConfig::Immediate,
                "timer" => {
                    let delay_ms = match lookup(ENV_TIMER_DELAY_MS) {
                        Some(raw) => raw.trim().parse().map_err(|e| {
                            ChannelError::Env(format!("{ENV_TIMER_DELAY_MS}={raw}: {e}"))
                        })?,
                        None => DEFAULT_TIMER_DELAY_MS,
                    };
                    DeferralConfig::Timer { delay_ms }
                }
                other => {
                    return Err(ChannelError::Env(format!(
                        "{ENV_DEFERRAL}={other}: expected next_tick, timer or immediate"
                    )))
                }
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_concurrency(raw: &str) -> Result<usize, ChannelError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("auto") {
        return Ok(num_cpus::get().max(1));
    }
    raw.parse()
        .map_err(|e| ChannelError::Env(format!("{ENV_CONCURRENCY}={raw}: {e}")))
}
