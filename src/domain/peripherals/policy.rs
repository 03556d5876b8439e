use crate::domain::settings::{CommandSettings, ReadSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a wrapper reacts when the link times out or is down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the wrapper's default value (false, 0, 0.0, None)
    Sentinel,
    /// Hand the error to the caller
    Propagate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    #[default]
    FireAndForget,
    /// Wait for the controller's request status frame after each command
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub timeout: Duration,
    pub on_failure: FailurePolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::from(&ReadSettings::default())
    }
}

impl From<&ReadSettings> for ReadOptions {
    fn from(settings: &ReadSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            on_failure: settings.on_failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOptions {
    pub mode: CommandMode,
    pub ack_timeout: Duration,
    pub on_failure: FailurePolicy,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self::from(&CommandSettings::default())
    }
}

impl From<&CommandSettings> for CommandOptions {
    fn from(settings: &CommandSettings) -> Self {
        Self {
            mode: settings.mode,
            ack_timeout: Duration::from_millis(settings.ack_timeout_ms),
            on_failure: settings.on_failure,
        }
    }
}
