/// Core types shared across the rewardbox system
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Observation value reported for a successful episode.
pub const OBSERVATION_SUCCESS: u8 = 1;
/// Observation value reported for a failed episode.
pub const OBSERVATION_FAILURE: u8 = 0;

/// Reward reserved for "compiled cleanly through all tiers and ran to a zero
/// exit status". Every tier failure reward in a profile must stay below it.
pub const REWARD_SUCCESS: i32 = 1;

/// Captured text output of the final process run in an episode.
///
/// Exactly one side is ever populated: stdout when the last process exited
/// zero, stderr otherwise. Intermediate tier output is not retained.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostics {
    Stdout(String),
    Stderr(String),
}

impl Diagnostics {
    /// Text payload regardless of which stream it came from.
    pub fn text(&self) -> &str {
        match self {
            Diagnostics::Stdout(s) | Diagnostics::Stderr(s) => s,
        }
    }
}

/// Result of one complete submit -> compile -> (execute) -> classify episode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeResult {
    /// Coarse binary success signal: 1 on success, 0 on failure.
    pub observation: u8,
    /// Scalar reward: a tier's configured failure penalty, or `REWARD_SUCCESS`.
    pub reward: i32,
    /// Every step is a complete, terminal episode.
    pub done: bool,
    /// Output of the last process run (stdout on success, stderr on failure).
    pub diagnostics: Diagnostics,
}

impl EpisodeResult {
    pub fn succeeded(&self) -> bool {
        self.observation == OBSERVATION_SUCCESS
    }
}

/// Custom error types for rewardbox
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Toolchain error: {0}")]
    Toolchain(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Workspace error: {0}")]
    Workspace(String),
}

/// Result type alias for rewardbox operations
pub type Result<T> = std::result::Result<T, EnvError>;
