use crate::config::types::{EnvError, Result, REWARD_SUCCESS};
use serde::{Deserialize, Serialize};

/// Placeholder in `run_template` tokens replaced by the artifact filename.
pub const ARTIFACT_PLACEHOLDER: &str = "{artifact}";
/// Placeholder in `run_template` tokens replaced by the source filename.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// One rung of a profile's strictness escalation ladder.
///
/// `flags` are the extra compiler arguments that make this tier stricter than
/// the one before it; `reward_on_failure` is the penalty assigned when
/// compilation first fails at exactly this tier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrictnessTier {
    pub flags: Vec<String>,
    pub reward_on_failure: i32,
}

impl StrictnessTier {
    pub fn new<I, S>(flags: I, reward_on_failure: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            reward_on_failure,
        }
    }
}

/// Declarative, per-language parameterization of the graduated
/// compile-and-execute protocol.
///
/// A profile declares everything needed to build and run a single source
/// unit without embedding any process-invocation logic. Profiles are
/// validated once at construction and read-only afterwards.
///
/// Note on non-executing profiles: when `execute_after_compile` is false and
/// all tiers pass, the episode observation reports success while the reward
/// keeps the first tier's failure value. This mismatch between the two
/// channels is part of the protocol as shipped; consumers that need a
/// positive reward for such languages should adjust the tier table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Language tag, e.g. "c", "cpp", "java".
    pub language: String,
    /// Resolved toolchain command token (see [`crate::toolchain`]).
    pub toolchain_command: String,
    /// Escalation ladder, ordered least to most strict.
    pub tiers: Vec<StrictnessTier>,
    /// Tokens inserted before the tier flags.
    pub pre_flags: Vec<String>,
    /// Tokens inserted after the tier flags.
    pub post_flags: Vec<String>,
    /// Filename the submitted source is written to inside the workspace.
    pub source_filename: String,
    /// Output flag token, e.g. "-o". Appended after the source filename.
    pub io_flag: Option<String>,
    /// Compiled artifact filename, appended after `io_flag`.
    pub artifact_filename: Option<String>,
    /// Tokens appended after the artifact name.
    pub post_artifact_flags: Vec<String>,
    /// Run invocation tokens; `{artifact}` and `{source}` are substituted.
    pub run_template: Vec<String>,
    /// Whether the artifact is executed after a fully clean compile walk.
    pub execute_after_compile: bool,
}

impl LanguageProfile {
    /// Validate the profile invariants. Called at evaluator construction;
    /// violations are configuration errors, never rewards.
    pub fn validate(&self) -> Result<()> {
        if self.language.is_empty() {
            return Err(EnvError::Config("profile language tag is empty".to_string()));
        }
        if self.toolchain_command.is_empty() {
            return Err(EnvError::Config(format!(
                "profile '{}' has no resolved toolchain command",
                self.language
            )));
        }
        if self.source_filename.is_empty() {
            return Err(EnvError::Config(format!(
                "profile '{}' has an empty source filename",
                self.language
            )));
        }
        if self.tiers.is_empty() {
            return Err(EnvError::Config(format!(
                "profile '{}' declares no strictness tiers",
                self.language
            )));
        }
        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.reward_on_failure >= REWARD_SUCCESS {
                return Err(EnvError::Config(format!(
                    "profile '{}' tier {} failure reward {} collides with the success reward",
                    self.language, index, tier.reward_on_failure
                )));
            }
        }
        // A less strict tier failing means weaker code, so its penalty must
        // not be more favorable than any stricter tier's.
        for window in self.tiers.windows(2) {
            if window[0].reward_on_failure > window[1].reward_on_failure {
                return Err(EnvError::Config(format!(
                    "profile '{}' tier rewards are not ordered by strictness ({} before {})",
                    self.language, window[0].reward_on_failure, window[1].reward_on_failure
                )));
            }
        }
        if self.execute_after_compile && self.run_template.is_empty() {
            return Err(EnvError::Config(format!(
                "profile '{}' executes after compile but has no run template",
                self.language
            )));
        }
        let wants_artifact = self
            .run_template
            .iter()
            .any(|token| token.contains(ARTIFACT_PLACEHOLDER));
        if wants_artifact && self.artifact_filename.is_none() {
            return Err(EnvError::Config(format!(
                "profile '{}' run template references {} but declares no artifact",
                self.language, ARTIFACT_PLACEHOLDER
            )));
        }
        if self.artifact_filename.is_some() && self.io_flag.is_none() {
            return Err(EnvError::Config(format!(
                "profile '{}' declares an artifact without an output flag to place it",
                self.language
            )));
        }
        Ok(())
    }

    /// Synthesize the compile argv for one strictness tier.
    pub fn compile_argv(&self, tier: &StrictnessTier) -> Vec<String> {
        let mut argv = Vec::with_capacity(
            1 + self.pre_flags.len()
                + tier.flags.len()
                + self.post_flags.len()
                + 3
                + self.post_artifact_flags.len(),
        );
        argv.push(self.toolchain_command.clone());
        argv.extend(self.pre_flags.iter().cloned());
        argv.extend(tier.flags.iter().cloned());
        argv.extend(self.post_flags.iter().cloned());
        argv.push(self.source_filename.clone());
        if let Some(io_flag) = &self.io_flag {
            argv.push(io_flag.clone());
        }
        if let Some(artifact) = &self.artifact_filename {
            argv.push(artifact.clone());
        }
        argv.extend(self.post_artifact_flags.iter().cloned());
        argv
    }

    /// Synthesize the run argv by substituting placeholders per token.
    pub fn run_argv(&self) -> Vec<String> {
        let artifact = self.artifact_filename.as_deref().unwrap_or_default();
        self.run_template
            .iter()
            .map(|token| {
                token
                    .replace(ARTIFACT_PLACEHOLDER, artifact)
                    .replace(SOURCE_PLACEHOLDER, &self.source_filename)
            })
            .collect()
    }

    /// Copy of this profile bound to a different toolchain command.
    pub fn with_toolchain(mut self, command: impl Into<String>) -> Self {
        self.toolchain_command = command.into();
        self
    }
}
