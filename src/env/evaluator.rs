use crate::config::types::{
    Diagnostics, EnvError, EpisodeResult, Result, OBSERVATION_FAILURE, OBSERVATION_SUCCESS,
    REWARD_SUCCESS,
};
use crate::exec::runner::{CommandOutcome, CommandRunner, SystemRunner};
use crate::profile::registry::ProfileRegistry;
use crate::profile::types::LanguageProfile;
use crate::safety::workspace::WorkspaceManager;
use rand::Rng;
use std::time::Duration;

/// Per-call deadlines applied at the process-invocation boundary.
///
/// Submitted code is untrusted and may hang; both phases carry a wall-clock
/// limit by default. `unlimited()` disables them.
#[derive(Clone, Debug)]
pub struct EvalLimits {
    pub compile_timeout: Option<Duration>,
    pub run_timeout: Option<Duration>,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            compile_timeout: Some(Duration::from_secs(30)),
            run_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl EvalLimits {
    pub fn unlimited() -> Self {
        Self {
            compile_timeout: None,
            run_timeout: None,
        }
    }
}

/// Reward policy for a run that exited zero.
///
/// The base protocol awards `REWARD_SUCCESS`. Consumers layering per-test-case
/// checks on top replace this to award a richer value (e.g. 10 when all cases
/// pass) from the captured run output. The judge is only consulted after a
/// zero exit; failure classification is not its concern.
pub trait RunJudge: Send + Sync {
    fn judge(&self, outcome: &CommandOutcome) -> i32;
}

/// Base policy: a zero exit status earns the success reward, nothing more.
pub struct ExitStatusJudge;

impl RunJudge for ExitStatusJudge {
    fn judge(&self, _outcome: &CommandOutcome) -> i32 {
        REWARD_SUCCESS
    }
}

/// Single-step episode evaluator.
///
/// Bound to one validated [`LanguageProfile`]; each `step` call writes the
/// submitted source into a fresh workspace, walks the strictness ladder
/// least to most strict, optionally executes the artifact, and classifies
/// the outcome into an [`EpisodeResult`]. No state carries across steps.
pub struct CompilerEnv {
    profile: LanguageProfile,
    runner: Box<dyn CommandRunner>,
    workspaces: WorkspaceManager,
    limits: EvalLimits,
    judge: Box<dyn RunJudge>,
}

impl CompilerEnv {
    /// Evaluator with the default host runner.
    pub fn new(profile: LanguageProfile) -> Result<Self> {
        Self::with_runner(profile, Box::new(SystemRunner::new()))
    }

    /// Evaluator with an injected process-invocation adapter (sandboxed
    /// runners, scripted runners in tests).
    pub fn with_runner(profile: LanguageProfile, runner: Box<dyn CommandRunner>) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            runner,
            workspaces: WorkspaceManager::new()?,
            limits: EvalLimits::default(),
            judge: Box::new(ExitStatusJudge),
        })
    }

    /// Evaluator for a registry profile, with the toolchain resolved for
    /// this host. Resolution failure is a configuration error.
    pub fn for_language(language: &str, registry: &ProfileRegistry) -> Result<Self> {
        let profile = registry.get(language)?.clone();
        let resolved = crate::toolchain::resolve(language)?;
        Self::new(profile.with_toolchain(resolved.command))
    }

    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_workspaces(mut self, workspaces: WorkspaceManager) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_run_judge(mut self, judge: Box<dyn RunJudge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    /// Evaluate one submission: write, graduated compile, optional run,
    /// classify. Every call is a complete, terminal episode.
    pub fn step(&self, source_code: &str) -> Result<EpisodeResult> {
        let workspace = self.workspaces.create_workspace()?;
        workspace.write_source(&self.profile.source_filename, source_code)?;
        let workdir = workspace.dir();

        let mut errored = false;
        let mut reward = self
            .profile
            .tiers
            .first()
            .map(|tier| tier.reward_on_failure)
            .ok_or_else(|| {
                EnvError::Config(format!(
                    "profile '{}' declares no strictness tiers",
                    self.profile.language
                ))
            })?;
        let mut last: Option<CommandOutcome> = None;

        // Least to most strict; the first failing tier settles the reward and
        // stops the walk. Stricter tiers are never attempted after a failure,
        // so the reward reflects the weakest strictness the code failed at.
        for (index, tier) in self.profile.tiers.iter().enumerate() {
            let argv = self.profile.compile_argv(tier);
            let outcome = self.runner.run(&argv, workdir, self.limits.compile_timeout)?;
            log::debug!(
                "{}: tier {index} {:?} -> exit {:?} (timed_out: {})",
                self.profile.language,
                tier.flags,
                outcome.exit_code,
                outcome.timed_out
            );
            let failed = !outcome.success();
            last = Some(outcome);
            if failed {
                reward = tier.reward_on_failure;
                errored = true;
                break;
            }
        }
        let mut last = last.ok_or_else(|| {
            EnvError::Config(format!(
                "profile '{}' produced no compile outcome",
                self.profile.language
            ))
        })?;

        let mut run_succeeded = false;
        if !errored && self.profile.execute_after_compile {
            let argv = self.profile.run_argv();
            let outcome = self.runner.run(&argv, workdir, self.limits.run_timeout)?;
            if outcome.success() {
                run_succeeded = true;
                reward = self.judge.judge(&outcome);
            }
            // A failed run keeps the compile-phase placeholder reward; the
            // base protocol does not classify runtime failure separately.
            last = outcome;
        }

        // Success means either a clean run, or a clean compile walk for a
        // profile that never executes. Note that the second arm can pair a
        // success observation with a negative reward.
        let observation = if run_succeeded || (!self.profile.execute_after_compile && !errored) {
            OBSERVATION_SUCCESS
        } else {
            OBSERVATION_FAILURE
        };

        let diagnostics = if last.success() {
            Diagnostics::Stdout(last.stdout)
        } else {
            Diagnostics::Stderr(last.stderr)
        };

        log::info!(
            "{}: episode {} -> observation {observation}, reward {reward}",
            self.profile.language,
            workspace.episode_id()
        );

        Ok(EpisodeResult {
            observation,
            reward,
            done: true,
            diagnostics,
        })
    }

    /// Stateless reset: a sample observation, carrying no information
    /// between episodes.
    pub fn reset(&self) -> u8 {
        rand::thread_rng().gen_range(0..=1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::presets;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    /// Runner that replays a fixed outcome sequence and records each argv.
    struct ScriptedRunner {
        outcomes: Mutex<VecDeque<Result<CommandOutcome>>>,
        calls: Mutex<Vec<Vec<String>>>,
        seen_source: Mutex<Option<String>>,
        source_filename: String,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<CommandOutcome>>, source_filename: &str) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
                seen_source: Mutex::new(None),
                source_filename: source_filename.to_string(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            argv: &[String],
            workdir: &Path,
            _timeout: Option<Duration>,
        ) -> Result<CommandOutcome> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if let Ok(content) = std::fs::read_to_string(workdir.join(&self.source_filename)) {
                *self.seen_source.lock().unwrap() = Some(content);
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(EnvError::Process("script exhausted".to_string())))
        }
    }

    fn ok(stdout: &str) -> Result<CommandOutcome> {
        Ok(CommandOutcome {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            ..CommandOutcome::default()
        })
    }

    fn failed(code: i32, stderr: &str) -> Result<CommandOutcome> {
        Ok(CommandOutcome {
            exit_code: Some(code),
            stderr: stderr.to_string(),
            ..CommandOutcome::default()
        })
    }

    fn env_with_script(
        profile: crate::profile::types::LanguageProfile,
        outcomes: Vec<Result<CommandOutcome>>,
    ) -> (CompilerEnv, std::sync::Arc<ScriptedRunner>) {
        // Leak-free sharing: CompilerEnv owns a Box, the test keeps an Arc.
        let runner = std::sync::Arc::new(ScriptedRunner::new(outcomes, &profile.source_filename));
        let boxed: Box<dyn CommandRunner> = Box::new(SharedRunner(runner.clone()));
        let env = CompilerEnv::with_runner(profile, boxed).unwrap();
        (env, runner)
    }

    struct SharedRunner(std::sync::Arc<ScriptedRunner>);

    impl CommandRunner for SharedRunner {
        fn run(
            &self,
            argv: &[String],
            workdir: &Path,
            timeout: Option<Duration>,
        ) -> Result<CommandOutcome> {
            self.0.run(argv, workdir, timeout)
        }
    }

    #[test]
    fn failure_at_strictest_tier_reports_its_penalty() {
        let profile = presets::c_profile("cc");
        let (env, runner) = env_with_script(
            profile,
            vec![
                ok(""),
                ok(""),
                ok(""),
                failed(1, "missing initializer for field 'y'"),
            ],
        );

        let result = env.step("struct code").unwrap();
        assert_eq!(result.observation, 0);
        assert_eq!(result.reward, -1);
        assert!(result.done);
        assert_eq!(
            result.diagnostics,
            Diagnostics::Stderr("missing initializer for field 'y'".to_string())
        );
        // All four tiers compiled, nothing executed.
        assert_eq!(runner.call_count(), 4);
    }

    #[test]
    fn failure_at_intermediate_tier_short_circuits() {
        let profile = presets::c_profile("cc");
        let (env, runner) = env_with_script(
            profile,
            vec![ok(""), ok(""), failed(1, "unused variable 'x'")],
        );

        let result = env.step("unused variable code").unwrap();
        assert_eq!(result.observation, 0);
        assert_eq!(result.reward, -2);
        assert!(result.done);
        // Fail-fast: the strictest tier is never attempted.
        assert_eq!(runner.call_count(), 3);
    }

    #[test]
    fn failure_at_most_permissive_tier_reports_worst_penalty() {
        let profile = presets::c_profile("cc");
        let (env, runner) = env_with_script(profile, vec![failed(1, "syntax error")]);

        let result = env.step("not c at all").unwrap();
        assert_eq!(result.observation, 0);
        assert_eq!(result.reward, -4);
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn clean_compile_and_run_earns_success() {
        let profile = presets::c_profile("cc");
        let (env, runner) = env_with_script(
            profile,
            vec![ok(""), ok(""), ok(""), ok(""), ok("Hello World")],
        );

        let result = env.step("hello world code").unwrap();
        assert_eq!(result.observation, 1);
        assert_eq!(result.reward, REWARD_SUCCESS);
        assert!(result.done);
        assert_eq!(
            result.diagnostics,
            Diagnostics::Stdout("Hello World".to_string())
        );
        assert_eq!(runner.call_count(), 5);
        // Final call is the run template, not a compile.
        assert_eq!(runner.calls()[4], vec!["./solution"]);
    }

    #[test]
    fn runtime_failure_keeps_the_compile_phase_reward() {
        let profile = presets::c_profile("cc");
        let (env, _runner) = env_with_script(
            profile,
            vec![ok(""), ok(""), ok(""), ok(""), failed(139, "segfault")],
        );

        let result = env.step("crashing code").unwrap();
        assert_eq!(result.observation, 0);
        // Runtime failure is not separately classified; the most permissive
        // tier's penalty stands.
        assert_eq!(result.reward, -4);
        assert_eq!(
            result.diagnostics,
            Diagnostics::Stderr("segfault".to_string())
        );
    }

    #[test]
    fn non_executing_profile_reports_negative_reward_success() {
        let profile = presets::php_profile("php");
        let (env, runner) = env_with_script(profile, vec![ok("No syntax errors detected")]);

        let result = env.step("<?php echo 'hi'; ?>").unwrap();
        // Success observation with the tier's negative reward: the two
        // channels disagree for non-executing profiles, as shipped.
        assert_eq!(result.observation, 1);
        assert_eq!(result.reward, -1);
        assert!(result.done);
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn non_executing_profile_syntax_failure_is_a_failure() {
        let profile = presets::php_profile("php");
        let (env, _runner) = env_with_script(profile, vec![failed(255, "parse error")]);

        let result = env.step("<?php not php").unwrap();
        assert_eq!(result.observation, 0);
        assert_eq!(result.reward, -1);
        assert_eq!(
            result.diagnostics,
            Diagnostics::Stderr("parse error".to_string())
        );
    }

    #[test]
    fn timed_out_compile_counts_as_tier_failure() {
        let profile = presets::c_profile("cc");
        let timed_out = Ok(CommandOutcome {
            exit_code: None,
            timed_out: true,
            stderr: String::new(),
            ..CommandOutcome::default()
        });
        let (env, runner) = env_with_script(profile, vec![timed_out]);

        let result = env.step("#include <pathological.h>").unwrap();
        assert_eq!(result.observation, 0);
        assert_eq!(result.reward, -4);
        assert_eq!(runner.call_count(), 1);
    }

    #[test]
    fn runner_hard_error_propagates_instead_of_scoring() {
        let profile = presets::c_profile("cc");
        let (env, _runner) = env_with_script(
            profile,
            vec![Err(EnvError::Process("permission denied".to_string()))],
        );

        assert!(matches!(env.step("code"), Err(EnvError::Process(_))));
    }

    #[test]
    fn custom_run_judge_can_award_richer_rewards() {
        struct TenIfAllPass;
        impl RunJudge for TenIfAllPass {
            fn judge(&self, outcome: &CommandOutcome) -> i32 {
                if outcome.stdout.contains("all tests passed") {
                    10
                } else {
                    REWARD_SUCCESS
                }
            }
        }

        let profile = presets::c_profile("cc");
        let (env, _runner) = env_with_script(
            profile,
            vec![ok(""), ok(""), ok(""), ok(""), ok("all tests passed")],
        );
        let env = env.with_run_judge(Box::new(TenIfAllPass));

        let result = env.step("code").unwrap();
        assert_eq!(result.reward, 10);
        assert_eq!(result.observation, 1);
    }

    #[test]
    fn source_is_written_verbatim_before_the_first_invocation() {
        let profile = presets::c_profile("cc");
        let source = "int main() { return 0; }\n";
        let (env, runner) = env_with_script(profile, vec![failed(1, "stop early")]);

        env.step(source).unwrap();
        assert_eq!(runner.seen_source.lock().unwrap().as_deref(), Some(source));
    }

    #[test]
    fn compile_argv_escalates_in_declared_order() {
        let profile = presets::c_profile("cc");
        let (env, runner) = env_with_script(
            profile,
            vec![ok(""), ok(""), ok(""), ok(""), ok("out")],
        );
        env.step("code").unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0][1], "solution.c");
        assert!(calls[1].contains(&"-Werror".to_string()));
        assert!(calls[2].contains(&"-Wall".to_string()));
        assert!(calls[3].contains(&"-Wextra".to_string()));
    }

    #[test]
    fn observation_matches_reward_contract() {
        // observation == 1 iff reward == 1, or the profile skips execution
        // and no tier failed.
        let cases: Vec<(Vec<Result<CommandOutcome>>, bool)> = vec![
            (vec![ok(""), ok(""), ok(""), ok(""), ok("hi")], true),
            (vec![ok(""), ok(""), ok(""), ok(""), failed(1, "")], false),
            (vec![failed(1, "")], false),
        ];
        for (script, expect_success) in cases {
            let (env, _runner) = env_with_script(presets::c_profile("cc"), script);
            let result = env.step("code").unwrap();
            let contract = result.reward == REWARD_SUCCESS;
            assert_eq!(result.observation == 1, contract);
            assert_eq!(result.observation == 1, expect_success);
        }
    }

    #[test]
    fn reset_samples_the_observation_space() {
        let profile = presets::c_profile("cc");
        let (env, _runner) = env_with_script(profile, vec![]);
        for _ in 0..32 {
            assert!(env.reset() <= 1);
        }
    }
}
