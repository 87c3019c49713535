use crate::config::types::{EnvError, Result};
use crate::exec::output::{OutputLimits, StreamCollector};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const TERM_GRACE: Duration = Duration::from_millis(250);

/// Signal escalation report for timeout termination paths.
#[derive(Clone, Debug, Default)]
pub struct KillReport {
    pub term_sent: bool,
    pub kill_sent: bool,
    pub waited_ms: u64,
}

/// Exit status and captured output of one spawned process.
#[derive(Clone, Debug, Default)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub wall_time_ms: u64,
    pub kill_report: Option<KillReport>,
}

impl CommandOutcome {
    /// A timed-out invocation never counts as success, whatever the kernel
    /// reports after the forced kill.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Process-invocation adapter.
///
/// All toolchain and artifact execution goes through this seam: structured
/// argument lists only, blocking until exit, output captured as text.
/// Callers needing sandboxing substitute their own implementation.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        argv: &[String],
        workdir: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome>;
}

/// Default runner: spawns directly on the host with bounded output
/// collection and wall-clock timeout enforcement.
pub struct SystemRunner {
    limits: OutputLimits,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            limits: OutputLimits::default(),
        }
    }

    pub fn with_limits(limits: OutputLimits) -> Self {
        Self { limits }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        argv: &[String],
        workdir: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome> {
        let program = argv
            .first()
            .ok_or_else(|| EnvError::Config("empty command provided".to_string()))?;

        log::debug!("spawning {:?} in {}", argv, workdir.display());

        let mut child = Command::new(program)
            .args(&argv[1..])
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EnvError::Process(format!("failed to spawn '{program}': {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .map(|s| StreamCollector::spawn(s, self.limits.stdout_limit));
        let stderr = child
            .stderr
            .take()
            .map(|s| StreamCollector::spawn(s, self.limits.stderr_limit));

        let start = Instant::now();
        let deadline = timeout.map(|t| start + t);
        let mut timed_out = false;
        let mut kill_report = None;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(deadline) = deadline {
                if !timed_out && Instant::now() >= deadline {
                    timed_out = true;
                    kill_report = Some(escalate_kill(&mut child, start));
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.map(StreamCollector::finish).unwrap_or_default();
        let stderr = stderr.map(StreamCollector::finish).unwrap_or_default();

        Ok(CommandOutcome {
            exit_code: status.code(),
            signal: status.signal(),
            timed_out,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
            stdout: stdout.into_text(),
            stderr: stderr.into_text(),
            wall_time_ms: start.elapsed().as_millis() as u64,
            kill_report,
        })
    }
}

/// SIGTERM first, short grace window, then SIGKILL. The caller's wait loop
/// reaps the child afterwards.
fn escalate_kill(child: &mut Child, start: Instant) -> KillReport {
    let pid = Pid::from_raw(child.id() as i32);
    let mut report = KillReport {
        waited_ms: start.elapsed().as_millis() as u64,
        ..KillReport::default()
    };

    if kill(pid, Signal::SIGTERM).is_ok() {
        report.term_sent = true;
    }

    let grace_deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_deadline {
        if let Ok(Some(_)) | Err(_) = child.try_wait() {
            return report;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if kill(pid, Signal::SIGKILL).is_ok() {
        report.kill_sent = true;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn captures_stdout_of_successful_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        let outcome = runner.run(&sh("echo alpha"), dir.path(), None).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.exit_code, Some(0));
        assert_eq!(outcome.stdout.trim(), "alpha");
        assert!(outcome.stderr.is_empty());
    }

    #[test]
    fn reports_nonzero_exit_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        let outcome = runner
            .run(&sh("echo broken >&2; exit 3"), dir.path(), None)
            .unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stderr.trim(), "broken");
    }

    #[test]
    fn missing_binary_is_a_process_error_not_an_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        let argv = vec!["rewardbox-no-such-binary".to_string()];
        assert!(matches!(
            runner.run(&argv, dir.path(), None),
            Err(EnvError::Process(_))
        ));
    }

    #[test]
    fn empty_argv_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        assert!(matches!(
            runner.run(&[], dir.path(), None),
            Err(EnvError::Config(_))
        ));
    }

    #[test]
    fn hanging_command_is_killed_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        let outcome = runner
            .run(&sh("sleep 30"), dir.path(), Some(Duration::from_millis(100)))
            .unwrap();
        assert!(outcome.timed_out);
        assert!(!outcome.success());
        let report = outcome.kill_report.expect("kill report on timeout");
        assert!(report.term_sent || report.kill_sent);
        assert!(outcome.wall_time_ms < 10_000);
    }

    #[test]
    fn commands_run_in_the_given_workdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("probe.txt"), b"present").unwrap();
        let runner = SystemRunner::new();
        let outcome = runner.run(&sh("cat probe.txt"), dir.path(), None).unwrap();
        assert_eq!(outcome.stdout, "present");
    }
}
