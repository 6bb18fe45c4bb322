//! Script runners.
//!
//! [`ProcessScriptHost`] hands each snippet to an external interpreter:
//! the snippet is written to a scratch file whose path is appended to the
//! configured arguments, and the entry name is exported as `GDPILOT_ENTRY`.
//!
//! Exit protocol of the interpreter:
//! - `0`: stdout (trimmed) is the entry's return value
//! - [`COMPILE_ERROR_EXIT`]: the snippet did not compile; stderr lines are diagnostics
//! - anything else: runtime failure, stderr is the message

use async_trait::async_trait;
use gdpilot_core::host::{ScriptFailure, ScriptHost, ScriptOutput};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit status an interpreter uses to report a compile failure.
pub const COMPILE_ERROR_EXIT: i32 = 2;

pub struct ProcessScriptHost {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessScriptHost {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn has_entry(source: &str, entry: &str) -> bool {
        let needle = format!("func {entry}(");
        source
            .lines()
            .any(|line| line.trim_start().starts_with(&needle))
    }
}

#[async_trait]
impl ScriptHost for ProcessScriptHost {
    async fn run(&self, source: &str, entry: &str) -> Result<ScriptOutput, ScriptFailure> {
        if !Self::has_entry(source, entry) {
            return Err(ScriptFailure::MissingEntry { entry: entry.into() });
        }

        // Only the path is used; the file is removed when `scratch` drops.
        let scratch = tempfile::Builder::new()
            .prefix("gdpilot-")
            .suffix(".gd")
            .tempfile()
            .map_err(|e| ScriptFailure::Unavailable(format!("could not create scratch file: {e}")))?;
        tokio::fs::write(scratch.path(), source)
            .await
            .map_err(|e| ScriptFailure::Unavailable(format!("could not write scratch file: {e}")))?;

        debug!(program = %self.program, path = %scratch.path().display(), "Running script snippet");

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(scratch.path())
            .env("GDPILOT_ENTRY", entry)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScriptFailure::Unavailable(format!("could not start '{}': {e}", self.program)))?;

        // On timeout the future owning `child` is dropped, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| ScriptFailure::Runtime(e.to_string()))?,
            Err(_) => {
                warn!(program = %self.program, "Script snippet timed out");
                return Err(ScriptFailure::Runtime(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match output.status.code() {
            Some(0) => Ok(ScriptOutput::Value(stdout.trim().to_string())),
            Some(COMPILE_ERROR_EXIT) => Err(ScriptFailure::Compile {
                error: "ERR_PARSE_ERROR".into(),
                diagnostics: stderr
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect(),
            }),
            code => {
                let message = stderr.trim();
                Err(ScriptFailure::Runtime(if message.is_empty() {
                    format!("interpreter exited with status {}", code.unwrap_or(-1))
                } else {
                    message.to_string()
                }))
            }
        }
    }
}

/// A host without a script runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledScriptHost;

#[async_trait]
impl ScriptHost for DisabledScriptHost {
    async fn run(&self, _source: &str, _entry: &str) -> Result<ScriptOutput, ScriptFailure> {
        Err(ScriptFailure::Unavailable(
            "Script execution is disabled. Set 'script.program' in the config to enable it.".into(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// `sh -c <body> sh <file>`: the body sees the snippet path as `$1`.
    fn sh(body: &str) -> ProcessScriptHost {
        ProcessScriptHost::new("sh", vec!["-c".into(), body.into(), "sh".into()])
    }

    #[test]
    fn entry_detection() {
        assert!(ProcessScriptHost::has_entry("extends RefCounted\nfunc run():\n\treturn 1\n", "run"));
        assert!(ProcessScriptHost::has_entry("  func run() -> int:\n", "run"));
        assert!(!ProcessScriptHost::has_entry("func running():\n", "run"));
        assert!(!ProcessScriptHost::has_entry("# func run():\n", "run"));
    }

    #[tokio::test]
    async fn missing_entry_is_reported_without_spawning() {
        let host = ProcessScriptHost::new("/nonexistent/interpreter", vec![]);
        assert_eq!(
            host.run("func main():\n\tpass\n", "run").await,
            Err(ScriptFailure::MissingEntry { entry: "run".into() })
        );
    }

    #[tokio::test]
    async fn stdout_is_the_value() {
        let host = sh(r#"test "$GDPILOT_ENTRY" = run && grep -c func "$1""#);
        assert_eq!(
            host.run("func run():\n\treturn 42\n", "run").await,
            Ok(ScriptOutput::Value("1".into()))
        );
    }

    #[tokio::test]
    async fn compile_exit_carries_diagnostics() {
        let host = sh("echo 'Line 2: Expected end of statement' >&2; echo '' >&2; exit 2");
        match host.run("func run():\n\treturn (\n", "run").await {
            Err(ScriptFailure::Compile { diagnostics, .. }) => {
                assert_eq!(diagnostics, vec!["Line 2: Expected end of statement".to_string()]);
            }
            other => panic!("expected compile failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_exit_is_runtime_error() {
        let host = sh("echo 'Invalid call. Nonexistent function' >&2; exit 1");
        assert_eq!(
            host.run("func run():\n\tnull.foo()\n", "run").await,
            Err(ScriptFailure::Runtime("Invalid call. Nonexistent function".into()))
        );

        let silent = sh("exit 3");
        assert_eq!(
            silent.run("func run():\n\tpass\n", "run").await,
            Err(ScriptFailure::Runtime("interpreter exited with status 3".into()))
        );
    }

    #[tokio::test]
    async fn slow_snippet_times_out() {
        let host = sh("sleep 5").with_timeout(Duration::from_millis(200));
        assert!(matches!(
            host.run("func run():\n\tpass\n", "run").await,
            Err(ScriptFailure::Runtime(msg)) if msg.starts_with("timed out")
        ));
    }

    #[tokio::test]
    async fn timed_out_interpreter_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let host = sh(&format!("sleep 1; touch '{}'", marker.display()))
            .with_timeout(Duration::from_millis(100));

        assert!(host.run("func run():\n\tpass\n", "run").await.is_err());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_interpreter_is_unavailable() {
        let host = ProcessScriptHost::new("/nonexistent/interpreter", vec![]);
        assert!(matches!(
            host.run("func run():\n\tpass\n", "run").await,
            Err(ScriptFailure::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn disabled_host() {
        assert!(matches!(
            DisabledScriptHost.run("func run():\n\tpass\n", "run").await,
            Err(ScriptFailure::Unavailable(_))
        ));
    }
}
