//! Syntax-check gate run against every candidate file before it may be
//! installed.
//!
//! [`CommandValidator`] shells out to an external checker (`visudo -cf` by
//! default). Non-zero exit, spawn failure and timeout all count as rejection.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use sudoers_core::ValidatorConfig;
use wait_timeout::ChildExt;

/// Why a candidate was rejected, plus whatever the checker printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: String,
    pub output: String,
}

impl ValidationFailure {
    pub fn new(reason: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Capability to accept or reject a candidate file.
pub trait Validator {
    fn validate(&self, path: &Path) -> Result<(), ValidationFailure>;
}

/// Runs `<program> <args...> <path>` and accepts on exit status zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandValidator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandValidator {
    pub fn new<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// `visudo -cf <path>` with a 30 second bound.
    pub fn visudo() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    fn command_line(&self, path: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(path.display().to_string());
        parts.join(" ")
    }
}

impl Validator for CommandValidator {
    fn validate(&self, path: &Path) -> Result<(), ValidationFailure> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                ValidationFailure::new(
                    format!("failed to run `{}`: {err}", self.command_line(path)),
                    "",
                )
            })?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                // Readers are abandoned: a surviving grandchild may still hold
                // the pipes open.
                return Err(ValidationFailure::new(
                    format!(
                        "`{}` timed out after {}s",
                        self.command_line(path),
                        self.timeout.as_secs_f64()
                    ),
                    "",
                ));
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ValidationFailure::new(
                    format!("failed to wait for `{}`: {err}", self.command_line(path)),
                    "",
                ));
            }
        };

        let mut output = join_reader(stdout);
        let err_output = join_reader(stderr);
        if !err_output.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&err_output);
        }

        if status.success() {
            Ok(())
        } else {
            Err(ValidationFailure::new(status.to_string(), output))
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::NamedTempFile;

    fn candidate() -> NamedTempFile {
        NamedTempFile::new().expect("candidate")
    }

    fn sh(script: &str) -> CommandValidator {
        CommandValidator::new("sh", ["-c", script, "validator"], Duration::from_secs(5))
    }

    #[test]
    fn zero_exit_accepts() {
        let file = candidate();
        CommandValidator::new("true", Vec::<String>::new(), Duration::from_secs(5))
            .validate(file.path())
            .expect("true accepts");
    }

    #[test]
    fn non_zero_exit_rejects_with_output() {
        let file = candidate();
        let failure = sh("echo \"parse error in $1\"; echo near line 1 >&2; exit 1")
            .validate(file.path())
            .expect_err("rejects");
        assert!(failure.reason.contains("exit status"), "{}", failure.reason);
        assert!(failure.output.contains("parse error in"));
        assert!(failure.output.contains(&file.path().display().to_string()));
        assert!(failure.output.contains("near line 1"));
    }

    #[test]
    fn candidate_path_is_passed_as_last_argument() {
        let file = candidate();
        std::fs::write(file.path(), "marker").unwrap();
        sh("grep -q marker \"$1\"")
            .validate(file.path())
            .expect("path reaches the checker");
    }

    #[test]
    fn missing_program_rejects() {
        let file = candidate();
        let failure = CommandValidator::new(
            "/nonexistent/visudo",
            ["-cf"],
            Duration::from_secs(5),
        )
        .validate(file.path())
        .expect_err("spawn failure rejects");
        assert!(failure.reason.contains("failed to run"));
        assert!(failure.reason.contains("/nonexistent/visudo -cf"));
    }

    #[test]
    fn hung_checker_times_out() {
        let file = candidate();
        let started = Instant::now();
        let failure = CommandValidator::new(
            "sh",
            ["-c", "sleep 5", "validator"],
            Duration::from_millis(100),
        )
        .validate(file.path())
        .expect_err("timeout rejects");
        assert!(failure.reason.contains("timed out"), "{}", failure.reason);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timed_out_checker_is_killed_and_reaped() {
        let file = candidate();
        let pid_file = tempfile::NamedTempFile::new().expect("pid file");
        let script = format!("echo $$ > {}; exec sleep 5", pid_file.path().display());
        let failure = CommandValidator::new(
            "sh",
            ["-c", script.as_str(), "validator"],
            Duration::from_millis(200),
        )
        .validate(file.path())
        .expect_err("timeout rejects");
        assert!(failure.reason.contains("timed out after 0.2s"), "{}", failure.reason);

        let pid = std::fs::read_to_string(pid_file.path()).expect("pid written");
        let alive = Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .expect("kill -0");
        assert!(!alive.success(), "checker {} still running", pid.trim());
    }

    #[test]
    fn visudo_defaults() {
        let validator = CommandValidator::visudo();
        assert_eq!(
            validator.command_line(Path::new("/tmp/x")),
            "visudo -cf /tmp/x"
        );
        assert_eq!(validator.timeout, Duration::from_secs(30));
    }
}
