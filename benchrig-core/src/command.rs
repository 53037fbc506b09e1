// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! External-command benchmarks.
//!
//! Each repetition spawns the declared command from the unit's directory,
//! writes a JSON description of the repetition to its stdin and parses its
//! stdout as the JSON measurement. Lifecycle hooks are optional commands run
//! the same way with stdout discarded, and may leave background processes
//! running (a daemon started in `setup` and stopped in `teardown`).

use std::io::{ErrorKind, Read, Write};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::Serialize;

use crate::benchmark::{Benchmark, Measurement};
use crate::config::ResolvedConfig;
use crate::error::BenchmarkError;
use crate::matrix::ParameterBinding;
use crate::unit::{CommandHooks, CommandLine};

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time a timed-out process gets to exit after SIGTERM before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// How long output is still read after the command itself has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// Maximum number of stderr bytes kept in failure descriptions.
const STDERR_TAIL_BYTES: usize = 2048;

/// Document written to the command's stdin.
#[derive(Serialize)]
struct CommandInput<'a> {
    benchmark: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repetition: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a ParameterBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a ResolvedConfig>,
}

/// What happens to a command's stdout.
#[derive(Debug, Clone, Copy)]
enum Output {
    Capture,
    Discard,
}

/// A program located on disk plus its arguments.
#[derive(Debug, Clone)]
struct ResolvedCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ResolvedCommand {
    /// Resolve `line` the way a shell would, except that programs containing
    /// a path separator are relative to `working_dir`.
    fn resolve(line: &CommandLine, working_dir: &Path) -> Result<Self, BenchmarkError> {
        let not_found = || BenchmarkError::ProgramNotFound {
            program: line.program.clone(),
        };

        let written = Path::new(&line.program);
        let program = if written.components().count() > 1 || written.is_absolute() {
            let candidate = if written.is_absolute() {
                written.to_path_buf()
            } else {
                working_dir.join(written)
            };
            candidate.is_file().then_some(candidate).ok_or_else(not_found)?
        } else {
            std::env::var_os("PATH")
                .and_then(|paths| {
                    std::env::split_paths(&paths)
                        .map(|dir| dir.join(written))
                        .find(|candidate| candidate.is_file())
                })
                .ok_or_else(not_found)?
        };

        Ok(Self {
            program,
            args: line.args.clone(),
        })
    }

    fn display(&self) -> String {
        self.program.display().to_string()
    }
}

/// Benchmark implemented by an external program.
#[derive(Debug)]
pub struct CommandBenchmark {
    name: String,
    working_dir: PathBuf,
    execute: ResolvedCommand,
    setup: Option<ResolvedCommand>,
    teardown: Option<ResolvedCommand>,
    pre_run: Option<ResolvedCommand>,
    post_run: Option<ResolvedCommand>,
    repetition: u32,
}

impl CommandBenchmark {
    /// Construct a command benchmark, checking every program exists.
    pub fn new(
        name: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        hooks: &CommandHooks,
    ) -> Result<Self, BenchmarkError> {
        let working_dir = working_dir.into();
        let resolve_hook = |line: &Option<CommandLine>| {
            line.as_ref()
                .map(|l| ResolvedCommand::resolve(l, &working_dir))
                .transpose()
        };

        Ok(Self {
            name: name.into(),
            execute: ResolvedCommand::resolve(&hooks.execute, &working_dir)?,
            setup: resolve_hook(&hooks.setup)?,
            teardown: resolve_hook(&hooks.teardown)?,
            pre_run: resolve_hook(&hooks.pre_run)?,
            post_run: resolve_hook(&hooks.post_run)?,
            working_dir,
            repetition: 0,
        })
    }

    /// Spawn `command`, feed it `input` and collect what it prints.
    ///
    /// The command leads its own process group. Reading stops once the
    /// command itself has exited, so background processes it leaves behind
    /// (a daemon started by `setup`) never hold the call open. The input is
    /// written on a helper thread, so a `timeout` also fires for a command
    /// that never reads it.
    fn run_command(
        &self,
        command: &ResolvedCommand,
        input: &CommandInput<'_>,
        stdout_mode: Output,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, BenchmarkError> {
        let payload = serde_json::to_vec(input).map_err(|e| BenchmarkError::InvalidOutput {
            message: format!("failed to encode command input: {}", e),
        })?;

        let stdout_stdio = match stdout_mode {
            Output::Capture => Stdio::piped(),
            Output::Discard => Stdio::null(),
        };
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(stdout_stdio)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BenchmarkError::Spawn {
                program: command.display(),
                source: e,
            })?;

        tracing::debug!(
            benchmark = %self.name,
            program = %command.display(),
            pid = child.id(),
            "Spawned benchmark command"
        );

        let stdout = drain(child.stdout.take(), "stdout");
        let stderr = drain(child.stderr.take(), "stderr");
        feed(child.stdin.take(), payload, &self.name);

        let status = wait(&mut child, timeout)?;

        let collect_until = Instant::now() + OUTPUT_GRACE;
        let stdout = stdout.collect(collect_until, None);
        let stderr = stderr.collect(collect_until, Some(STDERR_TAIL_BYTES));

        if !status.success() {
            return Err(BenchmarkError::ExitStatus {
                program: command.display(),
                status: status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }

        Ok(stdout)
    }

    fn run_hook(
        &self,
        hook: &Option<ResolvedCommand>,
        input: &CommandInput<'_>,
    ) -> Result<(), BenchmarkError> {
        match hook {
            Some(command) => self
                .run_command(command, input, Output::Discard, None)
                .map(|_| ()),
            None => Ok(()),
        }
    }

    fn input(&self) -> CommandInput<'_> {
        CommandInput {
            benchmark: &self.name,
            repetition: None,
            parameters: None,
            config: None,
        }
    }
}

impl Benchmark for CommandBenchmark {
    fn execute(
        &mut self,
        binding: &ParameterBinding,
        config: &ResolvedConfig,
    ) -> Result<Measurement, BenchmarkError> {
        let input = CommandInput {
            repetition: Some(self.repetition),
            parameters: Some(binding),
            config: Some(config),
            ..self.input()
        };
        let stdout = self.run_command(&self.execute, &input, Output::Capture, config.timeout())?;

        serde_json::from_slice(&stdout).map_err(|e| BenchmarkError::InvalidOutput {
            message: format!(
                "{} (stdout: {:?})",
                e,
                String::from_utf8_lossy(&stdout[..stdout.len().min(256)])
            ),
        })
    }

    fn setup(
        &mut self,
        binding: &ParameterBinding,
        config: &ResolvedConfig,
    ) -> Result<(), BenchmarkError> {
        let input = CommandInput {
            parameters: Some(binding),
            config: Some(config),
            ..self.input()
        };
        self.run_hook(&self.setup, &input)
    }

    fn teardown(&mut self) -> Result<(), BenchmarkError> {
        self.run_hook(&self.teardown, &self.input())
    }

    fn pre_run(&mut self, repetition: u32) -> Result<(), BenchmarkError> {
        self.repetition = repetition;
        let input = CommandInput {
            repetition: Some(repetition),
            ..self.input()
        };
        self.run_hook(&self.pre_run, &input)
    }

    fn post_run(&mut self, repetition: u32) -> Result<(), BenchmarkError> {
        let input = CommandInput {
            repetition: Some(repetition),
            ..self.input()
        };
        self.run_hook(&self.post_run, &input)
    }
}

/// Pipe output read on a helper thread.
struct Drain {
    chunks: Option<Receiver<Vec<u8>>>,
    stream: &'static str,
}

impl Drain {
    /// Gather output until the pipe closes or `until` passes. Keeps at most
    /// the last `limit` bytes when a limit is given.
    fn collect(self, until: Instant, limit: Option<usize>) -> Vec<u8> {
        let mut buf = Vec::new();
        let Some(chunks) = self.chunks else {
            return buf;
        };

        loop {
            let left = until.saturating_duration_since(Instant::now());
            match chunks.recv_timeout(left) {
                Ok(chunk) => {
                    buf.extend_from_slice(&chunk);
                    if let Some(limit) = limit {
                        let excess = buf.len().saturating_sub(limit);
                        buf.drain(..excess);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!(
                        stream = self.stream,
                        "Pipe still held open by a background process, not waiting for it"
                    );
                    break;
                }
            }
        }
        buf
    }
}

/// Read a child pipe on a helper thread, forwarding chunks as they arrive.
///
/// The thread keeps reading after the receiver is gone so that background
/// processes writing to the pipe never see it closed.
fn drain<R: Read + Send + 'static>(pipe: Option<R>, stream: &'static str) -> Drain {
    let Some(mut pipe) = pipe else {
        return Drain {
            chunks: None,
            stream,
        };
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    // Receiver gone: discard.
                    let _ = tx.send(chunk[..n].to_vec());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(stream, error = %e, "Failed to read command output");
                    break;
                }
            }
        }
    });

    Drain {
        chunks: Some(rx),
        stream,
    }
}

/// Write the input document on a helper thread so a command that never reads
/// it cannot block the caller past its deadline.
fn feed(stdin: Option<ChildStdin>, payload: Vec<u8>, benchmark: &str) {
    let Some(mut stdin) = stdin else {
        return;
    };
    let benchmark = benchmark.to_string();
    thread::spawn(move || {
        // A command that never reads its input closes the pipe early.
        if let Err(e) = stdin.write_all(&payload) {
            tracing::debug!(benchmark = %benchmark, error = %e, "Command did not read its input");
        }
    });
}

/// Wait for `child`, terminating its process group once `timeout` expires.
fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, BenchmarkError> {
    let wait_error = |e: std::io::Error| BenchmarkError::Failed {
        message: format!("failed to wait for benchmark command: {}", e),
    };

    let Some(limit) = timeout else {
        return child.wait().map_err(wait_error);
    };
    let deadline = Instant::now() + limit;

    loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            terminate(child);
            return Err(BenchmarkError::Timeout {
                timeout_ms: limit.as_millis() as u64,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM to the process group, then SIGKILL if the command outlives the
/// grace period.
fn terminate(child: &mut Child) {
    let group = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(group, Signal::SIGTERM) {
        tracing::warn!(pgid = child.id(), error = %e, "Failed to send SIGTERM");
    }

    let start = Instant::now();
    while start.elapsed() < TERMINATE_GRACE {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(pid = child.id(), error = %e, "Failed to poll command");
                break;
            }
        }
        thread::sleep(POLL_INTERVAL);
    }

    tracing::warn!(pgid = child.id(), "Command ignored SIGTERM, killing");
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = child.id(), error = %e, "Failed to send SIGKILL"),
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = child.id(), error = %e, "Failed to reap killed command");
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::value::Value;
    use tempfile::TempDir;

    fn script(dir: &Path, name: &str, body: &str) -> CommandLine {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        CommandLine {
            program: format!("./{}", name),
            args: Vec::new(),
        }
    }

    fn hooks(execute: CommandLine) -> CommandHooks {
        CommandHooks {
            execute,
            setup: None,
            teardown: None,
            pre_run: None,
            post_run: None,
        }
    }

    fn config(extra: Option<(&str, i64)>) -> ResolvedConfig {
        let mut config = Config::builtin_defaults();
        if let Some((key, value)) = extra {
            config = config.with(key, value);
        }
        ResolvedConfig::new(config).unwrap()
    }

    #[test]
    fn test_missing_program_fails_construction() {
        let dir = TempDir::new().unwrap();
        let line = CommandLine {
            program: "./missing.sh".to_string(),
            args: Vec::new(),
        };
        let result = CommandBenchmark::new("x.Missing", dir.path(), &hooks(line));
        assert!(matches!(result, Err(BenchmarkError::ProgramNotFound { .. })));
    }

    #[test]
    fn test_program_found_on_path() {
        let dir = TempDir::new().unwrap();
        let line = CommandLine {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 1".to_string()],
        };
        assert!(CommandBenchmark::new("x.Shell", dir.path(), &hooks(line)).is_ok());
    }

    #[test]
    fn test_execute_parses_stdout() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "measure.sh", r#"echo '{"session_load_time": 0.25}'"#);
        let mut bench = CommandBenchmark::new("x.Measure", dir.path(), &hooks(line)).unwrap();

        let measured = bench.execute(&ParameterBinding::empty(), &config(None)).unwrap();
        let metrics = measured.as_mapping().unwrap();
        assert_eq!(metrics["session_load_time"], Value::Float(0.25));
    }

    #[test]
    fn test_execute_receives_parameters_on_stdin() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "echo_input.sh", "cat");
        let mut bench = CommandBenchmark::new("x.Echo", dir.path(), &hooks(line)).unwrap();
        let binding: ParameterBinding =
            serde_yaml::from_str("traced_applications: 10").unwrap();

        bench.pre_run(3).unwrap();
        let echoed = bench.execute(&binding, &config(None)).unwrap();
        let root = echoed.as_mapping().unwrap();

        assert_eq!(root["benchmark"], Value::from("x.Echo"));
        assert_eq!(root["repetition"], Value::Integer(3));
        assert_eq!(
            root["parameters"].as_mapping().unwrap()["traced_applications"],
            Value::Integer(10)
        );
        assert_eq!(root["config"].as_mapping().unwrap()["runs"], Value::Integer(1));
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "fail.sh", "echo 'sessiond refused' >&2\nexit 3");
        let mut bench = CommandBenchmark::new("x.Fail", dir.path(), &hooks(line)).unwrap();

        let err = bench
            .execute(&ParameterBinding::empty(), &config(None))
            .unwrap_err();
        match err {
            BenchmarkError::ExitStatus { stderr, .. } => assert_eq!(stderr, "sessiond refused"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_output_is_failure() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "garbage.sh", "echo not-json");
        let mut bench = CommandBenchmark::new("x.Garbage", dir.path(), &hooks(line)).unwrap();

        assert!(matches!(
            bench.execute(&ParameterBinding::empty(), &config(None)),
            Err(BenchmarkError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn test_timeout_terminates_command() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "hang.sh", "exec sleep 30");
        let mut bench = CommandBenchmark::new("x.Hang", dir.path(), &hooks(line)).unwrap();

        let start = Instant::now();
        let result = bench.execute(&ParameterBinding::empty(), &config(Some(("timeout_ms", 100))));

        assert!(matches!(result, Err(BenchmarkError::Timeout { timeout_ms: 100 })));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_covers_whole_process_group() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "spawns.sh", "sleep 30 &\nwait");
        let mut bench = CommandBenchmark::new("x.Spawns", dir.path(), &hooks(line)).unwrap();

        let start = Instant::now();
        let result = bench.execute(&ParameterBinding::empty(), &config(Some(("timeout_ms", 100))));

        assert!(matches!(result, Err(BenchmarkError::Timeout { timeout_ms: 100 })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_while_input_unread() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "deaf.sh", "exec sleep 30");
        let mut bench = CommandBenchmark::new("x.Deaf", dir.path(), &hooks(line)).unwrap();
        let config = Config::builtin_defaults()
            .with("timeout_ms", 300)
            .with("payload", "x".repeat(200_000));
        let config = ResolvedConfig::new(config).unwrap();

        let start = Instant::now();
        let result = bench.execute(&ParameterBinding::empty(), &config);

        assert!(matches!(result, Err(BenchmarkError::Timeout { timeout_ms: 300 })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_execute_ignores_background_process_output() {
        let dir = TempDir::new().unwrap();
        let line = script(dir.path(), "detach.sh", "sleep 6 &\necho 1");
        let mut bench = CommandBenchmark::new("x.Detach", dir.path(), &hooks(line)).unwrap();

        let start = Instant::now();
        let measured = bench
            .execute(&ParameterBinding::empty(), &config(Some(("timeout_ms", 500))))
            .unwrap();

        assert_eq!(measured, Value::Integer(1));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_setup_may_leave_daemon_running() {
        let dir = TempDir::new().unwrap();
        let mut all = hooks(script(dir.path(), "measure.sh", "echo 1"));
        all.setup = Some(script(dir.path(), "start_daemon.sh", "sleep 5 &\nexit 0"));
        all.teardown = Some(script(dir.path(), "stop_daemon.sh", "touch stopped"));
        let mut bench = CommandBenchmark::new("x.Daemon", dir.path(), &all).unwrap();

        let start = Instant::now();
        bench.setup(&ParameterBinding::empty(), &config(None)).unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));

        bench.teardown().unwrap();
        assert!(dir.path().join("stopped").exists());
    }

    #[test]
    fn test_hook_failure_keeps_stderr() {
        let dir = TempDir::new().unwrap();
        let mut all = hooks(script(dir.path(), "measure.sh", "echo 1"));
        all.pre_run = Some(script(
            dir.path(),
            "pre.sh",
            "echo ignored\necho 'no session' >&2\nexit 1",
        ));
        let mut bench = CommandBenchmark::new("x.PreRun", dir.path(), &all).unwrap();

        match bench.pre_run(0).unwrap_err() {
            BenchmarkError::ExitStatus { stderr, .. } => assert_eq!(stderr, "no session"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_hooks_run_in_unit_directory() {
        let dir = TempDir::new().unwrap();
        let mut all = hooks(script(dir.path(), "measure.sh", "cat marker"));
        all.pre_run = Some(script(dir.path(), "pre.sh", "echo 7 > marker"));
        all.post_run = Some(script(dir.path(), "post.sh", "rm marker"));
        let mut bench = CommandBenchmark::new("x.Hooks", dir.path(), &all).unwrap();

        bench.pre_run(0).unwrap();
        let measured = bench.execute(&ParameterBinding::empty(), &config(None)).unwrap();
        bench.post_run(0).unwrap();

        assert_eq!(measured, Value::Integer(7));
        assert!(!dir.path().join("marker").exists());
    }

    #[test]
    fn test_stderr_tail_truncates() {
        let long = vec![b'x'; STDERR_TAIL_BYTES + 100];
        assert_eq!(stderr_tail(&long).len(), STDERR_TAIL_BYTES);
    }
}
