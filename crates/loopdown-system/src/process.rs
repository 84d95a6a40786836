//! Child process execution
//!
//! Every external tool (inventory, caching server locator, pkgutil, curl,
//! installer) runs through [`run`]. Captured output is drained by two tasks
//! so a chatty child never blocks on a full pipe, and a timed out child is
//! asked to stop with SIGTERM before it is killed.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use crate::error::ProcessError;

/// Time between SIGTERM and SIGKILL
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Upper bound on waiting for a killed child to be reaped
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on collecting output after the child exits
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 8192;

/// What to run and how
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    stdin: Option<Vec<u8>>,
    capture: bool,
    check: bool,
    timeout: Option<Duration>,
}

impl ProcessSpec {
    /// The first argument is the program
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
            stdin: None,
            capture: true,
            check: false,
            timeout: None,
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set a variable on top of the inherited environment
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bytes written to the child's stdin, which is then closed
    pub fn stdin(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Capture stdout and stderr; when false the child inherits the parent's streams
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Turn a non-zero exit into [`ProcessError::NonZeroExit`]
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Result of a finished child
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `128 + signal` when the child was terminated by a signal
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub args: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a child process to completion
pub async fn run(spec: ProcessSpec) -> Result<ProcessOutput, ProcessError> {
    let ProcessSpec {
        args,
        cwd,
        env,
        stdin,
        capture,
        check,
        timeout,
    } = spec;

    let program = match args.first() {
        Some(program) if !program.is_empty() => program.clone(),
        _ => return Err(ProcessError::invalid_arguments("no program given")),
    };

    debug!("Running: {}", args.join(" "));

    let mut cmd = Command::new(&program);
    cmd.args(&args[1..]);
    cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    if let Some(dir) = &cwd {
        cmd.current_dir(dir);
    }

    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    if capture {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    cmd.kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::launch_failed(&program, e))?;

    let enabled = Arc::new(AtomicBool::new(true));
    let mut stdout_drain = child
        .stdout
        .take()
        .map(|out| Drain::spawn(out, Arc::clone(&enabled)));
    let mut stderr_drain = child
        .stderr
        .take()
        .map(|err| Drain::spawn(err, Arc::clone(&enabled)));

    // The deadline covers the stdin write as well as the wait.
    let deadline = timeout.map(|limit| (limit, Instant::now() + limit));

    if let Some(payload) = stdin {
        if let Some(pipe) = child.stdin.take() {
            let write = write_stdin(pipe, payload);
            let written = match deadline {
                Some((limit, at)) => match tokio::time::timeout_at(at, write).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("{} did not read its input within {:?}", program, limit);
                        expire(&mut child, &enabled, [&mut stdout_drain, &mut stderr_drain])
                            .await;
                        return Err(ProcessError::TimedOut {
                            timeout: limit,
                            args,
                        });
                    }
                },
                None => write.await,
            };

            if let Err(e) = written {
                enabled.store(false, Ordering::Release);
                let _ = child.start_kill();
                let _ = tokio::time::timeout(REAP_TIMEOUT, child.wait()).await;
                abort_drains([&mut stdout_drain, &mut stderr_drain]);
                return Err(ProcessError::launch_failed(&program, e));
            }
        }
    }

    let status = match deadline {
        Some((limit, at)) => match tokio::time::timeout_at(at, child.wait()).await {
            Ok(status) => status.map_err(|e| ProcessError::launch_failed(&program, e))?,
            Err(_) => {
                warn!("{} timed out after {:?}, terminating", program, limit);
                expire(&mut child, &enabled, [&mut stdout_drain, &mut stderr_drain]).await;
                return Err(ProcessError::TimedOut {
                    timeout: limit,
                    args,
                });
            }
        },
        None => child
            .wait()
            .await
            .map_err(|e| ProcessError::launch_failed(&program, e))?,
    };

    let stdout = match stdout_drain {
        Some(drain) => drain.finish().await,
        None => Vec::new(),
    };
    let stderr = match stderr_drain {
        Some(drain) => drain.finish().await,
        None => Vec::new(),
    };

    let code = exit_code(status);
    debug!("{} exited with code {}", program, code);

    if check && code != 0 {
        return Err(ProcessError::NonZeroExit {
            code,
            args,
            stdout,
            stderr,
        });
    }

    Ok(ProcessOutput {
        code,
        stdout,
        stderr,
        args,
    })
}

/// Exit code, mapping signal termination to `128 + signal`
fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => status.signal().map(|sig| 128 + sig).unwrap_or(-1),
    }
}

/// Write the whole payload, then close the pipe
async fn write_stdin(mut pipe: ChildStdin, payload: Vec<u8>) -> std::io::Result<()> {
    pipe.write_all(&payload).await?;
    pipe.shutdown().await
}

/// Stop collecting output and take the child down after a missed deadline
async fn expire(child: &mut Child, enabled: &AtomicBool, drains: [&mut Option<Drain>; 2]) {
    enabled.store(false, Ordering::Release);
    terminate(child).await;
    abort_drains(drains);
}

/// SIGTERM, a grace period, then SIGKILL and a bounded reap
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let pid = Pid::from_raw(pid as i32);
        if kill(pid, Signal::SIGTERM).is_ok()
            && matches!(
                tokio::time::timeout(TERMINATE_GRACE, child.wait()).await,
                Ok(Ok(_))
            )
        {
            return;
        }
    }

    if let Err(e) = child.start_kill() {
        debug!("Failed to kill child: {}", e);
    }

    if tokio::time::timeout(REAP_TIMEOUT, child.wait()).await.is_err() {
        warn!("Child did not exit within {:?} of being killed", REAP_TIMEOUT);
    }
}

fn abort_drains(drains: [&mut Option<Drain>; 2]) {
    for drain in drains.into_iter().flatten() {
        drain.handle.abort();
    }
}

/// Background reader accumulating one output stream
struct Drain {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl Drain {
    fn spawn<R>(mut reader: R, enabled: Arc<AtomicBool>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let handle = tokio::spawn(async move {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if !enabled.load(Ordering::Acquire) {
                            break;
                        }
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        });

        Self { buffer, handle }
    }

    /// Wait (bounded) for the reader to hit end of stream and take its bytes
    async fn finish(mut self) -> Vec<u8> {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut self.handle)
            .await
            .is_err()
        {
            debug!("Output drain did not finish within {:?}", DRAIN_TIMEOUT);
            self.handle.abort();
        }

        match self.buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessSpec {
        ProcessSpec::new(["/bin/sh", "-c", script])
    }

    #[tokio::test]
    async fn test_captures_both_streams() {
        let output = run(sh("echo out; echo err >&2")).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
        assert_eq!(output.args[0], "/bin/sh");
    }

    #[tokio::test]
    async fn test_empty_arguments() {
        let empty: Vec<String> = Vec::new();
        let err = run(ProcessSpec::new(empty)).await.unwrap_err();
        assert!(matches!(err, ProcessError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run(ProcessSpec::new(["/nonexistent/loopdown-test-tool"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::LaunchFailed { .. }));
    }

    #[tokio::test]
    async fn test_non_zero_exit_unchecked() {
        let output = run(sh("exit 3")).await.unwrap();
        assert_eq!(output.code, 3);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_non_zero_exit_checked() {
        let err = run(sh("echo nope >&2; exit 4").check(true)).await.unwrap_err();
        match err {
            ProcessError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, 4);
                assert_eq!(stderr, b"nope\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signal_exit_code() {
        let output = run(sh("kill -9 $$")).await.unwrap();
        assert_eq!(output.code, 128 + 9);
    }

    #[tokio::test]
    async fn test_stdin_payload() {
        let output = run(ProcessSpec::new(["/bin/cat"]).stdin("hello"))
            .await
            .unwrap();
        assert_eq!(output.stdout, b"hello");
    }

    #[tokio::test]
    async fn test_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let output = run(sh("printf '%s:' \"$LOOPDOWN_TEST\"; pwd")
            .env("LOOPDOWN_TEST", "value")
            .cwd(dir.path()))
        .await
        .unwrap();

        let text = output.stdout_lossy();
        assert!(text.starts_with("value:"));
        let reported = std::path::PathBuf::from(text.trim_start_matches("value:").trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_timeout_terminates_child() {
        let started = std::time::Instant::now();
        let err = run(sh("sleep 30").timeout(Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_covers_unread_stdin() {
        let started = std::time::Instant::now();
        let err = run(sh("sleep 8")
            .stdin(vec![0u8; 4 << 20])
            .timeout(Duration::from_millis(300)))
        .await
        .unwrap_err();

        assert!(matches!(err, ProcessError::TimedOut { .. }), "{:?}", err);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_timed_out_child_is_not_running_afterwards() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

        let err = run(sh(&script).timeout(Duration::from_millis(500)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut { .. }));

        let pid: i32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert_eq!(
            kill(Pid::from_raw(pid), None),
            Err(nix::errno::Errno::ESRCH)
        );
    }

    #[tokio::test]
    async fn test_timeout_escalates_to_kill() {
        let started = std::time::Instant::now();
        let err = run(sh("trap '' TERM; sleep 30").timeout(Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::TimedOut { .. }));
        assert!(started.elapsed() >= TERMINATE_GRACE);
        assert!(started.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_large_output_does_not_block() {
        let output = run(sh("head -c 1048576 /dev/zero")).await.unwrap();
        assert_eq!(output.stdout.len(), 1_048_576);
    }
}
