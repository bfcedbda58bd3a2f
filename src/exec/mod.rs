//! External process execution
//!
//! Every tool a step drives is described by a [`ProcessRequest`] and run by
//! a [`ProcessRunner`]. Output lines go to an explicit [`OutputSink`]; the
//! caller gets back a [`ProcessOutcome`] with the exit code and duration.

mod sink;
#[cfg(test)]
pub(crate) mod testing;

pub use sink::{CaptureSink, EchoSink, FileSink, NullSink, OutputSink, Stream};

use crate::error::{CistepError, CistepResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Description of one external invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, OsString)>,
    pub stdin: Option<Vec<u8>>,
    /// Report non-zero exit codes in the outcome instead of failing
    pub ignore_exit_code: bool,
}

impl ProcessRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set a variable for the child; values are never logged
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
        self
    }

    pub fn stdin(mut self, data: Vec<u8>) -> Self {
        self.stdin = Some(data);
        self
    }

    pub fn ignore_exit_code(mut self, ignore: bool) -> Self {
        self.ignore_exit_code = ignore;
        self
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub duration: Duration,
}

/// Runs process requests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, streaming output lines into `sink`.
    ///
    /// Fails on spawn errors, signals and, unless the request ignores it,
    /// on a non-zero exit code.
    async fn run(
        &self,
        request: &ProcessRequest,
        sink: &dyn OutputSink,
    ) -> CistepResult<ProcessOutcome>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        request: &ProcessRequest,
        sink: &dyn OutputSink,
    ) -> CistepResult<ProcessOutcome> {
        let command_line = request.display();
        debug!("Executing: {}", command_line);

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CistepError::ProgramNotFound {
                    name: request.program.display().to_string(),
                    hint: "Install it on the runner or set its path in .cistep.toml".to_string(),
                }
            } else {
                CistepError::command_failed(command_line.clone(), e)
            }
        })?;

        // Feed stdin concurrently so a child filling its stdout pipe cannot deadlock us
        let writer = match (child.stdin.take(), &request.stdin) {
            (Some(mut stdin), Some(data)) => {
                let data = data.clone();
                Some(tokio::spawn(async move {
                    let result = stdin.write_all(&data).await;
                    drop(stdin);
                    result
                }))
            }
            _ => None,
        };

        stream_child_output(&mut child, sink).await;

        let status = child
            .wait()
            .await
            .map_err(|e| CistepError::command_failed(command_line.clone(), e))?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(CistepError::io(format!("writing stdin of {}", command_line), e));
                }
                Err(e) => warn!("stdin writer for {} did not finish: {}", command_line, e),
                _ => {}
            }
        }

        let duration = started.elapsed();
        let exit_code = status
            .code()
            .ok_or_else(|| CistepError::ProcessSignaled(command_line.clone()))?;
        debug!("{} exited with {} after {:?}", command_line, exit_code, duration);

        if exit_code != 0 && !request.ignore_exit_code {
            return Err(CistepError::ProcessExit {
                command: request.program.display().to_string(),
                code: exit_code,
            });
        }

        Ok(ProcessOutcome {
            exit_code,
            duration,
        })
    }
}

/// Read one line, lossily decoded, without the line terminator.
///
/// `buf` must persist across calls: `read_until` leaves partial data in it
/// when a `select!` branch is cancelled.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match reader.read_until(b'\n', buf).await {
        Ok(0) if buf.is_empty() => None,
        Ok(_) => {
            let mut end = buf.len();
            while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
                end -= 1;
            }
            let line = String::from_utf8_lossy(&buf[..end]).into_owned();
            buf.clear();
            Some(line)
        }
        Err(_) => None,
    }
}

/// Stream stdout+stderr from a child process into `sink` until both close
async fn stream_child_output(child: &mut tokio::process::Child, sink: &dyn OutputSink) {
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return;
    };

    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            line = next_line(&mut stdout_reader, &mut stdout_buf), if !stdout_done => {
                match line {
                    Some(line) => sink.on_line(Stream::Stdout, &line),
                    None => stdout_done = true,
                }
            }
            line = next_line(&mut stderr_reader, &mut stderr_buf), if !stderr_done => {
                match line {
                    Some(line) => sink.on_line(Stream::Stderr, &line),
                    None => stderr_done = true,
                }
            }
        }
    }
}
