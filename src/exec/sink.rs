//! Output sinks for child process lines

use crate::error::{CistepError, CistepResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Receives every line a child process prints
pub trait OutputSink: Send + Sync {
    fn on_line(&self, stream: Stream, line: &str);
}

/// Discards all output
pub struct NullSink;

impl OutputSink for NullSink {
    fn on_line(&self, _stream: Stream, _line: &str) {}
}

/// Echoes output into the step log
pub struct EchoSink;

impl OutputSink for EchoSink {
    fn on_line(&self, stream: Stream, line: &str) {
        match stream {
            Stream::Stdout => println!("{}", line),
            Stream::Stderr => eprintln!("{}", line),
        }
    }
}

/// Collects stdout in memory, stderr is dropped
#[derive(Default)]
pub struct CaptureSink {
    stdout: Mutex<String>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far, one line per `\n`
    pub fn stdout(&self) -> String {
        self.stdout.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OutputSink for CaptureSink {
    fn on_line(&self, stream: Stream, line: &str) {
        if stream == Stream::Stdout {
            if let Ok(mut out) = self.stdout.lock() {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

struct LogFile {
    path: PathBuf,
    file: File,
}

/// Writes stdout (and optionally stderr) to log files.
///
/// Write errors do not interrupt the child; the first one is reported by
/// [`FileSink::finish`].
pub struct FileSink {
    stdout: Mutex<LogFile>,
    stderr: Option<Mutex<LogFile>>,
    error: Mutex<Option<CistepError>>,
}

impl FileSink {
    /// Create the log files, failing if either already exists
    pub fn create_new(stdout: &Path, stderr: Option<&Path>) -> CistepResult<Self> {
        let open = |path: &Path| -> CistepResult<Mutex<LogFile>> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CistepError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
            let file = OpenOptions::new()
                .append(true)
                .create_new(true)
                .open(path)
                .map_err(|e| CistepError::io(format!("creating log file {}", path.display()), e))?;
            Ok(Mutex::new(LogFile {
                path: path.to_path_buf(),
                file,
            }))
        };

        Ok(Self {
            stdout: open(stdout)?,
            stderr: stderr.map(open).transpose()?,
            error: Mutex::new(None),
        })
    }

    /// Flush and surface the first write failure, if any
    pub fn finish(self) -> CistepResult<()> {
        for log in std::iter::once(self.stdout).chain(self.stderr) {
            let mut log = log
                .into_inner()
                .map_err(|_| CistepError::Internal("log file lock poisoned".to_string()))?;
            let path = log.path.clone();
            log.file
                .flush()
                .map_err(|e| CistepError::io(format!("flushing {}", path.display()), e))?;
        }
        match self.error.into_inner() {
            Ok(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn record(&self, err: CistepError) {
        if let Ok(mut slot) = self.error.lock() {
            slot.get_or_insert(err);
        }
    }
}

impl OutputSink for FileSink {
    fn on_line(&self, stream: Stream, line: &str) {
        let target = match (stream, &self.stderr) {
            (Stream::Stderr, Some(stderr)) => stderr,
            (Stream::Stderr, None) => return,
            (Stream::Stdout, _) => &self.stdout,
        };
        let Ok(mut log) = target.lock() else {
            return;
        };
        if let Err(e) = writeln!(log.file, "{}", line) {
            let context = format!("writing {}", log.path.display());
            drop(log);
            self.record(CistepError::io(context, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn capture_keeps_stdout_only() {
        let sink = CaptureSink::new();
        sink.on_line(Stream::Stdout, "1929");
        sink.on_line(Stream::Stderr, "msc-version.cpp");
        assert_eq!(sink.stdout(), "1929\n");
    }

    #[test]
    fn file_sink_splits_streams() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("logs").join("t.out");
        let err = temp.path().join("logs").join("t.err");

        let sink = FileSink::create_new(&out, Some(&err)).unwrap();
        sink.on_line(Stream::Stdout, "passed");
        sink.on_line(Stream::Stderr, "warning");
        sink.finish().unwrap();

        assert_eq!(std::fs::read_to_string(out).unwrap(), "passed\n");
        assert_eq!(std::fs::read_to_string(err).unwrap(), "warning\n");
    }

    #[test]
    fn file_sink_refuses_existing_file() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("t.out");
        std::fs::write(&out, "old").unwrap();

        assert!(FileSink::create_new(&out, None).is_err());
    }

    #[test]
    fn file_sink_without_stderr_drops_it() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("tidy.log");

        let sink = FileSink::create_new(&out, None).unwrap();
        sink.on_line(Stream::Stderr, "noise");
        sink.on_line(Stream::Stdout, "a.cpp:1:1: warning: x");
        sink.finish().unwrap();

        assert_eq!(
            std::fs::read_to_string(out).unwrap(),
            "a.cpp:1:1: warning: x\n"
        );
    }
}
