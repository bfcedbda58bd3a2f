//! Concurrent clang-tidy invocations
//!
//! One process per source file, at most `workers` at a time. Each file gets
//! its own log; exit codes are ignored because clang-tidy reports findings
//! through them. A process that cannot be started is a warning and does not
//! stop the other files.

use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{FileSink, ProcessRunner};
use crate::ui;
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parameters shared by every invocation
#[derive(Debug, Clone)]
pub struct TidyRun {
    pub program: PathBuf,
    pub header_filter: String,
    /// Flags after `--`, version already substituted
    pub compiler_args: Vec<String>,
    /// Caller supplied flags appended after the compiler flags
    pub extra_args: Vec<String>,
    /// Distinguishes logs of parallel jobs in one workflow
    pub id: String,
    pub log_dir: PathBuf,
    pub workers: usize,
}

/// Result of a fan-out
#[derive(Debug, Default, Clone)]
pub struct TidyReport {
    /// One log per analyzed file, sorted
    pub logs: Vec<PathBuf>,
    pub nonzero_exits: usize,
    pub spawn_failures: usize,
}

enum Unit {
    Finished { log: PathBuf, exit_code: i32 },
    NotStarted { log: PathBuf },
}

/// Log file name for the `seq`th (1-based) file
pub fn log_name(file: &Path, id: &str, seq: usize) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    format!("clang-tidy-{}-{}-{}.log", stem, id, seq)
}

/// Run clang-tidy over `files` (workspace-relative, sorted)
pub async fn run_clang_tidy(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    files: &[PathBuf],
    run: &TidyRun,
) -> CistepResult<TidyReport> {
    std::fs::create_dir_all(&run.log_dir)
        .map_err(|e| CistepError::io(format!("creating {}", run.log_dir.display()), e))?;
    debug!("Analyzing {} files with {} workers", files.len(), run.workers);

    let results: Vec<CistepResult<Unit>> = stream::iter(files.iter().enumerate())
        .map(|(index, file)| analyze_file(ctx, runner, run, index + 1, file))
        .buffer_unordered(run.workers.max(1))
        .collect()
        .await;

    let mut report = TidyReport::default();
    let mut first_error = None;
    for result in results {
        match result {
            Ok(Unit::Finished { log, exit_code }) => {
                if exit_code != 0 {
                    report.nonzero_exits += 1;
                }
                report.logs.push(log);
            }
            Ok(Unit::NotStarted { log }) => {
                report.spawn_failures += 1;
                report.logs.push(log);
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    report.logs.sort();
    Ok(report)
}

async fn analyze_file(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    run: &TidyRun,
    seq: usize,
    file: &Path,
) -> CistepResult<Unit> {
    let log = run.log_dir.join(log_name(file, &run.id, seq));
    let sink = FileSink::create_new(&log, None)?;

    let request = ctx
        .command(&run.program)
        .arg(format!("--header-filter={}", run.header_filter))
        .arg(file.display().to_string())
        .arg("--")
        .args(run.compiler_args.iter().cloned())
        .args(run.extra_args.iter().cloned())
        .ignore_exit_code(true);

    let result = runner.run(&request, &sink).await;
    sink.finish()?;

    match result {
        Ok(outcome) => {
            debug!(
                "{} finished with {} in {:?}",
                file.display(),
                outcome.exit_code,
                outcome.duration
            );
            Ok(Unit::Finished {
                log,
                exit_code: outcome.exit_code,
            })
        }
        Err(e) => {
            ui::warning(
                &ctx.ui,
                &format!("clang-tidy did not run for {}: {}", file.display(), e),
            );
            Ok(Unit::NotStarted { log })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::testing::FakeRunner;
    use crate::exec::{OutputSink, ProcessOutcome, ProcessRequest, Stream};
    use crate::ui::UiContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn tidy_run(log_dir: PathBuf, workers: usize) -> TidyRun {
        TidyRun {
            program: PathBuf::from("clang-tidy"),
            header_filter: r"^(?!lib[/\\].*$).*".to_string(),
            compiler_args: vec!["-fmsc-version=1928".to_string()],
            extra_args: vec!["-DNDEBUG".to_string()],
            id: "x64".to_string(),
            log_dir,
            workers,
        }
    }

    fn sources(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("src/file{}.cpp", i))).collect()
    }

    #[test]
    fn log_names() {
        assert_eq!(
            log_name(Path::new("src/main.cpp"), "Debug", 3),
            "clang-tidy-main-Debug-3.log"
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let runner = FakeRunner::with(|request, sink| {
            if request.args[1].ends_with("file0.cpp") {
                sink.on_line(Stream::Stdout, "file0.cpp:1:1: warning: something [check]");
                Ok(1)
            } else {
                Err(CistepError::command_failed(
                    "clang-tidy",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                ))
            }
        });

        let files = sources(5);
        let report = run_clang_tidy(&ctx, &runner, &files, &tidy_run(temp.path().join("logs"), 2))
            .await
            .unwrap();

        assert_eq!(report.logs.len(), 5);
        assert_eq!(report.spawn_failures, 4);
        assert_eq!(report.nonzero_exits, 1);
        assert!(report.logs.iter().all(|log| log.is_file()));

        let first = std::fs::read_to_string(temp.path().join("logs/clang-tidy-file0-x64-1.log")).unwrap();
        assert!(first.contains("[check]"));
    }

    #[tokio::test]
    async fn arguments_per_file() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let runner = FakeRunner::ok();

        run_clang_tidy(&ctx, &runner, &sources(1), &tidy_run(temp.path().to_path_buf(), 1))
            .await
            .unwrap();

        let requests = runner.requests();
        assert_eq!(
            requests[0].args,
            vec![
                r"--header-filter=^(?!lib[/\\].*$).*",
                "src/file0.cpp",
                "--",
                "-fmsc-version=1928",
                "-DNDEBUG",
            ]
        );
        assert!(requests[0].ignore_exit_code);
    }

    #[tokio::test]
    async fn existing_log_fails_the_run() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        std::fs::write(temp.path().join("clang-tidy-file1-x64-2.log"), "old").unwrap();
        let runner = FakeRunner::ok();

        let result =
            run_clang_tidy(&ctx, &runner, &sources(3), &tidy_run(temp.path().to_path_buf(), 3)).await;
        assert!(result.is_err());
        // The other files were still analyzed
        assert_eq!(runner.requests().len(), 2);
    }

    struct SlowRunner {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl crate::exec::ProcessRunner for SlowRunner {
        async fn run(
            &self,
            _request: &ProcessRequest,
            _sink: &dyn OutputSink,
        ) -> CistepResult<ProcessOutcome> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(ProcessOutcome {
                exit_code: 0,
                duration: Duration::from_millis(20),
            })
        }
    }

    #[tokio::test]
    async fn concurrency_bounded_by_workers() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let runner = SlowRunner {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        let report = run_clang_tidy(&ctx, &runner, &sources(8), &tidy_run(temp.path().to_path_buf(), 3))
            .await
            .unwrap();

        assert_eq!(report.logs.len(), 8);
        let peak = runner.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {}", peak);
        assert!(peak >= 2, "peak concurrency {}", peak);
    }
}
