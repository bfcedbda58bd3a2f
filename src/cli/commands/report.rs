//! Report command - convert clang-tidy logs and send them to Codacy

use super::{github_registry, local_cache};
use crate::cli::args::{optional_secret, ReportArgs};
use crate::codacy::CodacyClient;
use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{CaptureSink, ProcessRunner, SystemRunner};
use crate::http::HttpClient;
use crate::inputs;
use crate::provision::{tools, Provisioner};
use crate::ui;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of the per-file logs written by `cistep analyze`
const LOG_PREFIX: &str = "clang-tidy-";

/// Execute the report command
pub async fn execute(args: ReportArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let token = inputs::required_secret(&ctx.ui, "codacy-token", args.codacy_token)?;
    let github_token = optional_secret(&ctx.ui, args.github_token);

    let http = HttpClient::new();
    let runner = SystemRunner::new();
    let cache = local_cache(ctx);
    let registry = github_registry(ctx, &http, github_token);
    let provisioner = Provisioner::new(ctx, &registry, &cache, &http, &runner);
    let codacy = CodacyClient::new(http.clone(), &ctx.config.endpoints.codacy_api, token);

    report(ctx, &runner, &provisioner, &codacy).await?;
    Ok(())
}

/// Analysis logs in `dir`, sorted by name
pub fn collect_logs(dir: &Path) -> CistepResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CistepError::io(format!("reading {}", dir.display()), e))?;
    let mut logs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                    name.starts_with(LOG_PREFIX) && name.ends_with(".log")
                })
        })
        .collect();
    logs.sort();
    Ok(logs)
}

/// Converter output with doubled backslashes turned into forward slashes
pub fn normalize_results(json: &str) -> String {
    json.replace("\\\\", "/")
}

/// Convert all logs with codacy-clang-tidy and upload the result.
///
/// Returns the path of the merged results file.
pub async fn report(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    provisioner: &Provisioner<'_>,
    codacy: &CodacyClient,
) -> CistepResult<PathBuf> {
    let sha = ctx.sha()?.to_string();
    let tool = provisioner.provision(&tools::codacy_clang_tidy()?).await?;

    let _group = ui::group(&ctx.ui, "Sending code analysis to codacy");
    let work_dir = ctx.work_dir();
    let logs = collect_logs(&work_dir)?;
    if logs.is_empty() {
        ui::warning(&ctx.ui, "No clang-tidy logs found, sending empty results");
    }

    let mut input = Vec::new();
    for log in &logs {
        debug!("Adding {}", log.display());
        let content = std::fs::read(log)
            .map_err(|e| CistepError::io(format!("reading {}", log.display()), e))?;
        input.extend_from_slice(&content);
    }

    let capture = CaptureSink::new();
    let request = ctx
        .command(&ctx.config.toolchain.java)
        .arg("-jar")
        .arg(tool.executable.display().to_string())
        .stdin(input);
    runner.run(&request, &capture).await?;

    let results = normalize_results(&capture.stdout());
    let results_path = work_dir.join("clang-tidy.json");
    std::fs::write(&results_path, &results)
        .map_err(|e| CistepError::io(format!("writing {}", results_path.display()), e))?;
    info!("Converted {} log(s) into {}", logs.len(), results_path.display());

    codacy.upload_results(&sha, results.into_bytes()).await?;
    codacy.finalize(&sha).await?;
    Ok(results_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCacheBackend;
    use crate::config::Config;
    use crate::exec::testing::FakeRunner;
    use crate::exec::Stream;
    use crate::http::testing::FakeFetcher;
    use crate::inputs::Secret;
    use crate::provision::registry::testing::FakeRegistry;
    use crate::ui::UiContext;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn logs_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        for name in [
            "clang-tidy-b-1-0.log",
            "clang-tidy-a-1-1.log",
            "clang-tidy.json",
            "msc-version.cpp",
        ] {
            std::fs::write(temp.path().join(name), "").unwrap();
        }
        std::fs::create_dir(temp.path().join("clang-tidy-dir.log")).unwrap();

        let logs = collect_logs(temp.path()).unwrap();
        let names: Vec<_> = logs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clang-tidy-a-1-1.log", "clang-tidy-b-1-0.log"]);
    }

    #[test]
    fn doubled_backslashes_become_slashes() {
        assert_eq!(
            normalize_results(r#"{"filename":"src\\a.cpp"}"#),
            r#"{"filename":"src/a.cpp"}"#
        );
        assert_eq!(normalize_results(r#""\n""#), r#""\n""#);
    }

    #[tokio::test]
    async fn logs_converted_and_uploaded() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain())
            .with_repository("o/r", "cafe");
        let work = ctx.work_dir();
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("clang-tidy-b-1-0.log"), "second\n").unwrap();
        std::fs::write(work.join("clang-tidy-a-1-0.log"), "first\n").unwrap();

        let registry = FakeRegistry::default();
        registry.publish("codacy", "codacy-clang-tidy", "1.3", "codacy-clang-tidy-1.3.jar", 7);
        let cache = LocalCacheBackend::new(temp.path().join("cache"), temp.path().to_path_buf());
        let fetcher = FakeFetcher::default();
        let runner = FakeRunner::with(|request, sink| {
            if request.program == PathBuf::from("java") {
                let stdin = String::from_utf8(request.stdin.clone().unwrap_or_default()).unwrap();
                assert_eq!(stdin, "first\nsecond\n");
                sink.on_line(Stream::Stdout, r#"{"filename":"src\\a.cpp"}"#);
            }
            Ok(0)
        });
        let provisioner = Provisioner::new(&ctx, &registry, &cache, &fetcher, &runner);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2.0/commit/cafe/issuesRemoteResults"))
            .and(header("project-token", "tok"))
            .and(body_string("{\"filename\":\"src/a.cpp\"}\n"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2.0/commit/cafe/resultsFinal"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        let codacy = CodacyClient::new(
            HttpClient::new(),
            &server.uri(),
            Secret::ingest(&ctx.ui, "tok".to_string()),
        );

        let results = report(&ctx, &runner, &provisioner, &codacy).await.unwrap();
        assert_eq!(results, work.join("clang-tidy.json"));
        assert_eq!(
            std::fs::read_to_string(&results).unwrap(),
            "{\"filename\":\"src/a.cpp\"}\n"
        );

        let requests = runner.requests();
        let java = requests.iter().find(|r| r.program == PathBuf::from("java")).unwrap();
        assert_eq!(java.args[0], "-jar");
        assert!(java.args[1].ends_with("codacy-clang-tidy-1.3.jar"));
    }

    #[tokio::test]
    async fn converter_failure_skips_upload() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain())
            .with_repository("o/r", "cafe");
        std::fs::create_dir_all(ctx.work_dir()).unwrap();

        let registry = FakeRegistry::default();
        registry.publish("codacy", "codacy-clang-tidy", "1.3", "codacy-clang-tidy-1.3.jar", 7);
        let cache = LocalCacheBackend::new(temp.path().join("cache"), temp.path().to_path_buf());
        let fetcher = FakeFetcher::default();
        let runner = FakeRunner::with(|request, _| {
            Ok(if request.program == PathBuf::from("java") { 1 } else { 0 })
        });
        let provisioner = Provisioner::new(&ctx, &registry, &cache, &fetcher, &runner);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let codacy = CodacyClient::new(
            HttpClient::new(),
            &server.uri(),
            Secret::ingest(&ctx.ui, "tok".to_string()),
        );

        assert!(report(&ctx, &runner, &provisioner, &codacy).await.is_err());
        assert!(!ctx.work_dir().join("clang-tidy.json").exists());
    }
}
