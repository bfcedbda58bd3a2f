//! Code coverage with OpenCppCoverage, uploaded to Codecov and Codacy

pub mod cobertura;
pub mod reporter;

use crate::cache::CacheBackend;
use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{EchoSink, FileSink, ProcessRunner};
use crate::http::Fetcher;
use crate::inputs::{BuildFlavor, Secret};
use crate::paths;
use crate::provision::{tools, Provisioner};
use crate::ui;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Inputs of a coverage run
#[derive(Debug, Clone)]
pub struct CoverageOptions {
    /// Solution directory, relative to the workspace
    pub solution_path: String,
    pub projects: Vec<String>,
    pub flavor: BuildFlavor,
    pub codacy_token: Secret,
}

/// Remote services and local resources a coverage run uses
pub struct CoverageServices<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub fetcher: &'a dyn Fetcher,
    pub cache: &'a dyn CacheBackend,
    pub provisioner: &'a Provisioner<'a>,
}

fn with_separator(path: &Path) -> String {
    let mut s = path.display().to_string();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}

/// OpenCppCoverage arguments for one test binary.
///
/// Modules and sources are limited to the solution directory minus its
/// `lib`, `msvc-common` and `test` subdirectories.
pub fn opencppcoverage_args(root: &Path, report: &Path, binary: &str) -> Vec<String> {
    vec![
        format!("--modules={}", with_separator(root)),
        format!("--excluded_modules={}", with_separator(&root.join("lib"))),
        format!("--sources={}", with_separator(root)),
        format!("--excluded_sources={}", with_separator(&root.join("lib"))),
        format!("--excluded_sources={}", with_separator(&root.join("msvc-common"))),
        format!("--excluded_sources={}", with_separator(&root.join("test"))),
        format!("--export_type=cobertura:{}", report.display()),
        "--".to_string(),
        binary.to_string(),
    ]
}

/// Collect coverage for every project and upload the reports
pub async fn coverage(
    ctx: &ExecutionContext,
    services: &CoverageServices<'_>,
    options: &CoverageOptions,
) -> CistepResult<Vec<PathBuf>> {
    let sha = ctx.sha()?.to_string();
    let repository_name = ctx.repository_name()?.to_string();

    let tool = services.provisioner.provision(&tools::opencppcoverage()?).await?;

    let reporter = {
        let _group = ui::group(&ctx.ui, "Loading codacy coverage reporter");
        reporter::prepare(ctx, services.fetcher, services.cache).await?
    };

    let root = ctx.resolve(&options.solution_path);
    let bin_dir = root.join("bin");
    let output_dir = ctx.work_dir().join("output");
    let coverage_dir = ctx.work_dir().join("coverage");
    for dir in [&output_dir, &coverage_dir] {
        std::fs::create_dir_all(dir)
            .map_err(|e| CistepError::io(format!("creating {}", dir.display()), e))?;
    }

    let mut reports = Vec::new();
    for project in &options.projects {
        let _group = ui::group(&ctx.ui, &format!("Getting code coverage for {}", project));
        let binary = options.flavor.binary_name(project);
        let report = coverage_dir.join(format!("{}.xml", binary));

        let sink = FileSink::create_new(
            &output_dir.join(format!("{}.coverage.out", binary)),
            Some(&output_dir.join(format!("{}.coverage.err", binary))),
        )?;
        let request = ctx
            .command(&tool.executable)
            .args(opencppcoverage_args(&root, &report, &binary))
            .cwd(&bin_dir);
        let result = services.runner.run(&request, &sink).await;
        sink.finish()?;
        result?;

        let xml = std::fs::read_to_string(&report)
            .map_err(|e| CistepError::io(format!("reading {}", report.display()), e))?;
        let rewritten =
            cobertura::rewrite(&xml, &repository_name, &ctx.workspace.display().to_string());
        std::fs::write(&report, rewritten)
            .map_err(|e| CistepError::io(format!("writing {}", report.display()), e))?;
        reports.push(report);
    }

    let report_glob = format!("{}/*.xml", paths::posix_string(&coverage_dir));

    {
        let _group = ui::group(&ctx.ui, "Sending coverage to codecov");
        let script = ctx.work_dir().join("codecov.sh");
        services
            .fetcher
            .download(&ctx.config.endpoints.codecov_script, &script)
            .await?;
        let request = ctx
            .command(&ctx.config.toolchain.bash)
            .arg(paths::posix_string(&script))
            .args(["-Z", "-f"])
            .arg(report_glob.as_str());
        services.runner.run(&request, &EchoSink).await?;
    }

    {
        let _group = ui::group(&ctx.ui, "Sending coverage to codacy");
        // Codacy only detects coverage when the language is given
        let request = ctx
            .command(&ctx.config.toolchain.bash)
            .arg(paths::posix_string(&reporter.script))
            .args(["report", "-r"])
            .arg(report_glob.as_str())
            .args(["-l", "CPP", "--commit-uuid"])
            .arg(sha.as_str())
            .env("CODACY_PROJECT_TOKEN", options.codacy_token.expose());
        services.runner.run(&request, &EchoSink).await?;
        reporter::finish(ctx, services.cache, &reporter).await;
    }

    Ok(reports)
}
