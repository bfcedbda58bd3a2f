//! Static analysis with clang-tidy in MSVC compatibility mode

pub mod exclusions;
pub mod msvc;
pub mod sources;
pub mod tidy;

pub use exclusions::{load_codacy_exclusions, Exclusions};
pub use tidy::{run_clang_tidy, TidyReport, TidyRun};

use crate::context::ExecutionContext;
use crate::error::CistepResult;
use crate::exec::ProcessRunner;
use crate::paths;
use crate::ui;

/// What the caller controls per analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Job id embedded in log names
    pub id: String,
    /// Extra compiler flags, whitespace separated
    pub clang_args: Option<String>,
    /// Worker count overriding the configuration
    pub jobs: Option<usize>,
}

/// Detect the compiler version, discover sources and run clang-tidy on each
pub async fn analyze(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    options: &AnalyzeOptions,
) -> CistepResult<TidyReport> {
    let config = &ctx.config.analysis;

    let version = {
        let _group = ui::group(&ctx.ui, "Getting version of MSVC compiler");
        msvc::detect_msc_version(ctx, runner).await?
    };

    let _group = ui::group(&ctx.ui, "Running code analysis");
    let mut patterns = vec![paths::posix_string(&ctx.config.general.work_dir)];
    patterns.extend(config.exclude_paths.iter().cloned());
    let from_codacy = load_codacy_exclusions(&ctx.workspace)?;
    if !from_codacy.is_empty() {
        ui::info(
            &ctx.ui,
            &format!(
                "Using {} exclusion{} from {}: {}",
                from_codacy.len(),
                if from_codacy.len() == 1 { "" } else { "s" },
                exclusions::CODACY_FILE,
                from_codacy.join(", ")
            ),
        );
    }
    patterns.extend(from_codacy);
    let exclusions = Exclusions::new(&patterns)?;

    let files = sources::discover_sources(&ctx.workspace, &config.extensions, &exclusions)?;
    if files.is_empty() {
        ui::warning(&ctx.ui, "No source files found to analyze");
        return Ok(TidyReport::default());
    }

    let run = TidyRun {
        program: ctx.config.toolchain.clang_tidy.clone(),
        header_filter: config.header_filter.clone(),
        compiler_args: config
            .compiler_args
            .iter()
            .map(|arg| arg.replace("{msc_version}", &version))
            .collect(),
        extra_args: options
            .clang_args
            .as_deref()
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        id: options.id.clone(),
        log_dir: ctx.work_dir(),
        workers: options
            .jobs
            .filter(|j| *j > 0)
            .unwrap_or_else(|| config.effective_workers()),
    };

    let report = run_clang_tidy(ctx, runner, &files, &run).await?;
    ui::info(
        &ctx.ui,
        &format!(
            "Analyzed {} files ({} with findings, {} not started)",
            report.logs.len(),
            report.nonzero_exits,
            report.spawn_failures
        ),
    );
    Ok(report)
}
