//! CLI argument definitions using clap derive
//!
//! Step inputs fall back to the `INPUT_<NAME>` variables GitHub Actions sets
//! for an action's `with:` block (upper-cased, hyphens kept).

use crate::error::CistepResult;
use crate::inputs::{self, BuildFlavor, Secret};
use crate::ui::UiContext;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cistep - CI steps for MSBuild/MSVC projects
///
/// Builds and tests a Visual Studio solution, collects coverage with
/// OpenCppCoverage, runs clang-tidy and reports results to Codacy.
#[derive(Parser, Debug)]
#[command(name = "cistep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path (default: .cistep.toml in the workspace)
    #[arg(short, long, global = true, env = "CISTEP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build targets of the solution with MSBuild
    Build(BuildArgs),

    /// Run the test binaries of built targets
    Run(RunArgs),

    /// Collect coverage and send it to Codecov and Codacy
    Coverage(CoverageArgs),

    /// Run clang-tidy over the workspace sources
    Analyze(AnalyzeArgs),

    /// Send clang-tidy results to Codacy
    Report(ReportArgs),

    /// Install a tool through the cache and print its location
    Provision(ProvisionArgs),

    /// Manage the local cache
    Cache(CacheArgs),
}

const DEFAULT_PLATFORM: &str = "x64";

/// Which targets of which solution, in which flavor
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Directory containing the solution, relative to the workspace
    #[arg(long, env = "INPUT_SOLUTION-PATH")]
    pub solution_path: Option<String>,

    /// Targets separated by commas, semicolons or newlines
    #[arg(long, env = "INPUT_PROJECTS")]
    pub projects: Option<String>,

    /// Build configuration, e.g. Debug or Release
    #[arg(long, env = "INPUT_CONFIGURATION")]
    pub configuration: Option<String>,

    /// Build platform [default: x64]
    #[arg(long, env = "INPUT_PLATFORM")]
    pub platform: Option<String>,
}

/// Validated [`TargetArgs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub solution_path: String,
    pub projects: Vec<String>,
    pub flavor: BuildFlavor,
}

impl TargetArgs {
    pub fn resolve(&self) -> CistepResult<Targets> {
        let projects = inputs::required("projects", self.projects.clone())?;
        Ok(Targets {
            solution_path: inputs::solution_path(self.solution_path.as_deref()),
            projects: inputs::parse_projects(&projects)?,
            flavor: BuildFlavor {
                configuration: inputs::required("configuration", self.configuration.clone())?,
                platform: self
                    .platform
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .unwrap_or(DEFAULT_PLATFORM)
                    .to_string(),
            },
        })
    }
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Arguments for the coverage command
#[derive(Args, Debug)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Codacy project token
    #[arg(long, env = "INPUT_CODACY-TOKEN", hide_env_values = true)]
    pub codacy_token: Option<String>,

    /// Token for the GitHub releases API
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Id distinguishing the logs of parallel analysis jobs
    #[arg(long, env = "INPUT_ID")]
    pub id: Option<String>,

    /// Extra compiler flags passed to clang-tidy after `--`
    #[arg(long, env = "INPUT_CLANG-ARGS", allow_hyphen_values = true)]
    pub clang_args: Option<String>,

    /// Maximum concurrent clang-tidy processes
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Codacy project token
    #[arg(long, env = "INPUT_CODACY-TOKEN", hide_env_values = true)]
    pub codacy_token: Option<String>,

    /// Token for the GitHub releases API
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Arguments for the provision command
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Tool to install (opencppcoverage, codacy-clang-tidy)
    pub tool: String,

    /// Token for the GitHub releases API
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all cache entries
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Ingest an optional GitHub token, masking it
pub fn optional_secret(ui: &UiContext, value: Option<String>) -> Option<Secret> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| Secret::ingest(ui, v.trim().to_string()))
}
