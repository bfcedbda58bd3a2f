//! cistep - CI job steps for MSBuild/MSVC projects
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use cistep::cli::commands;
use cistep::cli::{Cli, Commands};
use cistep::config::{Config, ConfigManager};
use cistep::context::ExecutionContext;
use cistep::error::CistepResult;
use cistep::ui::{self, UiContext};
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let ui = UiContext::detect();
    match run(&ui).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&ui, &e.to_string());
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug; debug logging of the workflow run forces debug
    let runner_debug = std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1");
    let filter = match verbose {
        _ if runner_debug => EnvFilter::new("cistep=debug"),
        0 => EnvFilter::new("cistep=warn"),
        1 => EnvFilter::new("cistep=info"),
        _ => EnvFilter::new("cistep=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run(ui: &UiContext) -> CistepResult<()> {
    let cli = Cli::parse();

    let workspace = ExecutionContext::workspace_from_env()?;
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::for_workspace(&workspace),
    };
    let config = config_manager.load().await?;

    init_tracing(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    let ctx = ExecutionContext::from_env(workspace, config, ui.clone());

    match cli.command {
        Commands::Build(args) => commands::build(args, &ctx).await,
        Commands::Run(args) => commands::run(args, &ctx).await,
        Commands::Coverage(args) => commands::coverage(args, &ctx).await,
        Commands::Analyze(args) => commands::analyze(args, &ctx).await,
        Commands::Report(args) => commands::report(args, &ctx).await,
        Commands::Provision(args) => commands::provision(args, &ctx).await,
        Commands::Cache(args) => commands::cache(args, &ctx).await,
    }
}
