//! Run command - execute test binaries with output captured to files

use crate::cli::args::{RunArgs, Targets};
use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{FileSink, ProcessRunner, SystemRunner};
use crate::ui;
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let targets = args.targets.resolve()?;
    run_tests(ctx, &SystemRunner::new(), &targets).await
}

/// Run each target's binary from `<solution>/bin`.
///
/// Output goes to `<work>/output/<binary>.out` and `.err`; existing logs
/// are never overwritten. The first failing binary stops the run.
pub async fn run_tests(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
    targets: &Targets,
) -> CistepResult<()> {
    let bin_dir = ctx.resolve(&targets.solution_path).join("bin");
    let output_dir = ctx.work_dir().join("output");
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| CistepError::io(format!("creating {}", output_dir.display()), e))?;

    for project in &targets.projects {
        let _group = ui::group(&ctx.ui, &format!("Running {}", project));
        let binary = targets.flavor.binary_name(project);
        let sink = FileSink::create_new(
            &output_dir.join(format!("{}.out", binary)),
            Some(&output_dir.join(format!("{}.err", binary))),
        )?;

        let request = ctx.command(bin_dir.join(&binary)).cwd(&bin_dir);
        let result = runner.run(&request, &sink).await;
        sink.finish()?;
        let outcome = result?;
        debug!("{} exited after {:?}", binary, outcome.duration);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::testing::FakeRunner;
    use crate::exec::Stream;
    use crate::inputs::BuildFlavor;
    use crate::ui::UiContext;
    use tempfile::TempDir;

    fn targets(configuration: &str) -> Targets {
        Targets {
            solution_path: ".".to_string(),
            projects: vec!["a_Test".to_string(), "b_Test".to_string()],
            flavor: BuildFlavor {
                configuration: configuration.to_string(),
                platform: "x64".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn output_written_per_binary() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let runner = FakeRunner::with(|request, sink| {
            let name = request.program.file_name().unwrap().to_string_lossy().into_owned();
            sink.on_line(Stream::Stdout, &format!("[==========] {} passed", name));
            sink.on_line(Stream::Stderr, "note");
            Ok(0)
        });

        run_tests(&ctx, &runner, &targets("Debug")).await.unwrap();

        let output = ctx.work_dir().join("output");
        let out = std::fs::read_to_string(output.join("a_Test_x64d.out")).unwrap();
        assert_eq!(out, "[==========] a_Test_x64d passed\n");
        assert_eq!(std::fs::read_to_string(output.join("b_Test_x64d.err")).unwrap(), "note\n");

        let requests = runner.requests();
        assert_eq!(requests[0].program, temp.path().join("bin").join("a_Test_x64d"));
        assert_eq!(requests[0].cwd, Some(temp.path().join("bin")));
    }

    #[tokio::test]
    async fn failing_binary_stops_the_run() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let runner = FakeRunner::with(|_, _| Ok(3));

        let err = run_tests(&ctx, &runner, &targets("Release")).await.unwrap_err();
        assert!(matches!(err, CistepError::ProcessExit { code: 3, .. }));
        assert_eq!(runner.requests().len(), 1);
    }

    #[tokio::test]
    async fn existing_output_is_an_error() {
        let temp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        let output = ctx.work_dir().join("output");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("a_Test_x64.out"), "earlier run").unwrap();

        let runner = FakeRunner::ok();
        assert!(run_tests(&ctx, &runner, &targets("Release")).await.is_err());
        assert!(runner.requests().is_empty());
    }
}
