//! Integration tests for cistep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// Command isolated from the surrounding job environment
    fn cistep(workspace: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cistep");
        cmd.current_dir(workspace.path())
            .env("GITHUB_WORKSPACE", workspace.path())
            .env("RUNNER_TOOL_CACHE", workspace.path().join("tool-cache"))
            .env_remove("GITHUB_ACTIONS")
            .env_remove("CISTEP_CONFIG")
            .env_remove("RUNNER_DEBUG");
        for input in [
            "INPUT_SOLUTION-PATH",
            "INPUT_PROJECTS",
            "INPUT_CONFIGURATION",
            "INPUT_PLATFORM",
            "INPUT_CODACY-TOKEN",
            "INPUT_GITHUB-TOKEN",
            "INPUT_ID",
            "INPUT_CLANG-ARGS",
        ] {
            cmd.env_remove(input);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("CI steps for MSBuild/MSVC projects"));
    }

    #[test]
    fn version_displays() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cistep"));
    }

    #[test]
    fn build_requires_projects() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["build", "--configuration", "Release"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Input required and not supplied: projects"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn projects_read_from_input_variables() {
        let ws = TempDir::new().unwrap();
        // Inputs are accepted; the job environment is missing
        cistep(&ws)
            .env("INPUT_PROJECTS", "a, b")
            .env("INPUT_CONFIGURATION", "Debug")
            .env_remove("GITHUB_REPOSITORY")
            .arg("build")
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_REPOSITORY"));
    }

    #[test]
    fn coverage_requires_codacy_token() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["coverage", "--projects", "a_Test", "--configuration", "Debug"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("codacy-token"));
    }

    #[test]
    fn analyze_requires_id() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .arg("analyze")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Input required and not supplied: id"));
    }

    #[test]
    fn unknown_tool_rejected() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["provision", "cmake"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown tool: cmake"));
    }

    #[test]
    fn cache_list_empty() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found."));
    }

    #[test]
    fn cache_clear_empty() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries to clear."));
    }

    #[test]
    fn cache_dir_from_workspace_config() {
        let ws = TempDir::new().unwrap();
        std::fs::write(
            ws.path().join(".cistep.toml"),
            "[cache]\ndir = \"custom-cache\"\n",
        )
        .unwrap();
        cistep(&ws)
            .args(["-vv", "cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stderr(predicate::str::contains("custom-cache"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let ws = TempDir::new().unwrap();
        cistep(&ws)
            .args(["--config", "missing.toml", "cache", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn invalid_config_rejected() {
        let ws = TempDir::new().unwrap();
        std::fs::write(ws.path().join(".cistep.toml"), "[general\n").unwrap();
        cistep(&ws)
            .args(["cache", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
