//! Execution context shared by every step
//!
//! The runner environment is read exactly once, in [`ExecutionContext::from_env`].
//! Steps receive the context explicitly and never look at process globals,
//! which keeps them testable against a temporary workspace.

use crate::config::Config;
use crate::error::{CistepError, CistepResult};
use crate::exec::ProcessRequest;
use crate::paths;
use crate::ui::UiContext;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Everything a step needs to know about the job it runs in
#[derive(Debug)]
pub struct ExecutionContext {
    /// Checkout root (`GITHUB_WORKSPACE`)
    pub workspace: PathBuf,
    /// `owner/name` (`GITHUB_REPOSITORY`)
    pub repository: Option<String>,
    /// Commit under test (`GITHUB_SHA`)
    pub sha: Option<String>,
    /// File the runner reads search path additions from (`GITHUB_PATH`)
    github_path: Option<PathBuf>,
    /// Search path inherited from the runner
    base_path: Option<OsString>,
    /// Directories prepended to the search path of child processes
    path_additions: Mutex<Vec<PathBuf>>,
    /// Loaded configuration
    pub config: Config,
    /// Output mode
    pub ui: UiContext,
}

impl ExecutionContext {
    /// Build a context for an explicit workspace (used by tests and `from_env`)
    pub fn new(workspace: PathBuf, config: Config, ui: UiContext) -> Self {
        Self {
            workspace,
            repository: None,
            sha: None,
            github_path: None,
            base_path: None,
            path_additions: Mutex::new(Vec::new()),
            config,
            ui,
        }
    }

    /// Snapshot the runner environment
    pub fn from_env(workspace: PathBuf, config: Config, ui: UiContext) -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let mut ctx = Self::new(workspace, config, ui);
        ctx.repository = non_empty("GITHUB_REPOSITORY");
        ctx.sha = non_empty("GITHUB_SHA");
        ctx.github_path = non_empty("GITHUB_PATH").map(PathBuf::from);
        ctx.base_path = std::env::var_os("PATH");
        debug!(
            "Context: workspace={} repository={:?} sha={:?}",
            ctx.workspace.display(),
            ctx.repository,
            ctx.sha
        );
        ctx
    }

    /// Workspace root from `GITHUB_WORKSPACE`, else the current directory
    pub fn workspace_from_env() -> CistepResult<PathBuf> {
        match std::env::var_os("GITHUB_WORKSPACE").filter(|v| !v.is_empty()) {
            Some(ws) => Ok(PathBuf::from(ws)),
            None => std::env::current_dir()
                .map_err(|e| CistepError::io("getting current directory", e)),
        }
    }

    /// Set repository and commit (builder style, for tests)
    pub fn with_repository(mut self, repository: &str, sha: &str) -> Self {
        self.repository = Some(repository.to_string());
        self.sha = Some(sha.to_string());
        self
    }

    /// `owner/name`, required by steps that talk to remote services
    pub fn repository(&self) -> CistepResult<&str> {
        self.repository
            .as_deref()
            .ok_or_else(|| CistepError::EnvMissing("GITHUB_REPOSITORY".to_string()))
    }

    /// Repository name without the owner
    pub fn repository_name(&self) -> CistepResult<&str> {
        let repository = self.repository()?;
        Ok(repository
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(repository))
    }

    /// Commit id, required by upload steps
    pub fn sha(&self) -> CistepResult<&str> {
        self.sha
            .as_deref()
            .ok_or_else(|| CistepError::EnvMissing("GITHUB_SHA".to_string()))
    }

    /// Absolute working directory for tools, logs and reports
    pub fn work_dir(&self) -> PathBuf {
        self.workspace.join(&self.config.general.work_dir)
    }

    /// Resolve a workspace-relative path
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        paths::join_relative(&self.workspace, relative.as_ref())
    }

    /// Make a directory available by bare name to later processes.
    ///
    /// Recorded for children of this run and appended to `GITHUB_PATH` so
    /// later steps of the job see it too.
    pub fn add_path(&self, dir: &Path) -> CistepResult<()> {
        {
            let mut additions = self
                .path_additions
                .lock()
                .map_err(|_| CistepError::Internal("search path lock poisoned".to_string()))?;
            if additions.iter().any(|d| d == dir) {
                return Ok(());
            }
            additions.insert(0, dir.to_path_buf());
        }

        if let Some(file) = &self.github_path {
            let mut out = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| CistepError::io(format!("opening {}", file.display()), e))?;
            writeln!(out, "{}", dir.display())
                .map_err(|e| CistepError::io(format!("writing {}", file.display()), e))?;
        }
        debug!("Added {} to search path", dir.display());
        Ok(())
    }

    /// Search path for child processes, additions first
    pub fn search_path(&self) -> Option<OsString> {
        let additions = self.path_additions.lock().ok()?.clone();
        if additions.is_empty() {
            return None;
        }
        let inherited = self
            .base_path
            .as_ref()
            .map(|p| std::env::split_paths(p).collect::<Vec<_>>())
            .unwrap_or_default();
        std::env::join_paths(additions.into_iter().chain(inherited)).ok()
    }

    /// Start a process request rooted at the workspace with the job's search path
    pub fn command(&self, program: impl Into<PathBuf>) -> ProcessRequest {
        let mut request = ProcessRequest::new(program).cwd(self.workspace.clone());
        if let Some(path) = self.search_path() {
            request = request.env("PATH", path);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(dir: &Path) -> ExecutionContext {
        ExecutionContext::new(dir.to_path_buf(), Config::default(), UiContext::plain())
    }

    #[test]
    fn repository_name_strips_owner() {
        let temp = TempDir::new().unwrap();
        let ctx = ctx(temp.path()).with_repository("mbeckh/llamalog", "abc");
        assert_eq!(ctx.repository_name().unwrap(), "llamalog");
        assert_eq!(ctx.sha().unwrap(), "abc");
    }

    #[test]
    fn missing_repository_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = ctx(temp.path()).repository_name().unwrap_err();
        assert!(matches!(err, CistepError::EnvMissing(_)));
    }

    #[test]
    fn work_dir_under_workspace() {
        let temp = TempDir::new().unwrap();
        assert_eq!(ctx(temp.path()).work_dir(), temp.path().join(".cistep"));
    }

    #[test]
    fn add_path_writes_github_path_file() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path());
        let path_file = temp.path().join("github_path");
        ctx.github_path = Some(path_file.clone());

        let tool = temp.path().join("tools").join("app");
        ctx.add_path(&tool).unwrap();
        ctx.add_path(&tool).unwrap();

        let content = std::fs::read_to_string(path_file).unwrap();
        assert_eq!(content, format!("{}\n", tool.display()));

        let search = ctx.search_path().unwrap();
        let first = std::env::split_paths(&search).next().unwrap();
        assert_eq!(first, tool);
    }

    #[test]
    fn no_search_path_override_without_additions() {
        let temp = TempDir::new().unwrap();
        assert!(ctx(temp.path()).search_path().is_none());
        assert!(ctx(temp.path()).command("msbuild").env.is_empty());
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_job_variables() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("GITHUB_REPOSITORY", "mbeckh/llamalog");
        std::env::set_var("GITHUB_SHA", "0123abcd");
        std::env::set_var("GITHUB_PATH", "");

        let ctx = ExecutionContext::from_env(temp.path().to_path_buf(), Config::default(), UiContext::plain());
        std::env::remove_var("GITHUB_REPOSITORY");
        std::env::remove_var("GITHUB_SHA");
        std::env::remove_var("GITHUB_PATH");

        assert_eq!(ctx.repository_name().unwrap(), "llamalog");
        assert_eq!(ctx.sha().unwrap(), "0123abcd");
        assert!(ctx.github_path.is_none());
    }

    #[test]
    #[serial_test::serial]
    fn workspace_prefers_github_workspace() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("GITHUB_WORKSPACE", temp.path());
        let workspace = ExecutionContext::workspace_from_env().unwrap();
        std::env::remove_var("GITHUB_WORKSPACE");
        assert_eq!(workspace, temp.path());
    }
}
