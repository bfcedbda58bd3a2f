//! Step inputs
//!
//! Inputs arrive as command line flags or, inside a workflow, as
//! `INPUT_<NAME>` variables (clap reads both). This module turns the raw
//! strings into typed values.

use crate::error::{CistepError, CistepResult};
use crate::paths;
use crate::ui::{self, UiContext};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A token that must never appear in logs
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    /// Take ownership of a secret and register it with the runner's masker
    pub fn ingest(ui: &UiContext, value: String) -> Self {
        ui::mask(ui, &value);
        Self(value)
    }

    /// Borrow the raw value for a request header or child environment
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Read a required input, rejecting blank values
pub fn required(name: &str, value: Option<String>) -> CistepResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(CistepError::InputMissing(name.to_string())),
    }
}

/// Read a required secret input
pub fn required_secret(ui: &UiContext, name: &str, value: Option<String>) -> CistepResult<Secret> {
    required(name, value).map(|v| Secret::ingest(ui, v))
}

fn project_delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| Regex::new(r"\s*[,;\n]\s*").expect("valid delimiter regex"))
}

/// Split the `projects` input into build target names.
///
/// Accepts `,`, `;` and newlines as delimiters. Blank entries from stray
/// delimiters and repeated names are dropped; first-seen order is kept.
pub fn parse_projects(raw: &str) -> CistepResult<Vec<String>> {
    let mut projects: Vec<String> = Vec::new();
    for name in project_delimiter().split(raw.trim()) {
        let name = name.trim();
        if !name.is_empty() && !projects.iter().any(|p| p == name) {
            projects.push(name.to_string());
        }
    }

    if projects.is_empty() {
        return Err(CistepError::InputMissing("projects".to_string()));
    }
    Ok(projects)
}

/// Normalize the `solution-path` input: native separators, no trailing slash
pub fn solution_path(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(".");
    let posix = paths::force_posix(raw);
    paths::force_native(paths::trim_trailing_separators(&posix))
}

/// Configuration and platform a set of targets is built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFlavor {
    pub configuration: String,
    pub platform: String,
}

impl BuildFlavor {
    /// Suffix the solution appends to debug binaries
    pub fn suffix(&self) -> &'static str {
        if self.configuration == "Debug" {
            "d"
        } else {
            ""
        }
    }

    /// File stem of a target's test binary, e.g. `llamalog_Test_x64d`
    pub fn binary_name(&self, project: &str) -> String {
        format!("{}_{}{}", project, self.platform, self.suffix())
    }
}
