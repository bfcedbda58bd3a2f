//! Paths excluded from analysis
//!
//! Exclusions come from the configuration and from the `exclude_paths`
//! lists of `.codacy.yml`. A pattern excludes the matching path and
//! everything below it.

use crate::error::{CistepError, CistepResult};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Name of the Codacy project file at the workspace root
pub const CODACY_FILE: &str = ".codacy.yml";

/// The parts of `.codacy.yml` that affect analysis
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CodacyFile {
    pub exclude_paths: Vec<String>,
    pub engines: HashMap<String, CodacyEngine>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CodacyEngine {
    pub exclude_paths: Vec<String>,
}

impl CodacyFile {
    /// Global exclusions followed by those of the clang-tidy engine
    pub fn clang_tidy_exclusions(&self) -> Vec<String> {
        let mut paths = self.exclude_paths.clone();
        if let Some(engine) = self.engines.get("clang-tidy") {
            paths.extend(engine.exclude_paths.iter().cloned());
        }
        paths
    }
}

/// Read exclusions from `.codacy.yml`; a missing file yields none
pub fn load_codacy_exclusions(workspace: &Path) -> CistepResult<Vec<String>> {
    let path = workspace.join(CODACY_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| CistepError::io(format!("reading {}", path.display()), e))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: CodacyFile = serde_yaml::from_str(&content).map_err(|e| CistepError::ConfigInvalid {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(file.clang_tidy_exclusions())
}

/// Compiled exclusion patterns, matched against workspace-relative paths
#[derive(Debug, Clone)]
pub struct Exclusions {
    set: GlobSet,
}

impl Exclusions {
    pub fn new<I, S>(patterns: I) -> CistepResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = crate::paths::force_posix(pattern.as_ref().trim());
            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() || pattern == "." {
                continue;
            }
            builder.add(compile(pattern)?);
            if !pattern.ends_with("**") {
                builder.add(compile(&format!("{}/**", pattern))?);
            }
        }
        let set = builder
            .build()
            .map_err(|e| CistepError::Pattern(e.to_string()))?;
        Ok(Self { set })
    }

    /// Whether a workspace-relative path is excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.set.is_match(crate::paths::posix_string(relative))
    }
}

fn compile(pattern: &str) -> CistepResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| CistepError::Pattern(format!("{}: {}", pattern, e)))
}
