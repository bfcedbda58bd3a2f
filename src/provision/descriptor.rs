//! Tool descriptors
//!
//! A [`ToolDescriptor`] says where a tool's version comes from and how to
//! install it. The provisioner runs the same algorithm for every tool.

use crate::error::{CistepError, CistepResult};
use regex::Regex;
use std::path::PathBuf;

/// How the version of a tool is discovered
#[derive(Debug, Clone)]
pub enum Discovery {
    /// Ask the registry for the latest release and pick an asset by name.
    /// The asset's id, not the tag, becomes the cache key component.
    LatestRelease {
        owner: String,
        repo: String,
        asset_pattern: String,
    },
    /// Fixed download URL; the pinned version is the key component
    Pinned { version: String, url: String },
}

/// What a download step fetches
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// The asset the tool's own discovery resolved
    Resolved,
    /// An asset of another repository's latest release, looked up only on a miss
    LatestRelease {
        owner: String,
        repo: String,
        asset_pattern: String,
    },
    /// A fixed URL
    Url(String),
}

impl AssetSource {
    pub fn latest_release(owner: &str, repo: &str, asset_pattern: &str) -> Self {
        Self::LatestRelease {
            owner: owner.to_string(),
            repo: repo.to_string(),
            asset_pattern: asset_pattern.to_string(),
        }
    }
}

/// A path below the work dir or below the tool's install dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Work(PathBuf),
    Install(PathBuf),
}

impl Location {
    pub fn work(relative: impl Into<PathBuf>) -> Self {
        Self::Work(relative.into())
    }

    pub fn install(relative: impl Into<PathBuf>) -> Self {
        Self::Install(relative.into())
    }
}

/// External program used to unpack an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archiver {
    /// `7z x -aos -o<dir> <archive> [members]`
    SevenZip,
    /// `<work>/innoextract -e -m --output-dir <dir> <archive>` for Inno Setup installers
    Innoextract,
}

/// One action of an install sequence
#[derive(Debug, Clone)]
pub enum InstallStep {
    /// Fetch a file into `into`, remembered as `label`
    Download {
        label: String,
        source: AssetSource,
        into: Location,
    },
    /// Unpack the download remembered as `label`
    Extract {
        label: String,
        archiver: Archiver,
        into: Location,
        members: Vec<String>,
    },
    /// Move a file or directory
    Relocate { from: Location, to: Location },
}

impl InstallStep {
    pub fn download(label: &str, source: AssetSource, into: Location) -> Self {
        Self::Download {
            label: label.to_string(),
            source,
            into,
        }
    }

    pub fn extract(label: &str, archiver: Archiver, into: Location) -> Self {
        Self::Extract {
            label: label.to_string(),
            archiver,
            into,
            members: Vec::new(),
        }
    }

    /// Extract only the named archive members
    pub fn extract_members(label: &str, archiver: Archiver, into: Location, members: &[&str]) -> Self {
        Self::Extract {
            label: label.to_string(),
            archiver,
            into,
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn relocate(from: Location, to: Location) -> Self {
        Self::Relocate { from, to }
    }
}

/// The file callers run once a tool is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executable {
    /// Path relative to the binary directory
    File(PathBuf),
    /// The resolved asset itself (e.g. a jar), inside the install dir
    ResolvedAsset,
}

/// Everything needed to provision a tool
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub discovery: Discovery,
    pub install_steps: Vec<InstallStep>,
    /// Directory holding the binaries, relative to the install dir
    pub bin_dir: Option<PathBuf>,
    pub executable: Executable,
    /// Register the binary directory on the search path
    pub add_to_path: bool,
}

impl ToolDescriptor {
    pub fn builder(name: &str) -> ToolDescriptorBuilder {
        ToolDescriptorBuilder {
            name: name.to_string(),
            discovery: None,
            install_steps: Vec::new(),
            bin_dir: None,
            executable: Executable::ResolvedAsset,
            add_to_path: false,
        }
    }
}

/// Builder for [`ToolDescriptor`]
#[derive(Debug)]
pub struct ToolDescriptorBuilder {
    name: String,
    discovery: Option<Discovery>,
    install_steps: Vec<InstallStep>,
    bin_dir: Option<PathBuf>,
    executable: Executable,
    add_to_path: bool,
}

impl ToolDescriptorBuilder {
    pub fn latest_release(mut self, owner: &str, repo: &str, asset_pattern: &str) -> Self {
        self.discovery = Some(Discovery::LatestRelease {
            owner: owner.to_string(),
            repo: repo.to_string(),
            asset_pattern: asset_pattern.to_string(),
        });
        self
    }

    pub fn pinned(mut self, version: &str, url: &str) -> Self {
        self.discovery = Some(Discovery::Pinned {
            version: version.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn step(mut self, step: InstallStep) -> Self {
        self.install_steps.push(step);
        self
    }

    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    pub fn executable(mut self, file: impl Into<PathBuf>) -> Self {
        self.executable = Executable::File(file.into());
        self
    }

    pub fn add_to_path(mut self, add: bool) -> Self {
        self.add_to_path = add;
        self
    }

    /// Validate names, patterns and step labels
    pub fn build(self) -> CistepResult<ToolDescriptor> {
        if self.name.is_empty() || self.name.contains(['/', '\\', ',']) {
            return Err(CistepError::Internal(format!(
                "invalid tool name '{}'",
                self.name
            )));
        }
        let discovery = self.discovery.ok_or_else(|| {
            CistepError::Internal(format!("tool {} has no version discovery", self.name))
        })?;

        if let Discovery::LatestRelease { asset_pattern, .. } = &discovery {
            compile_pattern(asset_pattern)?;
        }

        let mut labels: Vec<&str> = Vec::new();
        for step in &self.install_steps {
            match step {
                InstallStep::Download { label, source, .. } => {
                    if let AssetSource::LatestRelease { asset_pattern, .. } = source {
                        compile_pattern(asset_pattern)?;
                    }
                    labels.push(label);
                }
                InstallStep::Extract { label, .. } if !labels.contains(&label.as_str()) => {
                    return Err(CistepError::Internal(format!(
                        "tool {} extracts '{}' before downloading it",
                        self.name, label
                    )));
                }
                _ => {}
            }
        }

        Ok(ToolDescriptor {
            name: self.name,
            discovery,
            install_steps: self.install_steps,
            bin_dir: self.bin_dir,
            executable: self.executable,
            add_to_path: self.add_to_path,
        })
    }
}

/// Compile an asset name pattern
pub fn compile_pattern(pattern: &str) -> CistepResult<Regex> {
    Regex::new(pattern).map_err(|e| CistepError::Pattern(format!("{}: {}", pattern, e)))
}
