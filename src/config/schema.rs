//! Configuration schema for cistep
//!
//! Configuration is read from `.cistep.toml` at the workspace root. Every
//! section is optional; defaults match the hosted `windows-2019` runner image.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// External program locations
    pub toolchain: ToolchainConfig,

    /// Cache backend settings
    pub cache: CacheConfig,

    /// Static analysis settings
    pub analysis: AnalysisConfig,

    /// Remote service endpoints
    pub endpoints: EndpointsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Working directory for tools, logs and reports, relative to the workspace
    pub work_dir: PathBuf,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(".cistep"),
            log_format: "text".to_string(),
        }
    }
}

/// Locations of the programs each step drives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// MSBuild executable
    pub msbuild: PathBuf,

    /// Glob matching the MSVC compiler driver (first match wins)
    pub cl_glob: String,

    /// clang-tidy executable
    pub clang_tidy: PathBuf,

    /// 7-Zip command line
    pub sevenzip: String,

    /// Java runtime used for codacy-clang-tidy
    pub java: String,

    /// Shell used for the upload scripts
    pub bash: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            msbuild: PathBuf::from(
                r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Enterprise\MSBuild\Current\Bin\MSBuild.exe",
            ),
            cl_glob: r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Enterprise\VC\Tools\MSVC\*\bin\Hostx64\x64\cl.exe"
                .to_string(),
            clang_tidy: PathBuf::from(
                r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Enterprise\VC\Tools\Llvm\x64\bin\clang-tidy.exe",
            ),
            sevenzip: "7z".to_string(),
            java: "java".to_string(),
            bash: "bash".to_string(),
        }
    }
}

/// Cache backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory of the local cache backend.
    /// Defaults to `$RUNNER_TOOL_CACHE/cistep` or the user cache dir.
    pub dir: Option<PathBuf>,
}

/// Static analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum concurrent clang-tidy processes (default: CPU count)
    pub workers: Option<usize>,

    /// Source file extensions to analyze
    pub extensions: Vec<String>,

    /// Paths always excluded besides the work dir
    pub exclude_paths: Vec<String>,

    /// Header filter passed to clang-tidy
    pub header_filter: String,

    /// Compiler flags emulating MSVC, `{msc_version}` is substituted
    pub compiler_args: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: None,
            extensions: ["c", "cc", "cpp", "cxx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_paths: vec!["lib".to_string(), "msvc-common".to_string()],
            header_filter: r"^(?!lib[/\\].*$).*".to_string(),
            compiler_args: [
                "--system-header-prefix=lib/",
                "-Wall",
                "-Wmicrosoft",
                "-fmsc-version={msc_version}",
                "-fms-extensions",
                "-fms-compatibility",
                "-fdelayed-template-parsing",
                "-D_CRT_USE_BUILTIN_OFFSETOF",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AnalysisConfig {
    /// Effective worker count, never zero
    pub fn effective_workers(&self) -> usize {
        self.workers
            .filter(|w| *w > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

/// Remote service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// GitHub REST API base URL
    pub github_api: String,

    /// Codacy API base URL
    pub codacy_api: String,

    /// Bootstrap script of the Codacy coverage reporter
    pub codacy_coverage_script: String,

    /// Codecov bash uploader
    pub codecov_script: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            codacy_api: "https://api.codacy.com".to_string(),
            codacy_coverage_script: "https://coverage.codacy.com/get.sh".to_string(),
            codecov_script: "https://codecov.io/bash".to_string(),
        }
    }
}
