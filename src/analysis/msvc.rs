//! MSVC compiler version detection
//!
//! clang-tidy emulates MSVC via `-fmsc-version`; the value is taken from
//! the installed compiler by preprocessing a file that contains `_MSC_VER`.

use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{CaptureSink, ProcessRunner};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// First compiler driver matching the configured glob
pub fn find_compiler(pattern: &str) -> CistepResult<PathBuf> {
    let mut matches: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| CistepError::Pattern(format!("{}: {}", pattern, e)))?
        .filter_map(Result::ok)
        .collect();
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| CistepError::ProgramNotFound {
            name: "cl.exe".to_string(),
            hint: format!("nothing matches {}", pattern),
        })
}

fn digits() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"([0-9]+)").expect("valid digits regex"))
}

/// Extract the version from preprocessor output
pub fn parse_msc_version(output: &str) -> CistepResult<String> {
    digits()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| CistepError::CompilerVersion(format!("no number in {:?}", output.trim())))
}

/// Ask the compiler for its `_MSC_VER`
pub async fn detect_msc_version(
    ctx: &ExecutionContext,
    runner: &dyn ProcessRunner,
) -> CistepResult<String> {
    let compiler = find_compiler(&ctx.config.toolchain.cl_glob)?;
    let work_dir = ctx.work_dir();
    std::fs::create_dir_all(&work_dir)
        .map_err(|e| CistepError::io(format!("creating {}", work_dir.display()), e))?;

    let probe = work_dir.join("msc-version.cpp");
    std::fs::write(&probe, "_MSC_VER")
        .map_err(|e| CistepError::io(format!("writing {}", probe.display()), e))?;

    let capture = CaptureSink::new();
    let request = ctx
        .command(&compiler)
        .arg("/EP")
        .arg(probe.display().to_string());
    runner.run(&request, &capture).await?;

    let version = parse_msc_version(&capture.stdout())?;
    debug!("{} reports _MSC_VER {}", compiler.display(), version);
    Ok(version)
}
