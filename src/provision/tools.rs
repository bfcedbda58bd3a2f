//! Descriptors of the tools the steps depend on

use super::descriptor::{Archiver, AssetSource, InstallStep, Location, ToolDescriptor};
use crate::error::{CistepError, CistepResult};

/// Names accepted by [`by_name`]
pub const KNOWN_TOOLS: &[&str] = &["opencppcoverage", "codacy-clang-tidy"];

/// OpenCppCoverage, unpacked from its Inno Setup installer
pub fn opencppcoverage() -> CistepResult<ToolDescriptor> {
    ToolDescriptor::builder("opencppcoverage")
        .latest_release("OpenCppCoverage", "OpenCppCoverage", r"-x64-.*\.exe$")
        .step(InstallStep::download(
            "innoextract",
            AssetSource::latest_release("dscharrer", "innoextract", r"-windows\.zip$"),
            Location::work("."),
        ))
        .step(InstallStep::extract_members(
            "innoextract",
            Archiver::SevenZip,
            Location::work("."),
            &["innoextract.exe"],
        ))
        .step(InstallStep::download(
            "installer",
            AssetSource::Resolved,
            Location::work("."),
        ))
        .step(InstallStep::extract(
            "installer",
            Archiver::Innoextract,
            Location::install("."),
        ))
        .bin_dir("app")
        .executable("OpenCppCoverage.exe")
        .add_to_path(true)
        .build()
}

/// Converter from clang-tidy output to Codacy results (a jar)
pub fn codacy_clang_tidy() -> CistepResult<ToolDescriptor> {
    ToolDescriptor::builder("codacy-clang-tidy")
        .latest_release("codacy", "codacy-clang-tidy", r"\.jar$")
        .step(InstallStep::download(
            "jar",
            AssetSource::Resolved,
            Location::install("."),
        ))
        .build()
}

/// Look up a descriptor by tool name
pub fn by_name(name: &str) -> CistepResult<ToolDescriptor> {
    match name {
        "opencppcoverage" => opencppcoverage(),
        "codacy-clang-tidy" => codacy_clang_tidy(),
        other => Err(CistepError::UnknownTool(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{Discovery, Executable};

    #[test]
    fn known_tools_build() {
        for name in KNOWN_TOOLS {
            let tool = by_name(name).unwrap();
            assert_eq!(tool.name, *name);
        }
    }

    #[test]
    fn unknown_tool_rejected() {
        assert!(matches!(by_name("cmake"), Err(CistepError::UnknownTool(_))));
    }

    #[test]
    fn opencppcoverage_layout() {
        let tool = opencppcoverage().unwrap();
        assert!(tool.add_to_path);
        assert_eq!(tool.bin_dir.as_deref(), Some(std::path::Path::new("app")));
        assert_eq!(
            tool.executable,
            Executable::File("OpenCppCoverage.exe".into())
        );
        assert_eq!(tool.install_steps.len(), 4);
        assert!(matches!(tool.discovery, Discovery::LatestRelease { .. }));
    }
}
