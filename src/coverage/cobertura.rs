//! Cobertura report cleanup
//!
//! OpenCppCoverage writes absolute Windows paths below a drive-letter
//! `<source>`. Upload services expect paths relative to the repository
//! root, so reports are rewritten before upload.

use crate::paths;
use regex::{NoExpand, Regex};
use std::sync::OnceLock;

fn source_element() -> &'static Regex {
    static SOURCE: OnceLock<Regex> = OnceLock::new();
    SOURCE.get_or_init(|| Regex::new(r"<source>[^<]*</source>").expect("valid source regex"))
}

/// Rewrite a report to repository-relative, forward-slash paths.
///
/// The first `<source>` becomes `repository_name`; the workspace prefix is
/// stripped both with and without its drive or root. Applying the rewrite
/// to its own output changes nothing.
pub fn rewrite(xml: &str, repository_name: &str, workspace: &str) -> String {
    let posix = xml.replace('\\', "/");
    let source = format!("<source>{}</source>", repository_name);
    let mut out = source_element()
        .replace(&posix, NoExpand(&source))
        .into_owned();

    let workspace = paths::force_posix(workspace);
    let workspace = paths::trim_trailing_separators(&workspace);
    if workspace.is_empty() || workspace == "/" {
        return out;
    }

    out = out.replace(&format!("{}/", workspace), "");
    let rootless = strip_root(workspace);
    if !rootless.is_empty() && rootless != workspace {
        out = out.replace(&format!("{}/", rootless), "");
    }
    out
}

/// `D:/a/repo/repo` -> `a/repo/repo`, `/home/runner/work` -> `home/runner/work`
fn strip_root(path: &str) -> &str {
    let bytes = path.as_bytes();
    let without_drive = if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[2..]
    } else {
        path
    };
    without_drive.trim_start_matches('/')
}
