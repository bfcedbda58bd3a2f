//! Path separator normalization
//!
//! The cache service and the Unix tools on the runner (bash, find, the
//! Codecov uploader) only understand forward slashes, while MSBuild and the
//! Windows test binaries want native separators. Paths cross that border in
//! both directions, so every conversion goes through here.

use std::path::{Component, Path, PathBuf};

/// Normalize to forward slashes with `.` and `..` segments resolved.
///
/// `std::path` does not rewrite separators, so backslashes are converted
/// first. A drive (`C:/`, `C:`) or UNC share (`//server/share`) stays part
/// of the root and `..` never climbs above it.
/// Idempotent: `force_posix(force_posix(p)) == force_posix(p)`.
pub fn force_posix(path: &str) -> String {
    let unified = path.replace('\\', "/");
    if unified.is_empty() {
        return ".".to_string();
    }

    let (root, rest) = split_root(&unified);
    let rooted = !root.is_empty();
    let trailing = unified.len() > 1 && unified.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    let mut normalized = match (root.as_str(), joined.is_empty()) {
        ("", true) => ".".to_string(),
        ("", false) => joined,
        (root, true) => root.to_string(),
        (root, false) if root.ends_with(['/', ':']) => format!("{}{}", root, joined),
        (root, false) => format!("{}/{}", root, joined),
    };
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Split a forward-slash path into its root (`//server/share`, `C:/`, `C:`,
/// `/` or nothing) and the remainder
fn split_root(path: &str) -> (String, &str) {
    if let Some(unc) = path
        .strip_prefix("//")
        .filter(|r| !r.is_empty() && !r.starts_with('/'))
    {
        let mut parts = unc.splitn(3, '/');
        let server = parts.next().unwrap_or_default();
        return match (parts.next(), parts.next()) {
            (Some(share), rest) if !share.is_empty() => {
                (format!("//{}/{}", server, share), rest.unwrap_or(""))
            }
            _ => (format!("//{}", server), ""),
        };
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return if bytes.get(2) == Some(&b'/') {
            (path[..3].to_string(), &path[3..])
        } else {
            (path[..2].to_string(), &path[2..])
        };
    }

    match path.strip_prefix('/') {
        Some(rest) => ("/".to_string(), rest),
        None => (String::new(), path),
    }
}

/// Normalize to backslashes, the form Windows tools expect
pub fn force_windows(path: &str) -> String {
    let posix = force_posix(path);
    // Keep drive letters ("C:/x" -> "C:\x") and turn a lone "/" into "\"
    posix.replace('/', "\\")
}

/// Normalize to the separator of the host platform
pub fn force_native(path: &str) -> String {
    if cfg!(windows) {
        force_windows(path)
    } else {
        force_posix(path)
    }
}

/// Remove trailing separators, keeping a root
pub fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..1]
    } else {
        trimmed
    }
}

/// Forward-slash string form of a path
pub fn posix_string(path: &Path) -> String {
    force_posix(&path.to_string_lossy())
}

/// Join a relative path without leaving `.` segments behind
pub fn join_relative(base: &Path, relative: &Path) -> PathBuf {
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(base.to_path_buf(), |path, c| path.join(c))
}

/// Express `path` relative to `base` when it lies below it
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(force_posix(r".cistep\tools\opencppcoverage"), ".cistep/tools/opencppcoverage");
        assert_eq!(force_posix(r"D:\a\repo\repo"), "D:/a/repo/repo");
    }

    #[test]
    fn posix_is_idempotent() {
        for input in [
            r"a\b\..\c",
            r".\x\\y\",
            "/abs/./path/",
            "../up/../../twice",
            r"C:\Program Files (x86)\Tool",
            "",
        ] {
            let once = force_posix(input);
            assert!(!once.contains('\\'), "{} -> {}", input, once);
            assert_eq!(force_posix(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn drive_and_share_stay_in_the_root() {
        assert_eq!(force_posix(r"C:\.."), "C:/");
        assert_eq!(force_posix(r"C:\a\..\..\b"), "C:/b");
        assert_eq!(force_posix("C:"), "C:");
        assert_eq!(force_posix(r"\\server\share\dir\..\file.txt"), "//server/share/file.txt");
        assert_eq!(force_posix(r"\\server\share\.."), "//server/share");
        assert_eq!(force_posix(r"\\server\share\"), "//server/share/");
        assert_eq!(force_windows(r"\\server\share\x"), r"\\server\share\x");
        for input in [r"C:\..", r"\\server\share\a\", "//server", "///abs"] {
            let once = force_posix(input);
            assert_eq!(force_posix(&once), once, "not idempotent for {}", input);
        }
    }

    #[test]
    fn dot_segments_resolved() {
        assert_eq!(force_posix(r"a\b\..\c"), "a/c");
        assert_eq!(force_posix("./x//y"), "x/y");
        assert_eq!(force_posix("../a"), "../a");
        assert_eq!(force_posix("/../a"), "/a");
        assert_eq!(force_posix("a/.."), ".");
    }

    #[test]
    fn trailing_separator_kept() {
        assert_eq!(force_posix(r"bin\"), "bin/");
        assert_eq!(force_posix("/"), "/");
    }

    #[test]
    fn windows_form() {
        assert_eq!(force_windows("src/x/../main.cpp"), r"src\main.cpp");
        assert_eq!(force_windows(r"C:/tools\7z"), r"C:\tools\7z");
    }

    #[test]
    fn join_relative_drops_dot() {
        assert_eq!(join_relative(Path::new("/w"), Path::new(".")), PathBuf::from("/w"));
        assert_eq!(join_relative(Path::new("/w"), Path::new("./a/b")), PathBuf::from("/w/a/b"));
    }

    #[test]
    fn trim_trailing() {
        assert_eq!(trim_trailing_separators("msvc///"), "msvc");
        assert_eq!(trim_trailing_separators(r"sln\"), "sln");
        assert_eq!(trim_trailing_separators("/"), "/");
        assert_eq!(trim_trailing_separators(""), "");
    }

    #[test]
    fn relative_path() {
        let rel = relative_to(Path::new("/ws/src/a.cpp"), Path::new("/ws"));
        assert_eq!(rel, PathBuf::from("src/a.cpp"));
        let outside = relative_to(Path::new("/other/a.cpp"), Path::new("/ws"));
        assert_eq!(outside, PathBuf::from("/other/a.cpp"));
    }
}
