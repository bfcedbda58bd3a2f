//! Cache command - inspect and clear the local cache backend

use super::local_cache;
use crate::cache::{CacheManifest, LocalCacheBackend};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::context::ExecutionContext;
use crate::error::CistepResult;
use console::style;
use std::io::{self, Write};
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, ctx: &ExecutionContext) -> CistepResult<()> {
    let cache = local_cache(ctx);
    debug!("Cache directory: {}", cache.root().display());

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format),
        CacheAction::Clear { yes } => clear_entries(&cache, yes),
    }
}

/// List all cache entries, newest first
fn list_entries(cache: &LocalCacheBackend, format: OutputFormat) -> CistepResult<()> {
    let entries = cache.entries()?;

    if entries.is_empty() {
        println!("No cache entries found.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_cache_table(&entries),
        OutputFormat::Json => print_cache_json(&entries)?,
        OutputFormat::Plain => print_cache_plain(&entries),
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn print_cache_table(entries: &[CacheManifest]) {
    println!(
        "{:<48} {:>10} {:<24} {:<16}",
        "KEY", "SIZE", "PATHS", "CREATED"
    );
    println!("{}", "-".repeat(100));

    for entry in entries {
        let created = entry.created_at.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<48} {:>10} {:<24} {:<16}",
            style(&entry.key).cyan(),
            format_size(entry.size_bytes),
            entry.paths.join(", "),
            style(created).dim()
        );
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn print_cache_json(entries: &[CacheManifest]) -> CistepResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        key: &'a str,
        version: &'a str,
        paths: &'a [String],
        size_bytes: u64,
        created_at: String,
    }

    let json_entries: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            key: &e.key,
            version: &e.version,
            paths: &e.paths,
            size_bytes: e.size_bytes,
            created_at: e.created_at.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn print_cache_plain(entries: &[CacheManifest]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}

/// Remove every entry after confirmation
fn clear_entries(cache: &LocalCacheBackend, skip_confirm: bool) -> CistepResult<()> {
    let entries = cache.entries()?;

    if entries.is_empty() {
        println!("No cache entries to clear.");
        return Ok(());
    }

    println!("This will remove {} cache entr{}:", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.key);
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = cache.clear()?;
    println!("{} cleared {} cache entr{}", style("✓").green(), removed, if removed == 1 { "y" } else { "ies" });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[tokio::test]
    async fn clear_with_yes_removes_entries() {
        use crate::cache::{CacheBackend, CacheKey};
        let temp = tempfile::TempDir::new().unwrap();
        let workspace = temp.path().join("ws");
        std::fs::create_dir_all(workspace.join("tool")).unwrap();
        std::fs::write(workspace.join("tool/bin"), "x").unwrap();
        let cache = LocalCacheBackend::new(temp.path().join("cache"), workspace);
        cache
            .save(&[std::path::PathBuf::from("tool")], &CacheKey::new("tool-1").unwrap())
            .await
            .unwrap();

        list_entries(&cache, OutputFormat::Json).unwrap();
        clear_entries(&cache, true).unwrap();
        assert!(cache.entries().unwrap().is_empty());
    }
}
