//! Tool provisioning backed by the keyed cache
//!
//! Every tool goes through the same routine:
//!
//! 1. Resolve the version component (release asset id or pinned version)
//! 2. Compute the key `{tool}-{component}`
//! 3. Restore the install directory by exact key
//! 4. On a miss run the install steps and save the result
//!
//! Cache failures are warnings. Only a failing install step is fatal.

pub mod descriptor;
pub mod registry;
pub mod tools;

pub use descriptor::{
    Archiver, AssetSource, Discovery, Executable, InstallStep, Location, ToolDescriptor,
};
pub use registry::{GithubRegistry, Release, ReleaseAsset, ReleaseRegistry};

use crate::cache::{restore_or_warn, save_or_warn, CacheBackend, CacheKey};
use crate::context::ExecutionContext;
use crate::error::{CistepError, CistepResult};
use crate::exec::{EchoSink, ProcessRunner};
use crate::http::{file_name_from_url, Fetcher};
use crate::paths::{self, join_relative};
use crate::ui;
use descriptor::compile_pattern;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Provisioning lifecycle of one tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Unresolved,
    KeyComputed,
    CacheHit,
    CacheMiss,
    Installing,
    Installed,
    CacheSaved,
    InstallFailed,
    Ready,
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A tool ready to run
#[derive(Debug, Clone)]
pub struct ProvisionedTool {
    pub name: String,
    pub key: CacheKey,
    pub install_path: PathBuf,
    pub bin_path: PathBuf,
    pub executable: PathBuf,
    pub cache_hit: bool,
    pub saved: bool,
    /// States passed through, in order
    pub states: Vec<ProvisionState>,
}

/// Version information a descriptor resolved to
#[derive(Debug, Clone)]
struct Resolved {
    component: String,
    label: String,
    asset_name: String,
    asset_url: String,
}

struct Transitions<'t> {
    tool: &'t str,
    states: Vec<ProvisionState>,
}

impl<'t> Transitions<'t> {
    fn new(tool: &'t str) -> Self {
        Self {
            tool,
            states: vec![ProvisionState::Unresolved],
        }
    }

    fn enter(&mut self, next: ProvisionState) {
        if let Some(previous) = self.states.last() {
            debug!("{}: {} -> {}", self.tool, previous, next);
        }
        self.states.push(next);
    }
}

/// Provisions tools for one run.
///
/// Release lookups are memoized per repository for the lifetime of the
/// provisioner.
pub struct Provisioner<'a> {
    ctx: &'a ExecutionContext,
    registry: &'a dyn ReleaseRegistry,
    cache: &'a dyn CacheBackend,
    fetcher: &'a dyn Fetcher,
    runner: &'a dyn ProcessRunner,
    releases: Mutex<HashMap<String, Release>>,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        ctx: &'a ExecutionContext,
        registry: &'a dyn ReleaseRegistry,
        cache: &'a dyn CacheBackend,
        fetcher: &'a dyn Fetcher,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            ctx,
            registry,
            cache,
            fetcher,
            runner,
            releases: Mutex::new(HashMap::new()),
        }
    }

    /// Install directory of a tool
    pub fn install_dir(&self, tool: &ToolDescriptor) -> PathBuf {
        self.ctx.work_dir().join("tools").join(&tool.name)
    }

    /// Make a tool available, from cache when possible
    pub async fn provision(&self, tool: &ToolDescriptor) -> CistepResult<ProvisionedTool> {
        let _group = ui::group(&self.ctx.ui, &format!("Provisioning {}", tool.name));
        let mut states = Transitions::new(&tool.name);

        let resolved = self.resolve(tool).await?;
        let key = CacheKey::for_tool(&tool.name, &resolved.component)?;
        states.enter(ProvisionState::KeyComputed);

        let install_dir = self.install_dir(tool);
        let cache_paths = vec![paths::relative_to(&install_dir, &self.ctx.workspace)];

        // Tool installs never restore from a fallback key
        let restored = restore_or_warn(self.cache, &self.ctx.ui, &cache_paths, &key, &[])
            .await
            .filter(|entry| entry.exact);

        let (cache_hit, saved) = if restored.is_some() {
            states.enter(ProvisionState::CacheHit);
            ui::info(
                &self.ctx.ui,
                &format!("Using cached {} {}", tool.name, resolved.label),
            );
            (true, false)
        } else {
            states.enter(ProvisionState::CacheMiss);
            states.enter(ProvisionState::Installing);
            ui::info(
                &self.ctx.ui,
                &format!("Installing {} {}", tool.name, resolved.label),
            );
            if let Err(e) = self.install(tool, &resolved, &install_dir).await {
                states.enter(ProvisionState::InstallFailed);
                return Err(e);
            }
            states.enter(ProvisionState::Installed);

            let saved = save_or_warn(self.cache, &self.ctx.ui, &cache_paths, &key).await;
            if saved {
                states.enter(ProvisionState::CacheSaved);
            }
            (false, saved)
        };
        states.enter(ProvisionState::Ready);

        let bin_path = match &tool.bin_dir {
            Some(dir) => join_relative(&install_dir, dir),
            None => install_dir.clone(),
        };
        let executable = match &tool.executable {
            Executable::File(file) => bin_path.join(file),
            Executable::ResolvedAsset => install_dir.join(&resolved.asset_name),
        };
        if tool.add_to_path {
            self.ctx.add_path(&bin_path)?;
        }

        Ok(ProvisionedTool {
            name: tool.name.clone(),
            key,
            install_path: install_dir,
            bin_path,
            executable,
            cache_hit,
            saved,
            states: states.states,
        })
    }

    async fn resolve(&self, tool: &ToolDescriptor) -> CistepResult<Resolved> {
        match &tool.discovery {
            Discovery::LatestRelease {
                owner,
                repo,
                asset_pattern,
            } => {
                let release = self.latest_release(owner, repo).await?;
                let pattern = compile_pattern(asset_pattern)?;
                let asset = release.find_asset(&pattern).ok_or_else(|| {
                    CistepError::AssetNotFound {
                        repo: format!("{}/{}", owner, repo),
                        pattern: asset_pattern.clone(),
                    }
                })?;
                debug!(
                    "{}: release {} asset {} (id {})",
                    tool.name,
                    release.display_name(),
                    asset.name,
                    asset.id
                );
                Ok(Resolved {
                    component: asset.id.to_string(),
                    label: release.display_name().to_string(),
                    asset_name: asset.name.clone(),
                    asset_url: asset.browser_download_url.clone(),
                })
            }
            Discovery::Pinned { version, url } => Ok(Resolved {
                component: version.clone(),
                label: version.clone(),
                asset_name: file_name_from_url(url).to_string(),
                asset_url: url.clone(),
            }),
        }
    }

    async fn latest_release(&self, owner: &str, repo: &str) -> CistepResult<Release> {
        let slug = format!("{}/{}", owner, repo);
        let cached = {
            let releases = self
                .releases
                .lock()
                .map_err(|_| CistepError::Internal("release memo lock poisoned".to_string()))?;
            releases.get(&slug).cloned()
        };
        if let Some(release) = cached {
            return Ok(release);
        }

        let release = self.registry.latest_release(owner, repo).await?;
        self.releases
            .lock()
            .map_err(|_| CistepError::Internal("release memo lock poisoned".to_string()))?
            .insert(slug, release.clone());
        Ok(release)
    }

    async fn install(
        &self,
        tool: &ToolDescriptor,
        resolved: &Resolved,
        install_dir: &Path,
    ) -> CistepResult<()> {
        let failed = |e: CistepError| CistepError::install(&tool.name, e);

        if install_dir.exists() {
            std::fs::remove_dir_all(install_dir).map_err(|e| {
                failed(CistepError::io(format!("removing {}", install_dir.display()), e))
            })?;
        }
        std::fs::create_dir_all(install_dir).map_err(|e| {
            failed(CistepError::io(format!("creating {}", install_dir.display()), e))
        })?;

        let mut downloads: HashMap<&str, PathBuf> = HashMap::new();
        for step in &tool.install_steps {
            match step {
                InstallStep::Download {
                    label,
                    source,
                    into,
                } => {
                    let (name, url) = self.asset_for(source, resolved).await.map_err(failed)?;
                    let dest = self.locate(into, install_dir).join(&name);
                    ui::info(&self.ctx.ui, &format!("Downloading {}", url));
                    let bytes = self.fetcher.download(&url, &dest).await.map_err(failed)?;
                    debug!("{}: {} bytes to {}", tool.name, bytes, dest.display());
                    downloads.insert(label.as_str(), dest);
                }
                InstallStep::Extract {
                    label,
                    archiver,
                    into,
                    members,
                } => {
                    let archive = downloads.get(label.as_str()).ok_or_else(|| {
                        CistepError::install(&tool.name, format!("nothing downloaded as '{}'", label))
                    })?;
                    let into = self.locate(into, install_dir);
                    let request = match archiver {
                        Archiver::SevenZip => self
                            .ctx
                            .command(&self.ctx.config.toolchain.sevenzip)
                            .args(["x", "-aos"])
                            .arg(format!("-o{}", into.display()))
                            .arg(archive.display().to_string())
                            .args(members.iter().cloned()),
                        Archiver::Innoextract => self
                            .ctx
                            .command(self.ctx.work_dir().join("innoextract"))
                            .args(["-e", "-m", "--output-dir"])
                            .arg(into.display().to_string())
                            .arg(archive.display().to_string()),
                    };
                    self.runner
                        .run(&request, &EchoSink)
                        .await
                        .map_err(failed)?;
                }
                InstallStep::Relocate { from, to } => {
                    let from = self.locate(from, install_dir);
                    let to = self.locate(to, install_dir);
                    if let Some(parent) = to.parent() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            failed(CistepError::io(format!("creating {}", parent.display()), e))
                        })?;
                    }
                    std::fs::rename(&from, &to).map_err(|e| {
                        failed(CistepError::io(
                            format!("moving {} to {}", from.display(), to.display()),
                            e,
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }

    /// File name and URL a download step fetches
    async fn asset_for(
        &self,
        source: &AssetSource,
        resolved: &Resolved,
    ) -> CistepResult<(String, String)> {
        match source {
            AssetSource::Resolved => Ok((resolved.asset_name.clone(), resolved.asset_url.clone())),
            AssetSource::LatestRelease {
                owner,
                repo,
                asset_pattern,
            } => {
                let release = self.latest_release(owner, repo).await?;
                let pattern = compile_pattern(asset_pattern)?;
                let asset = release.find_asset(&pattern).ok_or_else(|| {
                    CistepError::AssetNotFound {
                        repo: format!("{}/{}", owner, repo),
                        pattern: asset_pattern.clone(),
                    }
                })?;
                Ok((asset.name.clone(), asset.browser_download_url.clone()))
            }
            AssetSource::Url(url) => Ok((file_name_from_url(url).to_string(), url.clone())),
        }
    }

    fn locate(&self, location: &Location, install_dir: &Path) -> PathBuf {
        match location {
            Location::Work(relative) => join_relative(&self.ctx.work_dir(), relative),
            Location::Install(relative) => join_relative(install_dir, relative),
        }
    }
}
