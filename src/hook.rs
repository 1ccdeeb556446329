//! Top-level dispatcher: runs the Android and iOS mergers for the platforms
//! present in the project, concurrently, and joins them into one result.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    android,
    config::HookConfig,
    error::Error,
    ios::{self, IosReport},
    types::Platform,
};

/// Folder whose subdirectories name the installed build platforms.
pub const PLATFORMS_DIR: &str = "platforms";

/// What the build tool hands to the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub project_root: PathBuf,
    /// Active target platforms.
    pub platforms: Vec<Platform>,
}

impl HookContext {
    pub fn new(project_root: impl Into<PathBuf>, platforms: Vec<Platform>) -> Self {
        HookContext {
            project_root: project_root.into(),
            platforms,
        }
    }

    /// A context for every platform installed under `<root>/platforms/`.
    pub async fn discover(project_root: impl Into<PathBuf>) -> Result<Self, Error> {
        let project_root = project_root.into();
        let platforms = installed_platforms(&project_root).await?;
        Ok(HookContext::new(project_root, platforms))
    }

    fn has(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

/// Platforms with a directory under `<root>/platforms/`, in [`Platform::ALL`]
/// order. A missing `platforms` folder means none.
pub async fn installed_platforms(project_root: &Path) -> Result<Vec<Platform>, Error> {
    let dir = project_root.join(PLATFORMS_DIR);
    let mut installed = Vec::new();
    for platform in Platform::ALL {
        let path = dir.join(platform.as_str());
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => installed.push(platform),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io_at(&path, e)),
        }
    }
    debug!("Installed platforms: {:?}", installed);
    Ok(installed)
}

/// Everything one invocation wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `strings.xml` files written, sorted.
    pub android: Vec<PathBuf>,
    /// `None` when iOS was not an active platform.
    pub ios: Option<IosReport>,
}

impl RunReport {
    pub fn files_written(&self) -> usize {
        let ios = self.ios.as_ref().map_or(0, |report| {
            report.tables.len() + usize::from(report.manifest.is_some())
        });
        self.android.len() + ios
    }
}

/// Runs every active platform. The first failure fails the whole invocation.
pub async fn run(context: &HookContext, config: Arc<HookConfig>) -> Result<RunReport, Error> {
    let android_task = {
        let config = Arc::clone(&config);
        let enabled = context.has(Platform::Android);
        async move {
            if enabled {
                android::run(&config).await
            } else {
                Ok(Vec::new())
            }
        }
    };
    let ios_task = {
        let config = Arc::clone(&config);
        let enabled = context.has(Platform::Ios);
        async move {
            if enabled {
                ios::run(&config).await.map(Some)
            } else {
                Ok(None)
            }
        }
    };

    let (android, ios) = tokio::try_join!(android_task, ios_task)?;
    let report = RunReport { android, ios };
    info!(
        "Localization complete: {} file(s) written for {:?}",
        report.files_written(),
        context.platforms
    );
    Ok(report)
}
