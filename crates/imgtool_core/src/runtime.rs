use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const STATE_DIR_NAME: &str = ".imgtool";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RootOverrides {
    pub search_root: Option<PathBuf>,
    pub staging_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

/// Where the tool operates: the tree that is searched for documents and the
/// staging root against which local-foreign locators resolve. The staging
/// root defaults to the search root when unspecified.
#[derive(Debug, Clone)]
pub struct ResolvedRoots {
    pub search_root: PathBuf,
    pub staging_root: PathBuf,
    pub config_path: PathBuf,
    pub search_source: ValueSource,
    pub staging_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedRoots {
    pub fn diagnostics(&self) -> String {
        format!(
            "search_root={} ({})\nstaging_root={} ({})\nconfig_path={} ({})",
            normalize_for_display(&self.search_root),
            self.search_source.as_str(),
            normalize_for_display(&self.staging_root),
            self.staging_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

pub fn resolve_roots(
    context: &ResolutionContext,
    overrides: &RootOverrides,
) -> Result<ResolvedRoots> {
    resolve_roots_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_roots_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &RootOverrides,
    lookup_env: F,
) -> Result<ResolvedRoots>
where
    F: Fn(&str) -> Option<String>,
{
    let (search_root, search_source) = if let Some(path) = overrides.search_root.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env("IMGTOOL_SEARCH_ROOT") {
        (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (context.cwd.clone(), ValueSource::Default)
    };

    let (staging_root, staging_source) = if let Some(path) = overrides.staging_root.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env("IMGTOOL_STAGING_ROOT") {
        (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (search_root.clone(), ValueSource::Default)
    };

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env("IMGTOOL_CONFIG") {
        (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (
            search_root.join(STATE_DIR_NAME).join(CONFIG_FILENAME),
            ValueSource::Default,
        )
    };

    Ok(ResolvedRoots {
        search_root,
        staging_root,
        config_path,
        search_source,
        staging_source,
        config_source,
    })
}

/// A missing search root is an unrecoverable setup error; nothing can be
/// discovered or processed.
pub fn ensure_search_root(roots: &ResolvedRoots) -> Result<()> {
    if !roots.search_root.is_dir() {
        bail!(
            "search root does not exist or is not a directory: {}",
            normalize_for_display(&roots.search_root)
        );
    }
    Ok(())
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
