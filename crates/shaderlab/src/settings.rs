//! Layers CLI flags (which already include their environment variables) over
//! `shaderlab.toml` over built-in defaults, producing the absolute directories
//! and listener address the server runs with.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use labconfig::LabConfig;
use shaderstore::DEFAULT_TTL;
use tracing::debug;

use crate::cli::{ServeArgs, StorageArgs};
use crate::paths::{AppPaths, PathExpander};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5173;
const DEFAULT_SHADERS_DIR: &str = "src/shaders";
const DEFAULT_STATIC_DIR: &str = "src";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub config_file: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub project_root: PathBuf,
    pub shaders_dir: PathBuf,
    pub static_dir: PathBuf,
    pub cache_ttl: Duration,
}

impl Settings {
    pub fn load_for_serve(args: &ServeArgs) -> Result<Self> {
        Self::load(&args.storage, args.host.as_deref(), args.port)
    }

    pub fn load_for_storage(args: &StorageArgs) -> Result<Self> {
        Self::load(args, None, None)
    }

    fn load(storage: &StorageArgs, host: Option<&str>, port: Option<u16>) -> Result<Self> {
        let paths = AppPaths::discover()?;
        let expander = PathExpander::new()?;
        let (config_file, config) = load_config(storage.config.as_deref(), &paths)?;
        let mut settings = Self::merge(storage, host, port, &config, &expander)?;
        settings.config_file = config_file;
        Ok(settings)
    }

    pub fn merge(
        storage: &StorageArgs,
        host: Option<&str>,
        port: Option<u16>,
        config: &LabConfig,
        expander: &PathExpander,
    ) -> Result<Self> {
        let configured = |value: &Option<String>| -> Result<Option<PathBuf>> {
            value.as_deref().map(|raw| expander.expand(raw)).transpose()
        };

        let root = match &storage.root {
            Some(root) => root.clone(),
            None => configured(&config.storage.root)?.unwrap_or_else(|| PathBuf::from(".")),
        };
        let project_root = expander.absolutize(&root, None);

        let shaders_dir = match &storage.shaders_dir {
            Some(dir) => dir.clone(),
            None => configured(&config.storage.shaders_dir)?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SHADERS_DIR)),
        };
        let static_dir = match &storage.static_dir {
            Some(dir) => dir.clone(),
            None => configured(&config.storage.static_dir)?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        };

        let host = host
            .map(str::to_string)
            .or_else(|| config.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            bail!("listen host must not be empty");
        }

        let settings = Self {
            config_file: None,
            host,
            port: port.or(config.server.port).unwrap_or(DEFAULT_PORT),
            shaders_dir: expander.absolutize(&shaders_dir, Some(&project_root)),
            static_dir: expander.absolutize(&static_dir, Some(&project_root)),
            project_root,
            cache_ttl: storage
                .cache_ttl
                .or(config.storage.cache_ttl)
                .unwrap_or(DEFAULT_TTL),
        };
        debug!(?settings, "resolved shaderlab settings");
        Ok(settings)
    }
}

/// An explicitly requested file must exist; the default location is optional.
fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<(Option<PathBuf>, LabConfig)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = paths.config_file();
            if !default.exists() {
                debug!(path = %default.display(), "no configuration file; using defaults");
                return Ok((None, LabConfig::default()));
            }
            default
        }
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let config = LabConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to load configuration file at {}", path.display()))?;
    debug!(path = %path.display(), "loaded configuration file");
    Ok((Some(path), config))
}
