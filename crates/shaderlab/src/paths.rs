//! Locates the user configuration directory and expands the paths written in
//! `shaderlab.toml`, so config-file values and CLI flags end up as absolute,
//! lexically normalised directories before the store ever sees them.
//!
//! Types:
//!
//! - `AppPaths` holds the resolved config directory and the default config file.
//! - `PathExpander` remembers the working directory and performs `~`/`$VAR`
//!   expansion plus absolutisation.
//!
//! Functions:
//!
//! - `AppPaths::discover` honours `SHADERLAB_CONFIG_DIR` before falling back to
//!   the platform directory from `directories-next`.
//! - `PathExpander::expand` and `absolutize` turn config strings into paths.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories_next::{BaseDirs, ProjectDirs};
use shaderstore::normalize_lexically;
use tracing::debug;

pub const ENV_CONFIG_DIR: &str = "SHADERLAB_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "shaderlab.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shaderlab";
const APPLICATION: &str = "shaderlab";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(value) = env::var_os(ENV_CONFIG_DIR).filter(|value| !value.is_empty()) {
            let config_dir = PathBuf::from(value);
            debug!(path = %config_dir.display(), "using config directory from environment");
            return Ok(Self { config_dir });
        }

        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct PathExpander {
    cwd: PathBuf,
}

impl PathExpander {
    pub fn new() -> Result<Self> {
        let cwd = env::current_dir().context("failed to resolve current working directory")?;
        Ok(Self { cwd })
    }

    #[cfg(test)]
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn expand(&self, input: &str) -> Result<PathBuf> {
        let with_env = expand_env_vars(input)?;
        let expanded = PathBuf::from(expand_home(&with_env)?);
        debug!(original = %input, expanded = %expanded.display(), "expanded configured path");
        Ok(expanded)
    }

    /// Joins relative paths onto `base` (or the working directory) and
    /// normalises the result.
    pub fn absolutize(&self, path: &Path, base: Option<&Path>) -> PathBuf {
        if path.is_absolute() {
            return normalize_lexically(path);
        }
        let base = base.unwrap_or(&self.cwd);
        let base = if base.is_absolute() {
            base.to_path_buf()
        } else {
            self.cwd.join(base)
        };
        normalize_lexically(&base.join(path))
    }
}

fn expand_home(input: &str) -> Result<String> {
    let rest = match input.strip_prefix('~') {
        Some(rest) => rest,
        None => return Ok(input.to_string()),
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        bail!("user-specific home expansion ('{input}') is not supported");
    }

    let base_dirs = BaseDirs::new()
        .ok_or_else(|| anyhow!("unable to determine home directory for '~' expansion"))?;
    let mut path = base_dirs.home_dir().to_path_buf();
    if let Some(relative) = rest.strip_prefix('/').filter(|relative| !relative.is_empty()) {
        path.push(relative);
    }
    Ok(path.to_string_lossy().into_owned())
}

fn expand_env_vars(input: &str) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            output.push(ch);
            continue;
        }

        let name = match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    bail!("missing closing '}}' in environment variable reference '{input}'");
                }
                if name.is_empty() {
                    bail!("environment variable name must not be empty in '{input}'");
                }
                name
            }
            Some(&c) if c == '_' || c.is_ascii_alphanumeric() => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c != '_' && !c.is_ascii_alphanumeric() {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                name
            }
            _ => {
                output.push('$');
                continue;
            }
        };

        let value =
            env::var(&name).map_err(|_| anyhow!("environment variable '{name}' is not set"))?;
        output.push_str(&value);
    }

    Ok(output)
}
