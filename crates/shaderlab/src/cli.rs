use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shaderlab",
    author,
    version,
    about = "Storage server for the live GLSL shader playground",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub serve: ServeArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (the default when no subcommand is given).
    Serve(ServeArgs),
    /// Print the current chapter/exercise listing as JSON and exit.
    List(StorageArgs),
    /// Print the resolved configuration file and directories.
    Paths(StorageArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub storage: StorageArgs,

    /// Address to bind.
    #[arg(long, env = "SHADERLAB_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on (0 picks a free port).
    #[arg(long, env = "SHADERLAB_PORT", value_name = "PORT")]
    pub port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Configuration file; defaults to `shaderlab.toml` in the user config directory.
    #[arg(long, env = "SHADERLAB_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root that client-supplied shader paths are relative to.
    #[arg(long, env = "SHADERLAB_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Directory holding the chapters (relative paths resolve against the root).
    #[arg(long, env = "SHADERLAB_SHADERS_DIR", value_name = "DIR")]
    pub shaders_dir: Option<PathBuf>,

    /// Directory with the client bundle (relative paths resolve against the root).
    #[arg(long, env = "SHADERLAB_STATIC_DIR", value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// How long a listing stays cached (e.g. `5m`, `90s`).
    #[arg(long, env = "SHADERLAB_CACHE_TTL", value_name = "DURATION", value_parser = parse_ttl)]
    pub cache_ttl: Option<Duration>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_ttl(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("cache TTL must not be empty".to_string());
    }

    let ttl = match trimmed.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(trimmed)
            .map_err(|err| format!("invalid cache TTL '{trimmed}': {err}"))?,
    };
    if ttl.is_zero() {
        return Err("cache TTL must be greater than zero".to_string());
    }
    Ok(ttl)
}
