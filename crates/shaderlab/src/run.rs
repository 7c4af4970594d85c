use std::sync::Arc;

use anyhow::{Context, Result};
use shaderlab::{router, serve};
use shaderstore::{build_structure, ShaderStore};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use crate::cli::{ServeArgs, StorageArgs};
use crate::paths::AppPaths;
use crate::settings::Settings;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run_server(args: ServeArgs) -> Result<()> {
    let settings = Settings::load_for_serve(&args)?;
    build_runtime()?.block_on(serve_until_interrupted(settings))
}

pub fn run_list(args: StorageArgs) -> Result<()> {
    let settings = Settings::load_for_storage(&args)?;
    let structure = build_runtime()?
        .block_on(build_structure(&settings.shaders_dir))
        .with_context(|| {
            format!(
                "failed to list shaders under {}",
                settings.shaders_dir.display()
            )
        })?;
    let rendered =
        serde_json::to_string_pretty(&structure).context("failed to serialize shader listing")?;
    println!("{rendered}");
    Ok(())
}

pub fn run_paths(args: StorageArgs) -> Result<()> {
    let settings = Settings::load_for_storage(&args)?;
    let app_paths = AppPaths::discover()?;
    println!("config dir: {}", app_paths.config_dir().display());
    match &settings.config_file {
        Some(path) => println!("config:     {}", path.display()),
        None => println!("config:     (none, using defaults)"),
    }
    println!("root:       {}", settings.project_root.display());
    println!("shaders:    {}", settings.shaders_dir.display());
    println!("static:     {}", settings.static_dir.display());
    println!("cache ttl:  {}", humantime::format_duration(settings.cache_ttl));
    Ok(())
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

async fn serve_until_interrupted(settings: Settings) -> Result<()> {
    if !settings.static_dir.is_dir() {
        tracing::warn!(
            path = %settings.static_dir.display(),
            "static directory missing; only the API and shader files will be served"
        );
    }

    let store = Arc::new(ShaderStore::new(
        &settings.project_root,
        &settings.shaders_dir,
        settings.cache_ttl,
    ));
    tracing::info!(
        root = %settings.project_root.display(),
        shaders = %settings.shaders_dir.display(),
        static_dir = %settings.static_dir.display(),
        cache_ttl = %humantime::format_duration(settings.cache_ttl),
        "starting shader storage service"
    );

    let app = router(Arc::clone(&store), &settings.static_dir);
    let listener = TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?;

    serve(listener, app, shutdown_signal())
        .await
        .context("shader storage server terminated unexpectedly")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::warn!(error = %err, "unable to listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
