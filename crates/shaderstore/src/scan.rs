//! Walks the shaders root and turns the on-disk chapter/exercise layout into a
//! `Structure`. Each level fans out over its siblings and joins before
//! returning, so a listing costs roughly one round of `stat`s per depth rather
//! than one per entry.
//!
//! Functions:
//!
//! - `build_structure` creates a missing root, then scans chapters.
//! - `scan_chapter` and `scan_exercise` return `None` for anything that is not a
//!   qualifying directory, including entries that vanish mid-scan.
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{
    creation_time, format_timestamp, Chapter, Exercise, Structure, FRAGMENT_FILE, VERTEX_FILE,
};

pub async fn build_structure(root: &Path) -> Result<Structure, StoreError> {
    if let Err(err) = fs::metadata(root).await {
        if err.kind() != io::ErrorKind::NotFound {
            return Err(StoreError::io_at("inspect shader root", root, err));
        }
        fs::create_dir_all(root)
            .await
            .map_err(|err| StoreError::io_at("create shader root", root, err))?;
        info!(root = %root.display(), "created missing shader root");
        return Ok(Structure::new());
    }

    let names = list_entries(root)
        .await
        .map_err(|err| StoreError::io_at("list shader root", root, err))?;

    let chapters = join_all(
        names
            .into_iter()
            .map(|name| scan_chapter(root.join(&name), name)),
    )
    .await;

    let structure: Structure = chapters.into_iter().flatten().collect();
    debug!(root = %root.display(), chapters = structure.len(), "scanned shader root");
    Ok(structure)
}

async fn scan_chapter(path: PathBuf, name: String) -> Option<(String, Chapter)> {
    let metadata = match fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping unreadable chapter entry");
            return None;
        }
    };
    if !metadata.is_dir() {
        return None;
    }

    let names = match list_entries(&path).await {
        Ok(names) => names,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping unlistable chapter");
            return None;
        }
    };

    let exercises: BTreeMap<String, Exercise> = join_all(
        names
            .into_iter()
            .map(|exercise| scan_exercise(path.join(&exercise), exercise)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    if exercises.is_empty() {
        debug!(path = %path.display(), "chapter has no exercises with a fragment shader");
        return None;
    }

    Some((
        name.clone(),
        Chapter {
            name,
            exercises,
            created_at: format_timestamp(creation_time(&metadata)),
        },
    ))
}

async fn scan_exercise(path: PathBuf, name: String) -> Option<(String, Exercise)> {
    match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return None,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping unreadable exercise entry");
            return None;
        }
    }

    let fragment_path = path.join(FRAGMENT_FILE);
    let fragment = match fs::metadata(&fragment_path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return None,
        Err(err) => {
            debug!(path = %fragment_path.display(), error = %err, "exercise has no fragment shader");
            return None;
        }
    };

    let has_vertex = fs::metadata(path.join(VERTEX_FILE))
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);

    Some((
        name.clone(),
        Exercise {
            name,
            created_at: format_timestamp(creation_time(&fragment)),
            has_vertex,
        },
    ))
}

async fn list_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => {
                debug!(dir = %dir.display(), name = ?raw, "skipping entry with non UTF-8 name");
            }
        }
    }
    Ok(names)
}
