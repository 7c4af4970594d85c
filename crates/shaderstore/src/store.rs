//! Owns the shaders root and every write against it. The HTTP layer hands it
//! already-decoded request fields; the store validates them, touches the
//! filesystem, and keeps its `StructureCache` honest by invalidating after each
//! successful change.
//!
//! Types:
//!
//! - `ShaderStore` pairs the project root (which client paths are relative to)
//!   with the shaders root and the listing cache.
//! - `ExerciseSources` carries the fragment and optional vertex source saved
//!   together by `save_exercise`.
//! - `ExerciseRef` names the slugged chapter/exercise a multi-file save landed in.
//! - `DeleteOutcome` reports whether a delete removed anything.
//!
//! Functions:
//!
//! - `ShaderStore::save` writes one file, optionally refusing to overwrite.
//! - `ShaderStore::delete` removes an exercise and, if it was the last one, its
//!   chapter.
//! - `ShaderStore::save_exercise` stages every source to a temporary sibling and
//!   renames them into place only once all of them were written. Commits are
//!   serialised so concurrent saves of one exercise never interleave.
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::StructureCache;
use crate::error::StoreError;
use crate::model::{Structure, FRAGMENT_FILE, VERTEX_FILE};
use crate::path::{confine, plain_component};
use crate::slug::slugify;

#[derive(Debug, Clone, Default)]
pub struct ExerciseSources {
    pub fragment: String,
    pub vertex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseRef {
    pub chapter: String,
    pub exercise: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    AlreadyAbsent,
    Removed { chapter_removed: bool },
}

#[derive(Debug)]
pub struct ShaderStore {
    project_root: PathBuf,
    shaders_root: PathBuf,
    cache: StructureCache,
    commit_lock: Mutex<()>,
}

impl ShaderStore {
    /// Both roots are compared lexically, so callers should pass them in the
    /// same form (typically both absolute).
    pub fn new(
        project_root: impl Into<PathBuf>,
        shaders_root: impl Into<PathBuf>,
        cache_ttl: Duration,
    ) -> Self {
        let shaders_root = shaders_root.into();
        Self {
            project_root: project_root.into(),
            cache: StructureCache::new(shaders_root.clone(), cache_ttl),
            shaders_root,
            commit_lock: Mutex::new(()),
        }
    }

    pub fn shaders_root(&self) -> &Path {
        &self.shaders_root
    }

    pub async fn list(&self) -> Result<Arc<Structure>, StoreError> {
        self.cache.get_structure().await
    }

    pub async fn save(
        &self,
        content: &str,
        file_path: &str,
        is_new: bool,
    ) -> Result<PathBuf, StoreError> {
        if file_path.trim().is_empty() {
            return Err(StoreError::validation("path is required to save a shader"));
        }
        if content.is_empty() {
            return Err(StoreError::validation("content is required to save a shader"));
        }

        let target = confine(&self.project_root, &self.shaders_root, file_path.trim())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::io_at("create directory", parent, err))?;
        }

        if is_new {
            write_new(&target, content, file_path).await?;
        } else {
            fs::write(&target, content)
                .await
                .map_err(|err| StoreError::io_at("write", &target, err))?;
        }

        self.cache.invalidate();
        info!(path = %target.display(), bytes = content.len(), is_new, "saved shader");
        Ok(target)
    }

    pub async fn delete(&self, chapter: &str, exercise: &str) -> Result<DeleteOutcome, StoreError> {
        let chapter = plain_component(chapter, "chapter")?;
        let exercise = plain_component(exercise, "exercise")?;
        let chapter_dir = self.shaders_root.join(chapter);
        let exercise_dir = chapter_dir.join(exercise);

        let outcome = if remove_exercise_dir(&exercise_dir).await? {
            info!(path = %exercise_dir.display(), "deleted exercise");
            let chapter_removed = remove_dir_if_empty(&chapter_dir).await?;
            if chapter_removed {
                info!(path = %chapter_dir.display(), "deleted empty chapter");
            }
            DeleteOutcome::Removed { chapter_removed }
        } else {
            debug!(path = %exercise_dir.display(), "exercise already absent");
            DeleteOutcome::AlreadyAbsent
        };

        self.cache.invalidate();
        Ok(outcome)
    }

    pub async fn save_exercise(
        &self,
        chapter: &str,
        exercise: &str,
        sources: &ExerciseSources,
        is_new: bool,
    ) -> Result<ExerciseRef, StoreError> {
        let target = ExerciseRef {
            chapter: slug_for(chapter, "chapter")?,
            exercise: slug_for(exercise, "exercise")?,
        };
        if sources.fragment.is_empty() {
            return Err(StoreError::validation("fragment source is required"));
        }

        let dir = self
            .shaders_root
            .join(&target.chapter)
            .join(&target.exercise);
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| StoreError::io_at("create directory", &dir, err))?;

        // Held across the existence check and the renames: one exercise's fragment and
        // vertex always come from the same request.
        let _commit = self.commit_lock.lock().await;
        if is_new {
            let fragment_path = dir.join(FRAGMENT_FILE);
            let exists = fs::try_exists(&fragment_path)
                .await
                .map_err(|err| StoreError::io_at("inspect", &fragment_path, err))?;
            if exists {
                return Err(StoreError::validation(format!(
                    "shader already exists: {}/{}",
                    target.chapter, target.exercise
                )));
            }
        }

        let mut files = vec![(FRAGMENT_FILE, sources.fragment.as_str())];
        if let Some(vertex) = sources.vertex.as_deref().filter(|v| !v.is_empty()) {
            files.push((VERTEX_FILE, vertex));
        }
        commit_staged(&dir, &files).await?;

        self.cache.invalidate();
        info!(
            chapter = %target.chapter,
            exercise = %target.exercise,
            files = files.len(),
            is_new,
            "saved exercise sources"
        );
        Ok(target)
    }
}

fn slug_for(name: &str, label: &str) -> Result<String, StoreError> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(StoreError::validation(format!(
            "{label} name must contain at least one letter, digit or hyphen"
        )));
    }
    Ok(slug)
}

async fn write_new(path: &Path, content: &str, requested: &str) -> Result<(), StoreError> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StoreError::validation(format!(
                "shader already exists: {requested}"
            )));
        }
        Err(err) => return Err(StoreError::io_at("create", path, err)),
    };

    file.write_all(content.as_bytes())
        .await
        .map_err(|err| StoreError::io_at("write", path, err))?;
    file.flush()
        .await
        .map_err(|err| StoreError::io_at("flush", path, err))
}

/// Removes the files directly inside `dir` and then `dir` itself. Returns
/// `false` when the directory was already gone.
async fn remove_exercise_dir(dir: &Path) -> Result<bool, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(StoreError::io_at("list", dir, err)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| StoreError::io_at("list", dir, err))?
    {
        let path = entry.path();
        match fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "removed shader file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io_at("remove", &path, err)),
        }
    }

    match fs::remove_dir(dir).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(StoreError::io_at("remove directory", dir, err)),
    }
}

async fn remove_dir_if_empty(dir: &Path) -> Result<bool, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(StoreError::io_at("list", dir, err)),
    };
    let occupied = entries
        .next_entry()
        .await
        .map_err(|err| StoreError::io_at("list", dir, err))?
        .is_some();
    if occupied {
        return Ok(false);
    }

    match fs::remove_dir(dir).await {
        Ok(()) => Ok(true),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
            ) =>
        {
            Ok(false)
        }
        Err(err) => Err(StoreError::io_at("remove directory", dir, err)),
    }
}

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `name`, unique per call so concurrent writers never
/// share a staging file.
fn staging_path(dir: &Path, name: &str) -> PathBuf {
    let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{name}.{}-{sequence}.tmp", process::id()))
}

async fn discard_staged(paths: Vec<PathBuf>) {
    for path in paths {
        if let Err(err) = fs::remove_file(&path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %err, "failed to discard staged shader");
            }
        }
    }
}

async fn commit_staged(dir: &Path, files: &[(&str, &str)]) -> Result<(), StoreError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (name, content) in files {
        let temp = staging_path(dir, name);
        if let Err(err) = fs::write(&temp, content).await {
            let mut leftovers: Vec<PathBuf> = staged.into_iter().map(|(temp, _)| temp).collect();
            leftovers.push(temp.clone());
            discard_staged(leftovers).await;
            return Err(StoreError::io_at("stage", &temp, err));
        }
        staged.push((temp, dir.join(name)));
    }

    let mut committed: Vec<String> = Vec::with_capacity(staged.len());
    for index in 0..staged.len() {
        let (temp, target) = &staged[index];
        if let Err(err) = fs::rename(temp, target).await {
            let target = target.clone();
            let leftovers: Vec<PathBuf> = staged
                .drain(index..)
                .map(|(temp, _)| temp)
                .collect();
            discard_staged(leftovers).await;
            let context = if committed.is_empty() {
                format!("failed to commit {}", target.display())
            } else {
                format!(
                    "failed to commit {} after committing {}",
                    target.display(),
                    committed.join(", ")
                )
            };
            return Err(StoreError::storage(context, err));
        }
        committed.push(target.display().to_string());
    }
    Ok(())
}
