//! The generic binding between an entity's structured fields and its
//! rendered note file.
//!
//! An entity is logically in one of two states: *unrendered* (fields only,
//! file name and content computed from the templates on first access) or
//! *rendered* (backed by text, possibly edited by the user, from which the
//! identity fields were parsed). [`NoteFile`] holds the rendered half;
//! the [`Note`] trait provides the transitions. Rendering happens lazily
//! and the results are cached; changing a field never invalidates a cached
//! file name — callers reset it explicitly when they mean to.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::PathBuf;

/// The persisted half of an entity: where it lives and what text backs it.
///
/// Equality is over this triple, not over parsed fields: two entities with
/// different free text are different even when their identity fields match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteFile {
    pub(crate) folder: Option<PathBuf>,
    pub(crate) file_name: Option<String>,
    pub(crate) content: Option<String>,
}

impl NoteFile {
    /// A note with no backing folder, used by transient entities and
    /// template self-checks.
    pub fn detached() -> Self {
        Self::default()
    }

    /// A not-yet-persisted note; name and content render on first access.
    pub fn in_folder(folder: impl Into<Option<PathBuf>>) -> Self {
        Self { folder: folder.into(), file_name: None, content: None }
    }

    /// A note loaded from disk.
    pub fn loaded(folder: PathBuf, file_name: String, content: String) -> Self {
        Self { folder: Some(folder), file_name: Some(file_name), content: Some(content) }
    }

    pub fn folder(&self) -> Option<&PathBuf> {
        self.folder.as_ref()
    }
}

/// Lazily-rendered note behavior shared by all entity kinds.
pub trait Note {
    fn note(&self) -> &NoteFile;
    fn note_mut(&mut self) -> &mut NoteFile;

    /// Renders the file name from the entity's fields.
    fn render_file_name(&self) -> Result<String>;

    /// Renders the note body from the entity's fields.
    fn render_body(&mut self) -> Result<String>;

    /// The cross-reference token other notes embed to point at this entity.
    fn file_link(&mut self) -> Result<String>;

    /// The note's file name, rendered on first access and cached until
    /// [`reset_file_name`](Note::reset_file_name).
    fn file_name(&mut self) -> Result<String> {
        if let Some(name) = &self.note().file_name {
            return Ok(name.clone());
        }
        let name = self.render_file_name()?;
        self.note_mut().file_name = Some(name.clone());
        Ok(name)
    }

    /// The note's content, rendered on first access and cached.
    fn content(&mut self) -> Result<String> {
        if let Some(content) = &self.note().content {
            return Ok(content.clone());
        }
        let content = self.render_body()?;
        self.note_mut().content = Some(content.clone());
        Ok(content)
    }

    /// Drops the cached file name so the next access re-renders it from the
    /// current fields.
    fn reset_file_name(&mut self) {
        self.note_mut().file_name = None;
    }

    /// Full path of the backing file. Fails for detached entities.
    fn path(&mut self) -> Result<PathBuf> {
        let name = self.file_name()?;
        match &self.note().folder {
            Some(folder) => Ok(folder.join(name)),
            None => exn::bail!(ErrorKind::Detached),
        }
    }

    /// Persists the content to `folder/file_name`, creating the folder when
    /// it does not exist yet.
    fn write(&mut self) -> Result<()> {
        persist(self)
    }

    /// Removes the backing file if present; a no-op for detached entities
    /// and files that were never written.
    fn delete_file(&mut self) -> Result<()> {
        if self.note().folder.is_none() {
            return Ok(());
        }
        let path = self.path()?;
        if path.exists() {
            fs::remove_file(&path).or_raise(|| ErrorKind::Io)?;
        }
        Ok(())
    }
}

/// Shared write path, also used by entities that adjust their file name
/// before persisting.
pub(crate) fn persist<N: Note + ?Sized>(entity: &mut N) -> Result<()> {
    let content = entity.content()?;
    let path = entity.path()?;
    if let Some(folder) = entity.note().folder.clone() {
        fs::create_dir_all(folder).or_raise(|| ErrorKind::Io)?;
    }
    fs::write(&path, content).or_raise(|| ErrorKind::Io)
}

/// File name without its final extension.
pub(crate) fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}
