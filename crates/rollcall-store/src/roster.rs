//! Enrollment directory: one `{id}_{name}.jpg` photo per person.
//!
//! The file stem (`id_name`) is the label recognized faces are recorded
//! under. There is no integrity check beyond the naming convention.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PHOTO_EXTENSION: &str = "jpg";

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("both a name and a user id are required")]
    MissingField,
    #[error("user {0} is already enrolled")]
    AlreadyEnrolled(String),
    #[error("I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> RosterError + '_ {
    move |source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// An enrolled person as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollee {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

impl Enrollee {
    /// Parse a photo path. Returns `None` for anything that is not a `.jpg`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if !ext.eq_ignore_ascii_case(PHOTO_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let (id, name) = match stem.split_once('_') {
            Some((id, name)) => (id.to_string(), name.to_string()),
            None => (stem.to_string(), String::new()),
        };
        Some(Self {
            id,
            name,
            path: path.to_path_buf(),
        })
    }

    /// `id_name`, the string stored in `attendance.name`.
    pub fn label(&self) -> String {
        label(&self.id, &self.name)
    }
}

pub fn label(id: &str, name: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        format!("{id}_{name}")
    }
}

/// Keep alphanumerics, space, `-` and `_`; drop trailing spaces.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Keep alphanumerics and `-`.
///
/// `_` is dropped because it separates the id from the name in a photo's
/// file stem.
pub fn sanitize_id(id: &str) -> String {
    id.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect()
}

/// Sanitize both fields, rejecting either one ending up empty.
pub fn clean_identity(id: &str, name: &str) -> Result<(String, String), RosterError> {
    let id = sanitize_id(id);
    let name = sanitize_name(name);
    if id.is_empty() || name.is_empty() {
        return Err(RosterError::MissingField);
    }
    Ok((id, name))
}

pub fn path_for(dir: &Path, id: &str, name: &str) -> PathBuf {
    dir.join(format!("{}.{PHOTO_EXTENSION}", label(id, name)))
}

/// Enrolled photos sorted by file name. A missing directory is empty.
pub fn list(dir: &Path) -> Result<Vec<Enrollee>, RosterError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match Enrollee::from_path(&path) {
            Some(e) => out.push(e),
            None => tracing::debug!(path = %path.display(), "ignoring non-photo file"),
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Prepare the photo path for a new enrollment.
///
/// Creates the directory and fails if the person is already enrolled,
/// unless `overwrite` is set.
pub fn reserve(
    dir: &Path,
    id: &str,
    name: &str,
    overwrite: bool,
) -> Result<PathBuf, RosterError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = path_for(dir, id, name);
    if path.exists() && !overwrite {
        return Err(RosterError::AlreadyEnrolled(label(id, name)));
    }
    Ok(path)
}

/// Enrollees whose id is `id`.
pub fn find_by_id(dir: &Path, id: &str) -> Result<Vec<Enrollee>, RosterError> {
    Ok(list(dir)?.into_iter().filter(|e| e.id == id).collect())
}

/// Delete every photo belonging to `id`. Returns the removed enrollees.
pub fn remove_user(dir: &Path, id: &str) -> Result<Vec<Enrollee>, RosterError> {
    let victims = find_by_id(dir, id)?;
    for e in &victims {
        std::fs::remove_file(&e.path).map_err(io_err(&e.path))?;
        tracing::info!(label = %e.label(), "enrollment photo removed");
    }
    Ok(victims)
}

/// Delete every file in the enrollment directory. Returns how many.
pub fn clear(dir: &Path) -> Result<usize, RosterError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(io_err(&path))?;
            removed += 1;
        }
    }
    tracing::warn!(dir = %dir.display(), removed, "enrollment directory cleared");
    Ok(removed)
}
