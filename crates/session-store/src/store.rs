//! Filesystem-backed render session store.
//!
//! Sessions live under a parent folder, one directory per program id:
//!
//! ```text
//! <parent_folder>/<program_id>/
//! ├── clip_frames/              source frames extracted by the renderer
//! ├── rendered_frames/          rendered output frames
//! ├── preview/                  generator preview frames
//! ├── render_data.json          encoding configuration (supervisor)
//! ├── session_status.json       latest status (renderer)
//! ├── session_render_complete   completion marker (renderer)
//! ├── session_abort             abort request (supervisor)
//! ├── session_error             failure text (renderer)
//! └── misc_<key>.json           extra program payloads (supervisor)
//! ```
//!
//! Every document is written to a temp file and renamed into place, so a
//! reader never observes a partial write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use montage_common::error::MontageError;
use montage_project_model::{ProgramId, RenderData};

use crate::status::RawStatus;

pub const CLIP_FRAMES_DIR: &str = "clip_frames";
pub const RENDERED_FRAMES_DIR: &str = "rendered_frames";
pub const PREVIEW_DIR: &str = "preview";

const RENDER_DATA_FILE: &str = "render_data.json";
const STATUS_FILE: &str = "session_status.json";
const COMPLETE_FILE: &str = "session_render_complete";
const ABORT_FILE: &str = "session_abort";
const ERROR_FILE: &str = "session_error";

/// Errors raised by session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl SessionError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<SessionError> for MontageError {
    fn from(err: SessionError) -> Self {
        MontageError::session(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Render sessions under one parent folder.
#[derive(Debug, Clone)]
pub struct RenderSessionStore {
    parent_folder: PathBuf,
}

impl RenderSessionStore {
    pub fn new(parent_folder: impl Into<PathBuf>) -> Self {
        Self {
            parent_folder: parent_folder.into(),
        }
    }

    pub fn parent_folder(&self) -> &Path {
        &self.parent_folder
    }

    pub fn session_dir(&self, id: &ProgramId) -> PathBuf {
        self.parent_folder.join(id)
    }

    pub fn clip_frames_dir(&self, id: &ProgramId) -> PathBuf {
        self.session_dir(id).join(CLIP_FRAMES_DIR)
    }

    pub fn rendered_frames_dir(&self, id: &ProgramId) -> PathBuf {
        self.session_dir(id).join(RENDERED_FRAMES_DIR)
    }

    pub fn preview_dir(&self, id: &ProgramId) -> PathBuf {
        self.session_dir(id).join(PREVIEW_DIR)
    }

    /// Create the session directory and its frame folders.
    pub fn create_session_dirs(&self, id: &ProgramId) -> SessionResult<()> {
        for dir in [self.clip_frames_dir(id), self.rendered_frames_dir(id)] {
            std::fs::create_dir_all(&dir).map_err(|e| SessionError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Remove status and flag files of a previous render.
    ///
    /// Absent files are not an error.
    pub fn clear_flags(&self, id: &ProgramId) -> SessionResult<()> {
        let dir = self.session_dir(id);
        for name in [STATUS_FILE, COMPLETE_FILE, ABORT_FILE, ERROR_FILE] {
            remove_if_present(&dir.join(name))?;
        }
        tracing::debug!(program_id = %id, "Cleared session flags");
        Ok(())
    }

    /// Store the encoding configuration for the renderer to read at startup.
    pub fn set_render_data(&self, id: &ProgramId, render_data: &RenderData) -> SessionResult<()> {
        self.write_json(&self.session_dir(id).join(RENDER_DATA_FILE), render_data)
    }

    pub fn render_data(&self, id: &ProgramId) -> SessionResult<Option<RenderData>> {
        self.read_json(&self.session_dir(id).join(RENDER_DATA_FILE))
    }

    pub fn write_misc_session_data(
        &self,
        id: &ProgramId,
        key: &str,
        value: &serde_json::Value,
    ) -> SessionResult<()> {
        self.write_json(&self.misc_path(id, key), value)
    }

    pub fn read_misc_session_data(
        &self,
        id: &ProgramId,
        key: &str,
    ) -> SessionResult<Option<serde_json::Value>> {
        self.read_json(&self.misc_path(id, key))
    }

    /// Whether the renderer has written its completion marker.
    pub fn is_complete(&self, id: &ProgramId) -> bool {
        self.session_dir(id).join(COMPLETE_FILE).exists()
    }

    /// Latest status, or `None` when the renderer has not reported yet.
    ///
    /// An unreadable or unparsable status file is also treated as "not yet".
    pub fn get_status(&self, id: &ProgramId) -> Option<RawStatus> {
        let path = self.session_dir(id).join(STATUS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "Status file unreadable");
                }
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Status file unparsable");
                None
            }
        }
    }

    /// Ask the renderer to stop. The renderer polls for this marker.
    pub fn abort(&self, id: &ProgramId) -> SessionResult<()> {
        self.write_atomic(&self.session_dir(id).join(ABORT_FILE), b"abort")?;
        tracing::info!(program_id = %id, "Abort requested");
        Ok(())
    }

    /// Renderer side: whether an abort was requested.
    pub fn abort_requested(&self, id: &ProgramId) -> bool {
        self.session_dir(id).join(ABORT_FILE).exists()
    }

    /// Renderer side: publish a status report.
    pub fn write_status(&self, id: &ProgramId, status: &RawStatus) -> SessionResult<()> {
        self.write_json(&self.session_dir(id).join(STATUS_FILE), status)
    }

    /// Renderer side: mark the render complete.
    pub fn mark_complete(&self, id: &ProgramId) -> SessionResult<()> {
        self.write_atomic(&self.session_dir(id).join(COMPLETE_FILE), b"done")
    }

    /// Renderer side: report a failure.
    pub fn write_error(&self, id: &ProgramId, message: &str) -> SessionResult<()> {
        self.write_atomic(&self.session_dir(id).join(ERROR_FILE), message.as_bytes())
    }

    /// Failure text written by the renderer, if any.
    pub fn error(&self, id: &ProgramId) -> Option<String> {
        std::fs::read_to_string(self.session_dir(id).join(ERROR_FILE)).ok()
    }

    /// Delete a whole session directory.
    pub fn remove_session(&self, id: &ProgramId) -> SessionResult<()> {
        let dir = self.session_dir(id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(&dir, e)),
        }
    }

    fn misc_path(&self, id: &ProgramId, key: &str) -> PathBuf {
        self.session_dir(id).join(format!("misc_{key}.json"))
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> SessionResult<()> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| SessionError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write_atomic(path, &json)
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> SessionResult<Option<T>> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::io(path, e)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| SessionError::Parse {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Write to a sibling temp file, then rename over the target.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> SessionResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }
        let temp_path = temp_path_for(path);
        std::fs::write(&temp_path, bytes).map_err(|e| SessionError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, path).map_err(|e| SessionError::io(path, e))
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn remove_if_present(path: &Path) -> SessionResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SessionError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn id() -> ProgramId {
        ProgramId::derive(
            "uid-1",
            montage_project_model::ContainerType::FilterScript,
            Path::new("/s.gmic"),
            Path::new("/m.mp4"),
        )
    }

    #[test]
    fn test_clear_flags_on_missing_session_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = RenderSessionStore::new(dir.path());
        store.clear_flags(&id()).unwrap();
        store.clear_flags(&id()).unwrap();
    }

    #[test]
    fn test_clear_flags_removes_markers_but_keeps_render_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = RenderSessionStore::new(dir.path());
        let id = id();
        let render_data = RenderData::default_for_profile(&Default::default());
        store.set_render_data(&id, &render_data).unwrap();
        store.mark_complete(&id).unwrap();
        store.abort(&id).unwrap();
        store.write_error(&id, "boom").unwrap();
        store
            .write_status(
                &id,
                &RawStatus::Fractional {
                    fraction: 0.5,
                    elapsed: 1.0,
                },
            )
            .unwrap();

        store.clear_flags(&id).unwrap();

        assert!(!store.is_complete(&id));
        assert!(!store.abort_requested(&id));
        assert!(store.error(&id).is_none());
        assert!(store.get_status(&id).is_none());
        assert_eq!(store.render_data(&id).unwrap(), Some(render_data));
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RenderSessionStore::new(dir.path());
        let id = id();
        store.mark_complete(&id).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(store.session_dir(&id))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let p = temp_path_for(Path::new("/a/b/session_status.json"));
        assert_eq!(p, PathBuf::from("/a/b/.session_status.json.tmp"));
    }
}
