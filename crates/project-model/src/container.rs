//! Persistent container clip data.
//!
//! A container clip is a timeline clip whose media is produced by an
//! external program. [`ContainerData`] is the long-lived record owned by the
//! clip; everything needed to (re-)render it is derived from this record.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128;

use crate::render_data::RenderData;

/// Slot holding the generator's JSON metadata (name, length, editors, groups).
pub const GENERATOR_EDIT_DATA_SLOT: &str = "generator_edit_data";

/// Slot holding an icon image path that overrides the unrendered media frame.
pub const ICON_FILE_SLOT: &str = "icon_file";

/// Which external program produces the clip's media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// Script-based image generator.
    ScriptGenerator,
    /// Filter script applied to the frames of a source clip.
    FilterScript,
    /// Project file rendered by the embedded project-XML renderer.
    ProjectXml,
}

impl ContainerType {
    pub const ALL: [ContainerType; 3] = [
        ContainerType::ScriptGenerator,
        ContainerType::FilterScript,
        ContainerType::ProjectXml,
    ];

    /// Stable tag used in program id derivation and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerType::ScriptGenerator => "script_generator",
            ContainerType::FilterScript => "filter_script",
            ContainerType::ProjectXml => "project_xml",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of render produced (or is producing) the clip media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    /// The whole program output, `[0, unrendered_length)`.
    Full,
    /// Only the part of the program under the timeline clip.
    ClipLength,
    /// One frame for preview purposes.
    SinglePreview,
}

/// Deterministic identifier of a render session.
///
/// 128-bit content hash rendered as 32 lowercase hex characters. It names
/// the session directory, so it must not change across saves and loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(String);

impl ProgramId {
    /// Derive the id from the four identity fields of a container clip.
    pub fn derive(
        clip_uid: &str,
        container_type: ContainerType,
        program: &Path,
        unrendered_media: &Path,
    ) -> Self {
        let mut material = String::new();
        material.push_str(clip_uid);
        material.push_str(container_type.as_str());
        material.push_str(&program.to_string_lossy());
        material.push_str(&unrendered_media.to_string_lossy());
        Self(format!("{:032x}", xxh3_128(material.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for ProgramId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Program specific persisted payload.
///
/// An open string-keyed map; typed accessors exist for the slots the render
/// engine itself reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSlots(BTreeMap<String, serde_json::Value>);

impl DataSlots {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut serde_json::Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Generator metadata written by script-generator validation.
    pub fn generator_edit_data(&self) -> Option<&serde_json::Value> {
        self.get(GENERATOR_EDIT_DATA_SLOT)
    }

    pub fn generator_edit_data_mut(&mut self) -> Option<&mut serde_json::Value> {
        self.0
            .get_mut(GENERATOR_EDIT_DATA_SLOT)
            .filter(|v| !v.is_null())
    }

    /// Icon override path, if one was stored.
    pub fn icon_file(&self) -> Option<PathBuf> {
        self.get(ICON_FILE_SLOT)
            .and_then(serde_json::Value::as_str)
            .map(PathBuf::from)
    }

    pub fn set_icon_file(&mut self, path: impl AsRef<Path>) {
        self.insert(
            ICON_FILE_SLOT,
            serde_json::Value::String(path.as_ref().to_string_lossy().into_owned()),
        );
    }
}

/// Persistent data of one container clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerData {
    pub container_type: ContainerType,

    /// Stable identity of the clip; regenerated on clone.
    pub container_clip_uid: String,

    /// User-authored script or project file.
    pub program: PathBuf,

    /// Stand-in media shown until a render completes.
    pub unrendered_media: PathBuf,

    /// Frame count of the placeholder / generator output.
    #[serde(default)]
    pub unrendered_length: Option<u64>,

    /// Media produced by the last completed render.
    #[serde(default)]
    pub rendered_media: Option<PathBuf>,

    #[serde(default)]
    pub rendered_media_range_in: Option<i64>,

    #[serde(default)]
    pub rendered_media_range_out: Option<i64>,

    /// Encoding configuration, created with defaults on first render.
    #[serde(default)]
    pub render_data: Option<RenderData>,

    #[serde(default)]
    pub data_slots: DataSlots,

    /// Kind of the last render that replaced the clip; UI facing only.
    #[serde(skip)]
    pub last_render_type: Option<RenderKind>,

    /// Progress of the in-flight render, `None` when nothing is rendering.
    #[serde(skip)]
    pub progress: Option<f64>,
}

impl ContainerData {
    /// Create data for a new container clip with a fresh uid.
    pub fn new(
        container_type: ContainerType,
        program: impl Into<PathBuf>,
        unrendered_media: impl Into<PathBuf>,
    ) -> Self {
        Self {
            container_type,
            container_clip_uid: new_clip_uid(),
            program: program.into(),
            unrendered_media: unrendered_media.into(),
            unrendered_length: None,
            rendered_media: None,
            rendered_media_range_in: None,
            rendered_media_range_out: None,
            render_data: None,
            data_slots: DataSlots::default(),
            last_render_type: None,
            progress: None,
        }
    }

    pub fn with_unrendered_length(mut self, length: u64) -> Self {
        self.unrendered_length = Some(length);
        self
    }

    /// Replace the clip uid; the program id changes with it.
    pub fn generate_clip_id(&mut self) {
        self.container_clip_uid = new_clip_uid();
    }

    pub fn program_id(&self) -> ProgramId {
        ProgramId::derive(
            &self.container_clip_uid,
            self.container_type,
            &self.program,
            &self.unrendered_media,
        )
    }

    /// File name of the program, used in job names and UI labels.
    pub fn program_name(&self) -> String {
        file_name_of(&self.program)
    }

    /// File name of the placeholder media.
    pub fn unrendered_media_name(&self) -> String {
        file_name_of(&self.unrendered_media)
    }

    /// Load container data from a JSON document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save container data as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn new_clip_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Errors that can occur when working with persisted model documents.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContainerData {
        let mut data = ContainerData::new(
            ContainerType::FilterScript,
            "/scripts/blur.gmic",
            "/media/source.mp4",
        );
        data.container_clip_uid = "3f0a6d2e-0000-4000-8000-000000000001".to_string();
        data
    }

    #[test]
    fn test_program_id_is_32_hex_chars() {
        let id = sample().program_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_program_id_changes_with_each_identity_field() {
        let base = sample();
        let base_id = base.program_id();

        let mut other = base.clone();
        other.container_type = ContainerType::ProjectXml;
        assert_ne!(other.program_id(), base_id);

        let mut other = base.clone();
        other.program = PathBuf::from("/scripts/sharpen.gmic");
        assert_ne!(other.program_id(), base_id);

        let mut other = base.clone();
        other.unrendered_media = PathBuf::from("/media/other.mp4");
        assert_ne!(other.program_id(), base_id);

        let mut other = base;
        other.generate_clip_id();
        assert_ne!(other.program_id(), base_id);
    }

    #[test]
    fn test_program_id_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.json");
        let data = sample();
        data.save(&path).unwrap();

        let loaded = ContainerData::load(&path).unwrap();
        assert_eq!(loaded.program_id(), data.program_id());
    }

    #[test]
    fn test_transient_fields_are_not_persisted() {
        let mut data = sample();
        data.progress = Some(0.5);
        data.last_render_type = Some(RenderKind::Full);

        let json = serde_json::to_string(&data).unwrap();
        let parsed: ContainerData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.progress, None);
        assert_eq!(parsed.last_render_type, None);
    }

    #[test]
    fn test_data_slots_typed_accessors() {
        let mut slots = DataSlots::default();
        assert!(slots.icon_file().is_none());
        slots.set_icon_file("/thumbs/icon.png");
        assert_eq!(slots.icon_file(), Some(PathBuf::from("/thumbs/icon.png")));

        slots.insert(GENERATOR_EDIT_DATA_SLOT, serde_json::Value::Null);
        assert!(slots.generator_edit_data().is_none());
        slots.insert(
            GENERATOR_EDIT_DATA_SLOT,
            serde_json::json!({"name": "Noise", "length": 120}),
        );
        assert_eq!(slots.generator_edit_data().unwrap()["name"], "Noise");
    }

    #[test]
    fn test_container_type_tags_round_trip() {
        for t in ContainerType::ALL {
            assert_eq!(ContainerType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ContainerType::parse("blender"), None);
    }
}
