//! Timeline clips and the clip replacement edit contract.
//!
//! The editor's real timeline lives outside this workspace. The render
//! engine only needs to look up where a clip currently sits, build a clip
//! from a media path, and apply one atomic replace edit. That surface is
//! [`TimelineEditGateway`]; [`Sequence`] is a small in-memory implementation
//! used by the command line tool and tests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::{ContainerData, RenderKind};

/// Identity of a clip on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

/// A clip placed on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub name: String,

    /// Media resource the clip plays.
    pub path: PathBuf,

    /// First used frame of the media (inclusive).
    pub clip_in: i64,

    /// Last used frame of the media (inclusive).
    pub clip_out: i64,

    /// Filters attached to the clip, by name.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Present when the clip is a container clip.
    #[serde(default)]
    pub container_data: Option<ContainerData>,
}

impl Clip {
    pub fn is_container_clip(&self) -> bool {
        self.container_data.is_some()
    }
}

/// Kind of container clip replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerEditKind {
    /// Unrendered media replaced by a render of the whole program.
    FullRenderReplace,
    /// Unrendered media replaced by a render of the clip range only.
    ClipRenderReplace,
    /// Rendered media replaced by the placeholder again.
    SwitchToUnrendered,
}

/// One atomic, undoable clip replacement.
#[derive(Debug, Clone)]
pub struct ContainerEdit {
    pub kind: ContainerEditKind,
    pub old_clip: Clip,
    pub new_clip: Clip,
    pub rendered_media_path: Option<PathBuf>,
    pub track: usize,
    pub index: usize,
    pub do_filters_clone: bool,
}

/// Errors raised by timeline edits.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Clip {0:?} is not on the timeline")]
    ClipNotFound(ClipId),

    #[error("Track {track} index {index} no longer holds clip {expected:?}")]
    StalePosition {
        track: usize,
        index: usize,
        expected: ClipId,
    },

    #[error("Media not found: {0}")]
    MediaNotFound(PathBuf),

    #[error("Nothing to undo")]
    NothingToUndo,
}

/// Operations the render engine needs from the editor's timeline.
pub trait TimelineEditGateway {
    /// Current `(track, index)` of a clip. Must reflect the live timeline.
    fn track_and_index_for_id(&self, clip_id: ClipId) -> Option<(usize, usize)>;

    /// Build a new (not yet placed) clip playing `path`.
    fn create_file_producer_clip(
        &mut self,
        path: &Path,
        name: Option<&str>,
        validate: bool,
    ) -> Result<Clip, TimelineError>;

    /// Apply a replacement as a single undoable operation.
    fn apply_edit(&mut self, edit: ContainerEdit) -> Result<(), TimelineError>;
}

/// A track of clips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub clips: Vec<Clip>,
}

#[derive(Debug, Clone)]
struct AppliedEdit {
    track: usize,
    index: usize,
    replaced: Clip,
}

/// In-memory timeline.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub tracks: Vec<Track>,
    next_clip_id: u64,
    undo_stack: Vec<AppliedEdit>,
}

impl Sequence {
    pub fn with_tracks(count: usize) -> Self {
        Self {
            tracks: vec![Track::default(); count],
            ..Self::default()
        }
    }

    /// Append a clip to a track, assigning it a fresh id.
    pub fn append_clip(&mut self, track: usize, mut clip: Clip) -> ClipId {
        clip.id = self.next_id();
        let id = clip.id;
        if self.tracks.len() <= track {
            self.tracks.resize_with(track + 1, Track::default);
        }
        self.tracks[track].clips.push(clip);
        id
    }

    /// Remove a clip wherever it is.
    pub fn remove_clip(&mut self, clip_id: ClipId) -> Option<Clip> {
        let (track, index) = self.track_and_index_for_id(clip_id)?;
        Some(self.tracks[track].clips.remove(index))
    }

    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        let (track, index) = self.track_and_index_for_id(clip_id)?;
        self.tracks[track].clips.get(index)
    }

    pub fn clip_at(&self, track: usize, index: usize) -> Option<&Clip> {
        self.tracks.get(track)?.clips.get(index)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Revert the most recent container edit.
    pub fn undo(&mut self) -> Result<(), TimelineError> {
        let applied = self.undo_stack.pop().ok_or(TimelineError::NothingToUndo)?;
        let slot = self
            .tracks
            .get_mut(applied.track)
            .and_then(|t| t.clips.get_mut(applied.index))
            .ok_or(TimelineError::ClipNotFound(applied.replaced.id))?;
        *slot = applied.replaced;
        Ok(())
    }

    fn next_id(&mut self) -> ClipId {
        self.next_clip_id += 1;
        ClipId(self.next_clip_id)
    }
}

impl TimelineEditGateway for Sequence {
    fn track_and_index_for_id(&self, clip_id: ClipId) -> Option<(usize, usize)> {
        self.tracks.iter().enumerate().find_map(|(t, track)| {
            track
                .clips
                .iter()
                .position(|c| c.id == clip_id)
                .map(|i| (t, i))
        })
    }

    fn create_file_producer_clip(
        &mut self,
        path: &Path,
        name: Option<&str>,
        validate: bool,
    ) -> Result<Clip, TimelineError> {
        if validate && !media_exists(path) {
            return Err(TimelineError::MediaNotFound(path.to_path_buf()));
        }
        let name = name.map(str::to_string).unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Ok(Clip {
            id: self.next_id(),
            name,
            path: path.to_path_buf(),
            clip_in: 0,
            clip_out: 0,
            filters: vec![],
            container_data: None,
        })
    }

    fn apply_edit(&mut self, edit: ContainerEdit) -> Result<(), TimelineError> {
        let ContainerEdit {
            kind,
            old_clip,
            mut new_clip,
            track,
            index,
            do_filters_clone,
            ..
        } = edit;

        let slot = self
            .tracks
            .get_mut(track)
            .and_then(|t| t.clips.get_mut(index))
            .filter(|c| c.id == old_clip.id)
            .ok_or(TimelineError::StalePosition {
                track,
                index,
                expected: old_clip.id,
            })?;

        match kind {
            ContainerEditKind::FullRenderReplace => {
                new_clip.clip_in = slot.clip_in;
                new_clip.clip_out = slot.clip_out;
            }
            ContainerEditKind::ClipRenderReplace => {
                new_clip.clip_in = 0;
                new_clip.clip_out = slot.clip_out - slot.clip_in;
            }
            ContainerEditKind::SwitchToUnrendered => {
                let shift = slot
                    .container_data
                    .as_ref()
                    .filter(|d| d.last_render_type == Some(RenderKind::ClipLength))
                    .and_then(|d| d.rendered_media_range_in)
                    .unwrap_or(0);
                new_clip.clip_in = slot.clip_in + shift;
                new_clip.clip_out = slot.clip_out + shift;
            }
        }
        if do_filters_clone {
            new_clip.filters = slot.filters.clone();
        }

        let replaced = std::mem::replace(slot, new_clip);
        self.undo_stack.push(AppliedEdit {
            track,
            index,
            replaced,
        });
        Ok(())
    }
}

/// Whether a media path resolves. Image sequence handles
/// (`frame_%04d.png`) are checked through their directory.
fn media_exists(path: &Path) -> bool {
    if path.to_string_lossy().contains('%') {
        return path.parent().is_some_and(Path::is_dir);
    }
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerType;

    fn container_clip(clip_in: i64, clip_out: i64) -> Clip {
        Clip {
            id: ClipId(0),
            name: "gen".to_string(),
            path: PathBuf::from("/media/unrendered.mp4"),
            clip_in,
            clip_out,
            filters: vec!["brightness".to_string()],
            container_data: Some(ContainerData::new(
                ContainerType::ScriptGenerator,
                "/scripts/gen.py",
                "/media/unrendered.mp4",
            )),
        }
    }

    #[test]
    fn test_lookup_reflects_live_positions() {
        let mut seq = Sequence::with_tracks(2);
        let a = seq.append_clip(1, container_clip(0, 10));
        let b = seq.append_clip(1, container_clip(0, 10));
        assert_eq!(seq.track_and_index_for_id(b), Some((1, 1)));

        seq.remove_clip(a);
        assert_eq!(seq.track_and_index_for_id(b), Some((1, 0)));
        assert_eq!(seq.track_and_index_for_id(a), None);
    }

    #[test]
    fn test_clip_render_replace_rebases_range_and_clones_filters() {
        let mut seq = Sequence::with_tracks(1);
        let id = seq.append_clip(0, container_clip(20, 59));
        let old = seq.clip(id).cloned().unwrap();
        let new_clip = seq
            .create_file_producer_clip(Path::new("/render/container_clip.mp4"), None, false)
            .unwrap();
        let new_id = new_clip.id;

        seq.apply_edit(ContainerEdit {
            kind: ContainerEditKind::ClipRenderReplace,
            old_clip: old,
            new_clip,
            rendered_media_path: None,
            track: 0,
            index: 0,
            do_filters_clone: true,
        })
        .unwrap();

        let placed = seq.clip(new_id).unwrap();
        assert_eq!((placed.clip_in, placed.clip_out), (0, 39));
        assert_eq!(placed.filters, vec!["brightness".to_string()]);
        assert_eq!(seq.undo_depth(), 1);
    }

    #[test]
    fn test_stale_position_is_rejected_without_mutation() {
        let mut seq = Sequence::with_tracks(1);
        let id = seq.append_clip(0, container_clip(0, 9));
        let old = seq.clip(id).cloned().unwrap();
        let new_clip = seq
            .create_file_producer_clip(Path::new("/render/x.mp4"), None, false)
            .unwrap();

        let err = seq
            .apply_edit(ContainerEdit {
                kind: ContainerEditKind::FullRenderReplace,
                old_clip: old,
                new_clip,
                rendered_media_path: None,
                track: 0,
                index: 3,
                do_filters_clone: false,
            })
            .unwrap_err();
        assert!(matches!(err, TimelineError::StalePosition { .. }));
        assert_eq!(seq.clip(id).unwrap().path, PathBuf::from("/media/unrendered.mp4"));
    }

    #[test]
    fn test_undo_restores_replaced_clip() {
        let mut seq = Sequence::with_tracks(1);
        let id = seq.append_clip(0, container_clip(0, 9));
        let old = seq.clip(id).cloned().unwrap();
        let new_clip = seq
            .create_file_producer_clip(Path::new("/render/x.mp4"), Some("rendered"), false)
            .unwrap();
        seq.apply_edit(ContainerEdit {
            kind: ContainerEditKind::FullRenderReplace,
            old_clip: old,
            new_clip,
            rendered_media_path: None,
            track: 0,
            index: 0,
            do_filters_clone: false,
        })
        .unwrap();
        assert_eq!(seq.clip_at(0, 0).unwrap().name, "rendered");

        seq.undo().unwrap();
        assert_eq!(seq.clip_at(0, 0).unwrap().id, id);
        assert!(matches!(seq.undo(), Err(TimelineError::NothingToUndo)));
    }

    #[test]
    fn test_validated_producer_requires_media() {
        let mut seq = Sequence::default();
        let err = seq
            .create_file_producer_clip(Path::new("/definitely/missing.mp4"), None, true)
            .unwrap_err();
        assert!(matches!(err, TimelineError::MediaNotFound(_)));
    }
}
