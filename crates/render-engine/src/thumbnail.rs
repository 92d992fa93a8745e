//! Container clip thumbnails and type icons.
//!
//! Thumbnails are single PNG frames extracted with `ffmpeg`. Overlay
//! drawing belongs to the UI; this module only produces the files and
//! hands out the raw type icon images.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use montage_common::error::{MontageError, MontageResult};
use montage_project_model::ContainerType;

use crate::launcher::command_exists;

/// A written thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub path: PathBuf,
    /// Frame count of the source media, when known.
    pub length: Option<u64>,
}

/// Number of video frames in `path`, via `ffprobe`.
pub fn probe_frame_count(path: &Path) -> Option<u64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-count_packets",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    raw.lines().next()?.trim().parse::<u64>().ok()
}

/// Write the middle frame of `media` as a PNG at `out`.
pub fn write_thumbnail(media: &Path, out: &Path) -> MontageResult<Thumbnail> {
    if !media.exists() {
        return Err(MontageError::FileNotFound {
            path: media.to_path_buf(),
        });
    }
    if !command_exists("ffmpeg") {
        return Err(MontageError::unsupported(
            "Thumbnail extraction needs ffmpeg in PATH",
        ));
    }
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let length = probe_frame_count(media);
    let frame = length.map_or(0, |l| l / 2);

    let output = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(media)
        .arg("-vf")
        .arg(format!("select=eq(n\\,{frame})"))
        .args(["-frames:v", "1"])
        .arg(out)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| MontageError::render(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(MontageError::render(format!(
            "Thumbnail extraction failed (status {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    tracing::debug!(media = %media.display(), thumbnail = %out.display(), frame, "Wrote thumbnail");
    Ok(Thumbnail {
        path: out.to_path_buf(),
        length,
    })
}

static TYPE_ICONS: OnceLock<HashMap<ContainerType, Vec<u8>>> = OnceLock::new();

/// File name of the badge icon for a container type.
pub fn type_icon_file_name(container_type: ContainerType) -> String {
    format!("container_clip_{}.png", container_type.as_str())
}

/// PNG bytes of the badge icon for a container type.
///
/// Icons are read from `resources_dir` on first use and kept for the life
/// of the process; later calls ignore `resources_dir`. Icons missing on disk
/// stay missing.
pub fn type_icon(resources_dir: &Path, container_type: ContainerType) -> Option<&'static [u8]> {
    TYPE_ICONS
        .get_or_init(|| load_type_icons(resources_dir))
        .get(&container_type)
        .map(Vec::as_slice)
}

fn load_type_icons(resources_dir: &Path) -> HashMap<ContainerType, Vec<u8>> {
    ContainerType::ALL
        .into_iter()
        .filter_map(|t| {
            let path = resources_dir.join(type_icon_file_name(t));
            match std::fs::read(&path) {
                Ok(bytes) => Some((t, bytes)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Type icon unavailable");
                    None
                }
            }
        })
        .collect()
}
