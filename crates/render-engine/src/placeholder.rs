//! Placeholder media for new container clips.
//!
//! Before a container clip has been rendered it plays a stand-in video made
//! from a still image. The encode runs on a worker thread that waits on
//! `ffmpeg` while watching a stop flag, then hands the result to a callback.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use montage_common::error::{MontageError, MontageResult};
use montage_project_model::ProjectProfile;

/// File name of the placeholder video inside the cache dir.
pub const UNRENDERED_CLIP_NAME: &str = "unrendered_clip.mp4";

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Called once the placeholder encode ends.
pub type PlaceholderCallback = Box<dyn FnOnce(MontageResult<PathBuf>) + Send>;

/// A placeholder encode in flight.
#[derive(Debug)]
pub struct PlaceholderRender {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PlaceholderRender {
    /// Ask the worker to kill the encoder and finish.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to finish.
    pub fn join(self) -> MontageResult<()> {
        self.handle
            .join()
            .map_err(|_| MontageError::render("Placeholder worker panicked"))
    }
}

/// `ffmpeg` arguments encoding `length` frames of `image_file`.
pub fn placeholder_args(
    image_file: &Path,
    length: u64,
    profile: &ProjectProfile,
    out: &Path,
) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        format!("{}/{}", profile.fps_num, profile.fps_den.max(1)),
        "-i".to_string(),
        image_file.display().to_string(),
        "-frames:v".to_string(),
        length.to_string(),
        "-vf".to_string(),
        format!(
            "scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2",
            profile.width, profile.height, profile.width, profile.height
        ),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        out.display().to_string(),
    ]
}

/// Start encoding `cache_dir/unrendered_clip.mp4` from a still image.
///
/// Any earlier placeholder file is removed first. `callback` receives the
/// written path, or the error that stopped the encode.
pub fn create_unrendered_clip(
    length: u64,
    image_file: &Path,
    profile: &ProjectProfile,
    cache_dir: &Path,
    callback: PlaceholderCallback,
) -> MontageResult<PlaceholderRender> {
    if !image_file.is_file() {
        return Err(MontageError::FileNotFound {
            path: image_file.to_path_buf(),
        });
    }
    std::fs::create_dir_all(cache_dir)?;
    let out = cache_dir.join(UNRENDERED_CLIP_NAME);
    match std::fs::remove_file(&out) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let args = placeholder_args(image_file, length, profile, &out);
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    tracing::info!(image = %image_file.display(), length, "Rendering placeholder media");
    let handle = std::thread::Builder::new()
        .name("placeholder-render".to_string())
        .spawn(move || {
            let result = run_encoder(&args, &out, &worker_stop);
            callback(result);
        })?;

    Ok(PlaceholderRender { stop, handle })
}

fn run_encoder(args: &[String], out: &Path, stop: &AtomicBool) -> MontageResult<PathBuf> {
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| MontageError::render(format!("Failed to start ffmpeg: {e}")))?;

    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                tracing::info!(path = %out.display(), "Placeholder media written");
                return Ok(out.to_path_buf());
            }
            return Err(MontageError::render(format!(
                "Placeholder encode failed (status {status})"
            )));
        }
        if stop.load(Ordering::SeqCst) {
            child.kill()?;
            child.wait()?;
            return Err(MontageError::render("Placeholder encode cancelled"));
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_use_profile_geometry() {
        let profile = ProjectProfile::new("HD 720p 25 fps", 1280, 720, 25);
        let args = placeholder_args(Path::new("/img/still.png"), 120, &profile, Path::new("/c/u.mp4"));
        let frames = args.iter().position(|a| a == "-frames:v").unwrap();
        assert_eq!(args[frames + 1], "120");
        assert!(args.iter().any(|a| a == "25/1"));
        assert!(args.iter().any(|a| a.starts_with("scale=1280:720")));
        assert_eq!(args.last().unwrap(), "/c/u.mp4");
    }

    #[test]
    fn test_missing_image_is_rejected_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_unrendered_clip(
            10,
            &dir.path().join("none.png"),
            &ProjectProfile::default(),
            dir.path(),
            Box::new(|_| {}),
        )
        .unwrap_err();
        assert!(matches!(err, MontageError::FileNotFound { .. }));
    }
}
