//! Render output configuration and project profile.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Base name of the rendered video file when it is stored inside the session.
pub const CONTAINER_CLIP_VIDEO_CLIP_NAME: &str = "container_clip";

/// Frame file name prefix used for rendered frame sequences.
pub const DEFAULT_FRAME_NAME: &str = "frame";

/// Video/audio profile of the project the clip lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectProfile {
    /// Human-readable profile description ("HD 1080p 30 fps").
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
}

impl ProjectProfile {
    pub fn new(description: impl Into<String>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            description: description.into(),
            width,
            height,
            fps_num: fps,
            fps_den: 1,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps_num as f64 / self.fps_den.max(1) as f64
    }

    /// Profile description as passed on renderer command lines.
    ///
    /// Renderer arguments are split on whitespace, so spaces become
    /// underscores.
    pub fn descriptor_arg(&self) -> String {
        self.description.replace(' ', "_")
    }
}

impl Default for ProjectProfile {
    fn default() -> Self {
        Self::new("HD 1080p 30 fps", 1920, 1080, 30)
    }
}

/// Encoded video container/codec of a video render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoFormat {
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    #[serde(rename = "mov-prores")]
    MovProRes,
    #[serde(rename = "webm")]
    Webm,
}

impl VideoFormat {
    /// File extension including the leading dot.
    pub fn file_extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4H264 | VideoFormat::Mp4H265 => ".mp4",
            VideoFormat::MovProRes => ".mov",
            VideoFormat::Webm => ".webm",
        }
    }
}

/// Encoding configuration of a container clip render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderData {
    /// Store output inside the session directory rather than `render_dir`.
    pub save_internally: bool,

    /// External output folder, used when `save_internally` is false.
    pub render_dir: PathBuf,

    /// Output file base name for external video renders.
    pub file_name: String,

    /// Encode a video file; otherwise the frame sequence is the media.
    pub do_video_render: bool,

    pub video_format: VideoFormat,

    /// Target video bitrate in kbps (0 = encoder default).
    #[serde(default)]
    pub video_bitrate_kbps: u32,

    /// Prefix of rendered frame files.
    #[serde(default = "default_frame_name")]
    pub frame_name: String,

    /// Profile the render was configured for.
    pub profile: ProjectProfile,
}

fn default_frame_name() -> String {
    DEFAULT_FRAME_NAME.to_string()
}

impl RenderData {
    /// Default configuration for a container clip render in `profile`.
    pub fn default_for_profile(profile: &ProjectProfile) -> Self {
        Self {
            save_internally: true,
            render_dir: PathBuf::new(),
            file_name: "movie".to_string(),
            do_video_render: true,
            video_format: VideoFormat::Mp4H264,
            video_bitrate_kbps: 0,
            frame_name: default_frame_name(),
            profile: profile.clone(),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        self.video_format.file_extension()
    }

    /// Number of progress steps a renderer reports: frames are always
    /// written, encoding is an extra step.
    pub fn encode_step_count(&self) -> u32 {
        u32::from(self.do_video_render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_arg_replaces_spaces() {
        let profile = ProjectProfile::new("HD 720p 25 fps", 1280, 720, 25);
        assert_eq!(profile.descriptor_arg(), "HD_720p_25_fps");
    }

    #[test]
    fn test_default_render_data_uses_profile() {
        let profile = ProjectProfile::new("SD PAL", 720, 576, 25);
        let data = RenderData::default_for_profile(&profile);
        assert!(data.save_internally);
        assert!(data.do_video_render);
        assert_eq!(data.profile, profile);
        assert_eq!(data.file_extension(), ".mp4");
    }

    #[test]
    fn test_render_data_defaults_frame_name_for_older_documents() {
        let mut value =
            serde_json::to_value(RenderData::default_for_profile(&ProjectProfile::default()))
                .unwrap();
        value.as_object_mut().unwrap().remove("frame_name");
        let parsed: RenderData = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.frame_name, "frame");
    }
}
