//! Program adapters.
//!
//! Each container type drives a different external renderer. An adapter
//! knows how that renderer is validated, launched and how it reports
//! progress; the orchestrator only talks to [`ProgramAdapter`].

mod filter_script;
mod project_xml;
mod script_generator;

use std::path::Path;

use montage_common::config::{RendererCommand, RendererConfig};
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{
    Clip, ContainerData, ContainerType, ProgramId, ProjectProfile, RenderData, RenderKind,
};
use montage_session_store::{RawStatus, RenderSessionStore};

use crate::jobs::JobType;

pub use filter_script::{FilterScriptAdapter, FILTER_VALIDATION_LOG};
pub use project_xml::ProjectXmlAdapter;
pub use script_generator::{
    PreviewContext, PreviewRenderer, PreviewRequest, ScriptGeneratorAdapter,
    SubprocessPreviewRenderer,
};

/// A user program failed its pre-render check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ValidationError {
    pub detail: String,
}

impl ValidationError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl From<ValidationError> for MontageError {
    fn from(err: ValidationError) -> Self {
        MontageError::validation(err.detail)
    }
}

/// How a renderer process is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Spawned on the calling thread.
    Direct,
    /// Spawned from a short-lived launcher thread.
    Thread,
}

/// Frame range of one render, in timeline frame numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRange {
    pub range_in: i64,
    pub range_out: i64,
    /// Frame the renderer's counter is measured from.
    pub start_offset: i64,
}

impl RenderRange {
    pub fn new(range_in: i64, range_out: i64, start_offset: i64) -> MontageResult<Self> {
        if range_out < range_in {
            return Err(MontageError::render(format!(
                "Render range out {range_out} precedes range in {range_in}"
            )));
        }
        Ok(Self {
            range_in,
            range_out,
            start_offset,
        })
    }

    /// The whole program output.
    pub fn full(unrendered_length: u64) -> Self {
        Self {
            range_in: 0,
            range_out: i64::try_from(unrendered_length).unwrap_or(i64::MAX),
            start_offset: 0,
        }
    }

    /// The part of the program under a timeline clip.
    pub fn clip_length(clip: &Clip) -> MontageResult<Self> {
        Self::new(clip.clip_in, clip.clip_out, clip.clip_in)
    }

    pub fn single_frame(frame: i64, start_offset: i64) -> Self {
        Self {
            range_in: frame,
            range_out: frame,
            start_offset,
        }
    }

    pub fn len(&self) -> i64 {
        self.range_out - self.range_in
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything validation may need from the environment.
pub struct ValidationEnv<'a> {
    pub cache_dir: &'a Path,
    pub resources_dir: &'a Path,
    pub filter_interpreter: &'a Path,
    pub default_generator_length: u64,
    pub profile: &'a ProjectProfile,
    pub preview_renderer: &'a dyn PreviewRenderer,
}

/// Inputs for building renderer arguments.
pub struct LaunchContext<'a> {
    pub program_id: &'a ProgramId,
    pub parent_folder: &'a Path,
    pub container_data: &'a ContainerData,
    /// Range after [`ProgramAdapter::normalize_range`].
    pub range: RenderRange,
    /// Declared generator output length, or the configured default.
    pub generator_length: u64,
    pub profile: &'a ProjectProfile,
}

/// Inputs for interpreting one status report.
pub struct ProgressContext<'a> {
    pub render_kind: RenderKind,
    pub range: RenderRange,
    pub render_data: &'a RenderData,
    pub job_name: &'a str,
    pub clip_name: &'a str,
}

/// A status report mapped into job queue terms.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProgress {
    /// Always within `[0, 1]`.
    pub progress: f64,
    pub text: String,
    pub elapsed: f64,
}

/// Strategy for one external renderer.
pub trait ProgramAdapter: Send + Sync {
    fn container_type(&self) -> ContainerType;

    fn job_type(&self) -> JobType {
        JobType::for_container(self.container_type())
    }

    fn launch_mode(&self) -> LaunchMode {
        LaunchMode::Direct
    }

    /// Check the user program before any render is attempted.
    ///
    /// May store metadata extracted from the program into `data`.
    fn validate(&self, data: &mut ContainerData, env: &ValidationEnv<'_>)
        -> Result<(), ValidationError>;

    /// Render configuration used when the clip has none yet.
    fn default_render_data(&self, profile: &ProjectProfile) -> RenderData {
        RenderData::default_for_profile(profile)
    }

    /// Convert a timeline range into the renderer's convention.
    fn normalize_range(&self, range: RenderRange) -> RenderRange {
        range
    }

    /// Flat `key:value` argument list for the renderer.
    fn build_launch_args(&self, ctx: &LaunchContext<'_>) -> Vec<String>;

    fn interpret_status(&self, raw: &RawStatus, ctx: &ProgressContext<'_>) -> NormalizedProgress;

    /// Name shown in the job queue.
    fn job_name(&self, data: &ContainerData) -> String;

    /// Extra session files written before launch.
    fn prepare_session(
        &self,
        _store: &RenderSessionStore,
        _program_id: &ProgramId,
        _data: &ContainerData,
    ) -> MontageResult<()> {
        Ok(())
    }

    /// Which configured executable runs this renderer.
    fn renderer_command<'a>(&self, renderers: &'a RendererConfig) -> &'a RendererCommand;
}

/// Adapter for a container type.
pub fn adapter_for(container_type: ContainerType) -> Box<dyn ProgramAdapter> {
    match container_type {
        ContainerType::ScriptGenerator => Box::new(ScriptGeneratorAdapter),
        ContainerType::FilterScript => Box::new(FilterScriptAdapter),
        ContainerType::ProjectXml => Box::new(ProjectXmlAdapter),
    }
}

/// Clamp a computed progress value into `[0, 1]`.
///
/// Renderers may overshoot the requested range by a few frames and offset
/// math can go negative; both are reported as the nearest bound.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        return 0.0;
    }
    progress.clamp(0.0, 1.0)
}

/// Progress of a frame counter.
///
/// Full renders measure against the length the renderer reports; other
/// kinds measure `frame - offset` against the requested range length.
pub(crate) fn frame_progress(
    kind: RenderKind,
    frame: i64,
    reported_length: i64,
    range: RenderRange,
    offset: i64,
) -> f64 {
    let raw = match kind {
        RenderKind::Full => {
            if reported_length <= 0 {
                0.0
            } else {
                frame as f64 / reported_length as f64
            }
        }
        RenderKind::ClipLength | RenderKind::SinglePreview => {
            (frame - offset) as f64 / range.len().max(1) as f64
        }
    };
    clamp_progress(raw)
}

/// Common text for step based renderers.
pub(crate) fn step_text(step: u32, step_count: u32, step_name: &str, job_name: &str) -> String {
    format!("Step {step} / {step_count} - {step_name} - {job_name}")
}

/// Progress of a fractional report, for adapters that usually step.
pub(crate) fn fractional_progress(raw: &RawStatus, ctx: &ProgressContext<'_>) -> NormalizedProgress {
    let progress = match raw {
        RawStatus::Fractional { fraction, .. } => clamp_progress(*fraction),
        RawStatus::Stepped {
            frame, length, ..
        } => frame_progress(ctx.render_kind, *frame, *length, ctx.range, 0),
    };
    NormalizedProgress {
        progress,
        text: ctx.job_name.to_string(),
        elapsed: raw.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_matches_type() {
        for t in ContainerType::ALL {
            assert_eq!(adapter_for(t).container_type(), t);
        }
    }

    #[test]
    fn test_range_rejects_out_before_in() {
        assert!(RenderRange::new(10, 9, 10).is_err());
        assert!(RenderRange::new(10, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_frame_progress_full_uses_reported_length() {
        let range = RenderRange::full(200);
        assert_eq!(frame_progress(RenderKind::Full, 50, 200, range, 0), 0.25);
        assert_eq!(frame_progress(RenderKind::Full, 5, 0, range, 0), 0.0);
    }

    #[test]
    fn test_frame_progress_clip_length_subtracts_offset() {
        let range = RenderRange::new(100, 140, 100).unwrap();
        assert_eq!(frame_progress(RenderKind::ClipLength, 110, 0, range, 100), 0.25);
        assert_eq!(frame_progress(RenderKind::ClipLength, 90, 0, range, 100), 0.0);
        assert_eq!(frame_progress(RenderKind::ClipLength, 150, 0, range, 100), 1.0);
    }

    #[test]
    fn test_clamp_progress_handles_nan() {
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(-0.1), 0.0);
        assert_eq!(clamp_progress(1.2), 1.0);
    }
}
