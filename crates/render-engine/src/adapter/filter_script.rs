//! Filter script applied to the frames of a source clip.

use std::fs::File;
use std::process::{Command, Stdio};

use montage_common::config::{RendererCommand, RendererConfig};
use montage_project_model::{ContainerData, ContainerType};
use montage_session_store::RawStatus;

use super::{
    fractional_progress, frame_progress, step_text, LaunchContext, NormalizedProgress,
    ProgramAdapter, ProgressContext, ValidationEnv, ValidationError,
};

/// Log of the last validation run, inside the cache dir.
pub const FILTER_VALIDATION_LOG: &str = "filter_script_validation.log";

/// Known-good input image inside the resources dir.
const VALIDATION_INPUT_IMAGE: &str = "filter_validation_input.png";

const VALIDATION_OUTPUT_IMAGE: &str = "filter_validation_output.png";

/// Adapter for [`ContainerType::FilterScript`].
///
/// The renderer reports three steps: source frame extraction, filter
/// script run, then optional encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterScriptAdapter;

impl ProgramAdapter for FilterScriptAdapter {
    fn container_type(&self) -> ContainerType {
        ContainerType::FilterScript
    }

    fn validate(
        &self,
        data: &mut ContainerData,
        env: &ValidationEnv<'_>,
    ) -> Result<(), ValidationError> {
        let script = std::fs::read_to_string(&data.program).map_err(|e| {
            ValidationError::new(format!(
                "Failed to read filter script {}: {e}",
                data.program.display()
            ))
        })?;

        let log_path = env.cache_dir.join(FILTER_VALIDATION_LOG);
        let log = File::create(&log_path)
            .map_err(|e| ValidationError::new(format!("Failed to create validation log: {e}")))?;
        let log_err = log
            .try_clone()
            .map_err(|e| ValidationError::new(format!("Failed to create validation log: {e}")))?;

        let status = Command::new(env.filter_interpreter)
            .arg(env.resources_dir.join(VALIDATION_INPUT_IMAGE))
            .args(script.split_whitespace())
            .arg("-output")
            .arg(env.cache_dir.join(VALIDATION_OUTPUT_IMAGE))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .map_err(|e| {
                ValidationError::new(format!(
                    "Failed to run filter interpreter {}: {e}",
                    env.filter_interpreter.display()
                ))
            })?;

        if status.success() {
            return Ok(());
        }

        tracing::info!(
            program = %data.program.display(),
            status = %status,
            "Filter script validation failed"
        );
        let detail = std::fs::read_to_string(&log_path)
            .unwrap_or_else(|e| format!("Filter interpreter exited with {status}; log unreadable: {e}"));
        Err(ValidationError::new(detail))
    }

    fn build_launch_args(&self, ctx: &LaunchContext<'_>) -> Vec<String> {
        let data = ctx.container_data;
        vec![
            format!("session_id:{}", ctx.program_id),
            format!("parent_folder:{}", ctx.parent_folder.display()),
            format!("script:{}", data.program.display()),
            format!("clip_path:{}", data.unrendered_media.display()),
            format!("range_in:{}", ctx.range.range_in),
            format!("range_out:{}", ctx.range.range_out),
            format!("profile_desc:{}", ctx.profile.descriptor_arg()),
            format!("gmic_frame_offset:{}", ctx.range.start_offset),
        ]
    }

    fn interpret_status(&self, raw: &RawStatus, ctx: &ProgressContext<'_>) -> NormalizedProgress {
        let RawStatus::Stepped {
            step,
            frame,
            length,
            elapsed,
        } = *raw
        else {
            return fractional_progress(raw, ctx);
        };

        let step_count = 2 + ctx.render_data.encode_step_count();
        let (step_name, offset) = match step {
            1 => ("Writing Clip Frames", ctx.range.start_offset),
            2 => ("Rendering Filter Script", 0),
            _ => ("Encoding Video", 0),
        };
        NormalizedProgress {
            progress: frame_progress(ctx.render_kind, frame, length, ctx.range, offset),
            text: step_text(step, step_count, step_name, ctx.job_name),
            elapsed,
        }
    }

    fn job_name(&self, data: &ContainerData) -> String {
        data.unrendered_media_name()
    }

    fn renderer_command<'a>(&self, renderers: &'a RendererConfig) -> &'a RendererCommand {
        &renderers.filter_script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{PreviewContext, PreviewRenderer, PreviewRequest, RenderRange};
    use montage_common::error::MontageResult;
    use montage_project_model::{ProjectProfile, RenderData, RenderKind};
    use std::path::Path;

    struct NoPreview;

    impl PreviewRenderer for NoPreview {
        fn render_preview(&self, _request: &PreviewRequest<'_>) -> MontageResult<PreviewContext> {
            Ok(PreviewContext::default())
        }
    }

    #[cfg(unix)]
    fn write_interpreter(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-gmic");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn validate_with(interpreter_body: &str) -> (tempfile::TempDir, Result<(), ValidationError>) {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_interpreter(dir.path(), interpreter_body);
        let script = dir.path().join("blur.gmic");
        std::fs::write(&script, "-blur 3 -sharpen 10").unwrap();
        let mut data =
            ContainerData::new(ContainerType::FilterScript, script, dir.path().join("src.mp4"));
        let profile = ProjectProfile::default();
        let env = ValidationEnv {
            cache_dir: dir.path(),
            resources_dir: dir.path(),
            filter_interpreter: &interpreter,
            default_generator_length: 200,
            profile: &profile,
            preview_renderer: &NoPreview,
        };
        let result = FilterScriptAdapter.validate(&mut data, &env);
        (dir, result)
    }

    #[cfg(unix)]
    #[test]
    fn test_validation_passes_on_zero_exit() {
        let (dir, result) = validate_with("echo \"$@\"; exit 0");
        result.unwrap();
        let log = std::fs::read_to_string(dir.path().join(FILTER_VALIDATION_LOG)).unwrap();
        assert!(log.contains("-blur 3 -sharpen 10 -output"));
    }

    #[cfg(unix)]
    #[test]
    fn test_validation_returns_log_on_failure() {
        let (_dir, result) = validate_with("echo '*** Error *** unknown command' >&2; exit 1");
        let err = result.unwrap_err();
        assert!(err.detail.contains("unknown command"));
    }

    #[test]
    fn test_missing_script_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = ContainerData::new(
            ContainerType::FilterScript,
            dir.path().join("missing.gmic"),
            dir.path().join("src.mp4"),
        );
        let profile = ProjectProfile::default();
        let env = ValidationEnv {
            cache_dir: dir.path(),
            resources_dir: dir.path(),
            filter_interpreter: Path::new("gmic"),
            default_generator_length: 200,
            profile: &profile,
            preview_renderer: &NoPreview,
        };
        let err = FilterScriptAdapter.validate(&mut data, &env).unwrap_err();
        assert!(err.detail.contains("missing.gmic"));
    }

    #[test]
    fn test_first_step_subtracts_frame_offset() {
        let render_data = RenderData::default_for_profile(&ProjectProfile::default());
        let ctx = ProgressContext {
            render_kind: RenderKind::ClipLength,
            range: RenderRange::new(40, 80, 40).unwrap(),
            render_data: &render_data,
            job_name: "src.mp4",
            clip_name: "src",
        };
        let first = FilterScriptAdapter.interpret_status(
            &RawStatus::Stepped {
                step: 1,
                frame: 50,
                length: 40,
                elapsed: 1.0,
            },
            &ctx,
        );
        assert_eq!(first.progress, 0.25);
        assert_eq!(first.text, "Step 1 / 3 - Writing Clip Frames - src.mp4");

        let second = FilterScriptAdapter.interpret_status(
            &RawStatus::Stepped {
                step: 2,
                frame: 20,
                length: 40,
                elapsed: 2.0,
            },
            &ctx,
        );
        assert_eq!(second.progress, 0.5);
        assert_eq!(second.text, "Step 2 / 3 - Rendering Filter Script - src.mp4");
    }
}
