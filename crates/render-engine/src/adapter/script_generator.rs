//! Script-based image generator.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value;

use montage_common::config::{RendererCommand, RendererConfig};
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{
    ContainerData, ContainerType, ProgramId, ProjectProfile, RenderData, GENERATOR_EDIT_DATA_SLOT,
};
use montage_session_store::{RawStatus, RenderSessionStore};

use super::{
    fractional_progress, frame_progress, step_text, LaunchContext, LaunchMode,
    NormalizedProgress, ProgramAdapter, ProgressContext, RenderRange, ValidationEnv,
    ValidationError,
};

/// One preview frame request for the generator script engine.
#[derive(Debug, Clone)]
pub struct PreviewRequest<'a> {
    pub script: &'a Path,
    pub frame: i64,
    pub length: u64,
    pub profile: &'a ProjectProfile,
    /// Where to write the frame; `None` only evaluates the script.
    pub output_dir: Option<&'a Path>,
    /// Edited parameter values to apply instead of the script defaults.
    pub editors: Option<&'a Value>,
}

/// What the script engine reports back after a preview render.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreviewContext {
    /// Script error, if evaluation failed.
    #[serde(default)]
    pub error: Option<String>,

    /// Script metadata: name, length, editable parameters.
    #[serde(default)]
    pub script_data: Option<Value>,

    /// Parameter groups declared by the script.
    #[serde(default)]
    pub groups: Value,

    /// Written frame, when an output folder was given.
    #[serde(default)]
    pub frame_file: Option<PathBuf>,
}

/// The generator script engine.
pub trait PreviewRenderer: Send + Sync {
    fn render_preview(&self, request: &PreviewRequest<'_>) -> MontageResult<PreviewContext>;
}

/// Runs the headless generator in preview mode and reads its JSON answer
/// from stdout.
#[derive(Debug, Clone)]
pub struct SubprocessPreviewRenderer {
    command: RendererCommand,
}

impl SubprocessPreviewRenderer {
    pub fn new(command: RendererCommand) -> Self {
        Self { command }
    }
}

impl PreviewRenderer for SubprocessPreviewRenderer {
    fn render_preview(&self, request: &PreviewRequest<'_>) -> MontageResult<PreviewContext> {
        let mut args = vec![
            "mode:preview".to_string(),
            format!("script:{}", request.script.display()),
            format!("frame:{}", request.frame),
            format!("length:{}", request.length),
            format!("profile_desc:{}", request.profile.descriptor_arg()),
        ];
        if let Some(dir) = request.output_dir {
            args.push(format!("output_folder:{}", dir.display()));
        }
        if let Some(editors) = request.editors {
            args.push(format!("editors:{editors}"));
        }

        tracing::debug!(program = %self.command.program.display(), ?args, "Running generator preview");
        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                MontageError::render(format!(
                    "Failed to start generator {}: {e}",
                    self.command.program.display()
                ))
            })?;

        match serde_json::from_slice::<PreviewContext>(&output.stdout) {
            Ok(context) => Ok(context),
            Err(_) if !output.status.success() => Err(MontageError::render(format!(
                "Generator preview failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) => Err(MontageError::render(format!(
                "Generator preview answer is not valid JSON: {e}"
            ))),
        }
    }
}

/// Adapter for [`ContainerType::ScriptGenerator`].
///
/// The renderer treats `range_out` as exclusive and reports one or two
/// steps: frame writing, then optional encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptGeneratorAdapter;

impl ProgramAdapter for ScriptGeneratorAdapter {
    fn container_type(&self) -> ContainerType {
        ContainerType::ScriptGenerator
    }

    fn launch_mode(&self) -> LaunchMode {
        LaunchMode::Thread
    }

    fn validate(
        &self,
        data: &mut ContainerData,
        env: &ValidationEnv<'_>,
    ) -> Result<(), ValidationError> {
        if !data.program.is_file() {
            return Err(ValidationError::new(format!(
                "Generator script not found: {}",
                data.program.display()
            )));
        }
        let length = *data
            .unrendered_length
            .get_or_insert(env.default_generator_length);

        let context = env
            .preview_renderer
            .render_preview(&PreviewRequest {
                script: &data.program,
                frame: 0,
                length,
                profile: env.profile,
                output_dir: None,
                editors: None,
            })
            .map_err(|e| ValidationError::new(e.to_string()))?;

        if let Some(error) = context.error {
            return Err(ValidationError::new(error));
        }

        let mut edit_data = context
            .script_data
            .unwrap_or_else(|| Value::Object(Default::default()));
        let Some(fields) = edit_data.as_object_mut() else {
            return Err(ValidationError::new(
                "Generator script data is not a JSON object",
            ));
        };
        fields.insert("groups_list".to_string(), context.groups);
        data.data_slots.insert(GENERATOR_EDIT_DATA_SLOT, edit_data);
        Ok(())
    }

    fn default_render_data(&self, profile: &ProjectProfile) -> RenderData {
        RenderData {
            do_video_render: false,
            ..RenderData::default_for_profile(profile)
        }
    }

    fn normalize_range(&self, range: RenderRange) -> RenderRange {
        RenderRange {
            range_out: range.range_out + 1,
            ..range
        }
    }

    fn build_launch_args(&self, ctx: &LaunchContext<'_>) -> Vec<String> {
        let data = ctx.container_data;
        vec![
            format!("session_id:{}", ctx.program_id),
            format!("parent_folder:{}", ctx.parent_folder.display()),
            format!("script:{}", data.program.display()),
            format!("generator_length:{}", ctx.generator_length),
            format!("range_in:{}", ctx.range.range_in),
            format!("range_out:{}", ctx.range.range_out),
            format!("profile_desc:{}", ctx.profile.descriptor_arg()),
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

        let step_count = 1 + ctx.render_data.encode_step_count();
        let (step_name, offset) = if step == 1 {
            ("Writing Clip Frames", ctx.range.start_offset)
        } else {
            ("Encoding Video", 0)
        };
        NormalizedProgress {
            progress: frame_progress(ctx.render_kind, frame, length, ctx.range, offset),
            text: step_text(step, step_count, step_name, ctx.job_name),
            elapsed,
        }
    }

    fn job_name(&self, data: &ContainerData) -> String {
        data.data_slots
            .generator_edit_data()
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.program_name())
    }

    fn prepare_session(
        &self,
        store: &RenderSessionStore,
        program_id: &ProgramId,
        data: &ContainerData,
    ) -> MontageResult<()> {
        if let Some(edit_data) = data.data_slots.generator_edit_data() {
            store.write_misc_session_data(program_id, GENERATOR_EDIT_DATA_SLOT, edit_data)?;
        }
        Ok(())
    }

    fn renderer_command<'a>(&self, renderers: &'a RendererConfig) -> &'a RendererCommand {
        &renderers.script_generator
    }
}
