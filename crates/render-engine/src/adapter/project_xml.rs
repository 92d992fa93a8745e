//! Project file rendered by the embedded project-XML renderer.

use montage_common::config::{RendererCommand, RendererConfig};
use montage_project_model::{ContainerData, ContainerType};
use montage_session_store::RawStatus;

use super::{
    clamp_progress, frame_progress, LaunchContext, NormalizedProgress, ProgramAdapter,
    ProgressContext, ValidationEnv, ValidationError,
};

/// Adapter for [`ContainerType::ProjectXml`].
///
/// Project files are written by the editor itself, so there is nothing to
/// validate. The renderer reports a single fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectXmlAdapter;

impl ProgramAdapter for ProjectXmlAdapter {
    fn container_type(&self) -> ContainerType {
        ContainerType::ProjectXml
    }

    fn validate(
        &self,
        _data: &mut ContainerData,
        _env: &ValidationEnv<'_>,
    ) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build_launch_args(&self, ctx: &LaunchContext<'_>) -> Vec<String> {
        let data = ctx.container_data;
        vec![
            format!("session_id:{}", ctx.program_id),
            format!("parent_folder:{}", ctx.parent_folder.display()),
            format!("clip_path:{}", data.unrendered_media.display()),
            format!("range_in:{}", ctx.range.range_in),
            format!("range_out:{}", ctx.range.range_out),
            format!("profile_desc:{}", ctx.profile.descriptor_arg()),
            format!("xml_file_path:{}", data.program.display()),
        ]
    }

    fn interpret_status(&self, raw: &RawStatus, ctx: &ProgressContext<'_>) -> NormalizedProgress {
        let progress = match *raw {
            RawStatus::Fractional { fraction, .. } => clamp_progress(fraction),
            RawStatus::Stepped { frame, length, .. } => {
                frame_progress(ctx.render_kind, frame, length, ctx.range, ctx.range.start_offset)
            }
        };
        let text = if ctx.render_data.do_video_render {
            format!("Video for: {}", ctx.clip_name)
        } else {
            format!("Image Sequence for: {}", ctx.clip_name)
        };
        NormalizedProgress {
            progress,
            text,
            elapsed: raw.elapsed(),
        }
    }

    fn job_name(&self, data: &ContainerData) -> String {
        data.unrendered_media_name()
    }

    fn renderer_command<'a>(&self, renderers: &'a RendererConfig) -> &'a RendererCommand {
        &renderers.project_xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RenderRange;
    use montage_project_model::{ProjectProfile, RenderData, RenderKind};
    use std::path::Path;

    #[test]
    fn test_fraction_is_clamped_and_labelled() {
        let video = RenderData::default_for_profile(&ProjectProfile::default());
        let frames = RenderData {
            do_video_render: false,
            ..video.clone()
        };
        let mut ctx = ProgressContext {
            render_kind: RenderKind::Full,
            range: RenderRange::full(100),
            render_data: &video,
            job_name: "seq.xml",
            clip_name: "Sequence 2",
        };
        let progress = ProjectXmlAdapter.interpret_status(
            &RawStatus::Fractional {
                fraction: 1.03,
                elapsed: 9.0,
            },
            &ctx,
        );
        assert_eq!(progress.progress, 1.0);
        assert_eq!(progress.text, "Video for: Sequence 2");
        assert_eq!(progress.elapsed, 9.0);

        ctx.render_data = &frames;
        let progress = ProjectXmlAdapter.interpret_status(
            &RawStatus::Fractional {
                fraction: 0.4,
                elapsed: 1.0,
            },
            &ctx,
        );
        assert_eq!(progress.text, "Image Sequence for: Sequence 2");
    }

    #[test]
    fn test_launch_args_carry_xml_path() {
        let data = ContainerData::new(
            ContainerType::ProjectXml,
            "/projects/seq.xml",
            "/projects/seq.xml",
        );
        let id = data.program_id();
        let profile = ProjectProfile::default();
        let args = ProjectXmlAdapter.build_launch_args(&LaunchContext {
            program_id: &id,
            parent_folder: Path::new("/clips"),
            container_data: &data,
            range: RenderRange::new(5, 25, 5).unwrap(),
            generator_length: 0,
            profile: &profile,
        });
        assert_eq!(args.len(), 7);
        assert_eq!(args[2], "clip_path:/projects/seq.xml");
        assert_eq!(args[3], "range_in:5");
        assert_eq!(args[4], "range_out:25");
        assert_eq!(args[6], "xml_file_path:/projects/seq.xml");
    }
}
