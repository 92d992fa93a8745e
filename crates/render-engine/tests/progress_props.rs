//! Property tests for progress normalization and render ranges.

use montage_project_model::{ContainerType, ProjectProfile, RenderData, RenderKind};
use montage_render_engine::adapter::{adapter_for, clamp_progress, ProgressContext, RenderRange};
use montage_session_store::RawStatus;
use proptest::prelude::*;

fn kind() -> impl Strategy<Value = RenderKind> {
    prop_oneof![
        Just(RenderKind::Full),
        Just(RenderKind::ClipLength),
        Just(RenderKind::SinglePreview),
    ]
}

fn container_type() -> impl Strategy<Value = ContainerType> {
    prop_oneof![
        Just(ContainerType::ScriptGenerator),
        Just(ContainerType::FilterScript),
        Just(ContainerType::ProjectXml),
    ]
}

proptest! {
    #[test]
    fn clamp_stays_in_unit_interval(value in prop::num::f64::ANY) {
        let clamped = clamp_progress(value);
        prop_assert!((0.0..=1.0).contains(&clamped));
    }

    #[test]
    fn range_out_never_precedes_range_in(range_in in -1000i64..1000, range_out in -1000i64..1000) {
        let range = RenderRange::new(range_in, range_out, range_in);
        prop_assert_eq!(range.is_ok(), range_out >= range_in);
        if let Ok(range) = range {
            prop_assert!(range.len() >= 0);
        }
    }

    #[test]
    fn interpreted_progress_is_bounded(
        container_type in container_type(),
        render_kind in kind(),
        step in 1u32..4,
        frame in -500i64..5000,
        length in -10i64..2000,
        fraction in -2.0f64..3.0,
        range_in in 0i64..500,
        span in 0i64..500,
        do_video_render in any::<bool>(),
    ) {
        let adapter = adapter_for(container_type);
        let mut render_data = RenderData::default_for_profile(&ProjectProfile::default());
        render_data.do_video_render = do_video_render;
        let range = RenderRange::new(range_in, range_in + span, range_in).unwrap();
        let ctx = ProgressContext {
            render_kind,
            range: adapter.normalize_range(range),
            render_data: &render_data,
            job_name: "job",
            clip_name: "clip",
        };

        for raw in [
            RawStatus::Stepped { step, frame, length, elapsed: 1.0 },
            RawStatus::Fractional { fraction, elapsed: 1.0 },
        ] {
            let normalized = adapter.interpret_status(&raw, &ctx);
            prop_assert!((0.0..=1.0).contains(&normalized.progress));
            prop_assert!(!normalized.text.is_empty());
        }
    }
}
