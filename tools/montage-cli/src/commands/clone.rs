//! Duplicate a container clip.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_project_model::{Clip, ClipId, Sequence};
use montage_render_engine::ContainerActions;

use super::{load_clip, profile_for};

pub fn run(config: &AppConfig, clip: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    config.ensure_dirs()?;
    let source = Clip {
        id: ClipId(0),
        name: data.unrendered_media_name(),
        path: data
            .rendered_media
            .clone()
            .unwrap_or_else(|| data.unrendered_media.clone()),
        clip_in: 0,
        clip_out: data.unrendered_length.map_or(0, |l| l as i64 - 1),
        filters: vec![],
        container_data: Some(data.clone()),
    };

    let profile = profile_for(&data);
    let actions = ContainerActions::new(data, config, profile);
    let mut sequence = Sequence::with_tracks(1);
    let cloned = actions.clone_clip(&source, &mut sequence)?;

    let new_data = cloned
        .container_data
        .ok_or_else(|| anyhow::anyhow!("Clone lost its container data"))?;
    new_data
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to save clip: {e}"))?;

    println!("Cloned {} -> {}", clip.display(), output.display());
    println!("  Program id: {}", new_data.program_id());
    println!("  Media: {}", cloned.path.display());
    Ok(())
}
