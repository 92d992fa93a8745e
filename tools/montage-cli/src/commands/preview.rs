//! Generator previews and clip thumbnails.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_render_engine::ContainerActions;

use super::{load_clip, profile_for};

pub fn run(
    config: &AppConfig,
    clip: PathBuf,
    frame: i64,
    editors: Option<String>,
) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    config.ensure_dirs()?;
    let editors = editors
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid editors JSON: {e}"))?;

    let profile = profile_for(&data);
    let mut actions = ContainerActions::new(data, config, profile);
    let frame_file = actions.render_generator_preview(editors.as_ref(), frame)?;
    if let Some(editors) = editors {
        actions.apply_editors(editors)?;
    }

    actions
        .container_data()
        .save(&clip)
        .map_err(|e| anyhow::anyhow!("Failed to save clip: {e}"))?;
    println!("Preview frame {frame}: {}", frame_file.display());
    Ok(())
}

pub fn thumbnail(config: &AppConfig, clip: PathBuf) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    config.ensure_dirs()?;
    let profile = profile_for(&data);
    let actions = ContainerActions::new(data, config, profile);

    let thumbnail = actions.create_icon()?;
    println!("Thumbnail: {}", thumbnail.path.display());
    if let Some(length) = thumbnail.length {
        println!("  Length: {length} frames");
    }
    Ok(())
}
