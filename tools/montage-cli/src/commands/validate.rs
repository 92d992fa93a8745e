//! Validate the program of a container clip.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_render_engine::ContainerActions;

use super::{load_clip, profile_for};

pub fn run(config: &AppConfig, clip: PathBuf) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    println!("Validating {} program: {}", data.container_type, data.program.display());

    config.ensure_dirs()?;
    let profile = profile_for(&data);
    let mut actions = ContainerActions::new(data, config, profile);

    if let Err(e) = actions.validate_program() {
        println!("\nValidation failed:");
        for line in e.detail.lines() {
            println!("  {line}");
        }
        anyhow::bail!("program is not renderable");
    }

    if let Some(edit_data) = actions.container_data().data_slots.generator_edit_data() {
        if let Some(name) = edit_data.get("name").and_then(|v| v.as_str()) {
            println!("  Generator: {name}");
        }
    }

    actions
        .container_data()
        .save(&clip)
        .map_err(|e| anyhow::anyhow!("Failed to save clip: {e}"))?;
    println!("\nProgram is valid.");
    Ok(())
}
