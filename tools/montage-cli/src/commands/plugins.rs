//! List generator plugins.

use std::path::PathBuf;

use montage_project_model::PluginLibrary;

pub fn run(dir: PathBuf) -> anyhow::Result<()> {
    let library = PluginLibrary::load(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to load plugin library: {e}"))?;

    for group in library.groups() {
        println!("{}", group.category);
        for plugin in &group.plugins {
            let script = library.script_path(plugin);
            let marker = if script.is_file() { "" } else { " (script missing)" };
            println!("  {} -> {}{marker}", plugin.name, script.display());
        }
    }
    Ok(())
}
