//! Check renderer availability.

use montage_common::config::{AppConfig, RendererCommand};
use montage_project_model::ContainerType;
use montage_render_engine::command_exists;
use montage_render_engine::thumbnail::type_icon;

fn renderer_available(command: &RendererCommand) -> bool {
    if command.program.components().count() > 1 {
        return command.program.is_file();
    }
    command_exists(&command.program.to_string_lossy())
}

fn report(ok: bool, label: &str, detail: &str) {
    let tag = if ok { "OK" } else { "WARN" };
    println!("[{tag}] {label}: {detail}");
}

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Montage System Check");
    println!("{}", "=".repeat(50));

    let renderers = [
        ("Script generator renderer", &config.renderers.script_generator),
        ("Filter script renderer", &config.renderers.filter_script),
        ("Project XML renderer", &config.renderers.project_xml),
    ];
    let mut all_ok = true;
    for (label, command) in renderers {
        let ok = renderer_available(command);
        all_ok &= ok;
        report(ok, label, &command.program.display().to_string());
    }

    let interpreter = RendererCommand::new(&config.renderers.filter_interpreter);
    report(
        renderer_available(&interpreter),
        "Filter interpreter",
        &config.renderers.filter_interpreter.display().to_string(),
    );
    for tool in ["ffmpeg", "ffprobe"] {
        report(command_exists(tool), tool, "placeholder media and thumbnails");
    }

    let icons = ContainerType::ALL
        .into_iter()
        .filter(|t| type_icon(&config.resources_dir, *t).is_some())
        .count();
    report(
        icons == ContainerType::ALL.len(),
        "Type icons",
        &format!("{icons}/{} in {}", ContainerType::ALL.len(), config.resources_dir.display()),
    );

    println!();
    println!("  Sessions: {}", config.container_clips_dir.display());
    println!("  Cache: {}", config.cache_dir.display());

    println!();
    if all_ok {
        println!("All renderers are available. Montage is ready.");
    } else {
        println!("Some renderers are missing. Set their paths in the config file.");
    }
    Ok(())
}
