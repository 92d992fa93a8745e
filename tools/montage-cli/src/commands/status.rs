//! Inspect or abort a render session.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_session_store::{RawStatus, RenderSessionStore};

use super::load_clip;

pub fn run(config: &AppConfig, clip: PathBuf) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    let store = RenderSessionStore::new(&config.container_clips_dir);
    let id = data.program_id();

    println!("Container clip: {}", clip.display());
    println!("  Type: {}", data.container_type);
    println!("  Program: {}", data.program.display());
    println!("  Program id: {id}");
    println!("  Session: {}", store.session_dir(&id).display());
    match &data.rendered_media {
        Some(media) => println!("  Rendered media: {}", media.display()),
        None => println!("  Rendered media: (none)"),
    }

    if !store.session_dir(&id).is_dir() {
        println!("\nNo render session.");
        return Ok(());
    }

    match store.get_status(&id) {
        Some(RawStatus::Stepped {
            step,
            frame,
            length,
            elapsed,
        }) => println!("  Status: step {step}, frame {frame}/{length}, {elapsed:.1}s"),
        Some(RawStatus::Fractional { fraction, elapsed }) => {
            println!("  Status: {:.1}%, {elapsed:.1}s", fraction * 100.0)
        }
        None => println!("  Status: (not reported)"),
    }
    println!("  Complete: {}", store.is_complete(&id));
    println!("  Abort requested: {}", store.abort_requested(&id));
    if let Some(error) = store.error(&id) {
        println!("  Error: {}", error.trim());
    }
    Ok(())
}

pub fn program_id(clip: PathBuf) -> anyhow::Result<()> {
    println!("{}", load_clip(&clip)?.program_id());
    Ok(())
}

pub fn abort(config: &AppConfig, clip: PathBuf) -> anyhow::Result<()> {
    let data = load_clip(&clip)?;
    let store = RenderSessionStore::new(&config.container_clips_dir);
    let id = data.program_id();
    if !store.session_dir(&id).is_dir() {
        anyhow::bail!("No render session for {id}");
    }
    store.abort(&id)?;
    println!("Abort requested for {id}");
    Ok(())
}
