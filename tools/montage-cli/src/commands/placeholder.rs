//! Encode placeholder media from a still image.

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_project_model::ProjectProfile;
use montage_render_engine::placeholder::create_unrendered_clip;

pub async fn run(config: &AppConfig, image: PathBuf, length: u64) -> anyhow::Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let render = create_unrendered_clip(
        length,
        &image,
        &ProjectProfile::default(),
        &config.cache_dir,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    )?;
    println!("Encoding {length} frames from {}", image.display());

    let result = tokio::select! {
        result = rx => result?,
        _ = tokio::signal::ctrl_c() => {
            render.cancel();
            println!("Cancelling...");
            return Ok(());
        }
    };

    match result {
        Ok(path) => println!("Placeholder media: {}", path.display()),
        Err(e) => println!("Placeholder encode failed: {e}"),
    }
    Ok(())
}
