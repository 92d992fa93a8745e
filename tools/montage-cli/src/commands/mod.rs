pub mod check;
pub mod clone;
pub mod new;
pub mod placeholder;
pub mod plugins;
pub mod preview;
pub mod render;
pub mod status;
pub mod validate;

use std::path::Path;

use montage_project_model::{ContainerData, ProjectProfile};

/// Load a clip document.
pub fn load_clip(path: &Path) -> anyhow::Result<ContainerData> {
    ContainerData::load(path).map_err(|e| anyhow::anyhow!("Failed to load clip: {e}"))
}

/// Profile the clip was last configured for.
pub fn profile_for(data: &ContainerData) -> ProjectProfile {
    data.render_data
        .as_ref()
        .map(|r| r.profile.clone())
        .unwrap_or_default()
}
