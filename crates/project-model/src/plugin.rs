//! Bundled generator plugins.
//!
//! Generator scripts shipped with the editor are listed in a `plugins.json`
//! manifest:
//!
//! ```text
//! plugins/
//! ├── plugins.json
//! ├── noise/
//! │   ├── noise.py
//! │   └── screenshot.png
//! └── ...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::ProjectError;

/// Category used for plugins that do not declare one.
pub const MISC_CATEGORY: &str = "Misc";

/// One generator plugin entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorPlugin {
    /// Folder under the plugins root.
    pub folder: String,

    /// Script file name inside `folder`.
    #[serde(rename = "scriptfile")]
    pub script_file: String,

    pub name: String,

    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    plugins: Vec<GeneratorPlugin>,
}

/// Plugins of one category, sorted by name.
#[derive(Debug, Clone)]
pub struct PluginGroup {
    pub category: String,
    pub plugins: Vec<GeneratorPlugin>,
}

/// All generator plugins found under a plugins root.
#[derive(Debug, Clone)]
pub struct PluginLibrary {
    root: PathBuf,
    groups: Vec<PluginGroup>,
}

impl PluginLibrary {
    /// Load `root/plugins.json` and group entries by category.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join("plugins.json");
        let json = std::fs::read_to_string(&manifest_path).map_err(|e| ProjectError::IoError {
            path: manifest_path.clone(),
            source: e,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: manifest_path,
                source: e,
            })?;
        Ok(Self::from_plugins(root, manifest.plugins))
    }

    pub fn from_plugins(root: PathBuf, plugins: Vec<GeneratorPlugin>) -> Self {
        let mut by_category: BTreeMap<String, Vec<GeneratorPlugin>> = BTreeMap::new();
        for plugin in plugins {
            let category = plugin
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| MISC_CATEGORY.to_string());
            by_category.entry(category).or_default().push(plugin);
        }

        let groups = by_category
            .into_iter()
            .map(|(category, mut plugins)| {
                plugins.sort_by(|a, b| a.name.cmp(&b.name));
                PluginGroup { category, plugins }
            })
            .collect();

        Self { root, groups }
    }

    /// Groups sorted by category name.
    pub fn groups(&self) -> &[PluginGroup] {
        &self.groups
    }

    pub fn find(&self, name: &str) -> Option<&GeneratorPlugin> {
        self.groups
            .iter()
            .flat_map(|g| g.plugins.iter())
            .find(|p| p.name == name)
    }

    pub fn script_path(&self, plugin: &GeneratorPlugin) -> PathBuf {
        self.root.join(&plugin.folder).join(&plugin.script_file)
    }

    pub fn screenshot_path(&self, plugin: &GeneratorPlugin) -> PathBuf {
        self.root.join(&plugin.folder).join("screenshot.png")
    }

    /// Source code of a plugin script, e.g. to open it as an example.
    pub fn script_source(&self, plugin: &GeneratorPlugin) -> Result<String, ProjectError> {
        let path = self.script_path(plugin);
        std::fs::read_to_string(&path).map_err(|e| ProjectError::IoError { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "plugins": [
            {"folder": "noise", "scriptfile": "noise.py", "name": "Noise", "category": "Backgrounds"},
            {"folder": "bars", "scriptfile": "bars.py", "name": "Color Bars", "category": "Backgrounds"},
            {"folder": "count", "scriptfile": "count.py", "name": "Countdown", "category": "Text"},
            {"folder": "odd", "scriptfile": "odd.py", "name": "Odd"}
        ]
    }"#;

    #[test]
    fn test_load_groups_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plugins.json"), MANIFEST).unwrap();

        let library = PluginLibrary::load(dir.path()).unwrap();
        let categories: Vec<_> = library.groups().iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Backgrounds", "Misc", "Text"]);

        let names: Vec<_> = library.groups()[0]
            .plugins
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Color Bars", "Noise"]);
    }

    #[test]
    fn test_script_path_joins_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plugins.json"), MANIFEST).unwrap();
        let library = PluginLibrary::load(dir.path()).unwrap();

        let noise = library.find("Noise").unwrap();
        assert_eq!(
            library.script_path(noise),
            dir.path().join("noise").join("noise.py")
        );
    }

    #[test]
    fn test_missing_manifest_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = PluginLibrary::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("plugins.json"));
    }
}
