//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent folder of all container clip render sessions.
    pub container_clips_dir: PathBuf,

    /// Scratch space for validation logs and placeholder renders.
    pub cache_dir: PathBuf,

    /// Where container clip thumbnails are written.
    pub thumbnail_dir: PathBuf,

    /// Bundled resources (type icons, known-good validation image).
    pub resources_dir: PathBuf,

    /// External renderer executables.
    pub renderers: RendererConfig,

    /// Render supervision policy.
    #[serde(default)]
    pub render: RenderPolicy,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How to invoke one external renderer.
///
/// `args` are placed before the `key:value` session arguments, so a script
/// interpreter can be configured as `program` with the script as first arg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RendererCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// External renderer executables, one per container type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Headless script-image-generator renderer.
    pub script_generator: RendererCommand,

    /// Headless filter-script renderer.
    pub filter_script: RendererCommand,

    /// Headless project-XML renderer.
    pub project_xml: RendererCommand,

    /// Filter-script interpreter used for validation runs.
    pub filter_interpreter: PathBuf,
}

/// Render supervision policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderPolicy {
    /// Status poll tick interval.
    pub poll_interval_ms: u64,

    /// Time an aborted renderer gets to exit before it is killed.
    pub abort_grace_secs: u64,

    /// Fail a render whose status has not changed for this long.
    /// `None` keeps waiting forever.
    pub stall_timeout_secs: Option<u64>,

    /// Generator length used when a script generator has not declared one.
    pub default_generator_length: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data = data_home();
        Self {
            container_clips_dir: data.join("container_clips"),
            cache_dir: cache_home(),
            thumbnail_dir: data.join("thumbnails"),
            resources_dir: PathBuf::from("/usr/share/montage/res"),
            renderers: RendererConfig::default(),
            render: RenderPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            script_generator: RendererCommand::new("montage-generator-headless"),
            filter_script: RendererCommand::new("montage-filter-headless"),
            project_xml: RendererCommand::new("montage-xml-headless"),
            filter_interpreter: PathBuf::from("gmic"),
        }
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            abort_grace_secs: 10,
            stall_timeout_secs: None,
            default_generator_length: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Config rooted entirely under `root`, for tests and portable installs.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            container_clips_dir: root.join("container_clips"),
            cache_dir: root.join("cache"),
            thumbnail_dir: root.join("thumbnails"),
            resources_dir: root.join("res"),
            ..Self::default()
        }
    }

    /// Create every directory the render engine writes into.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        for dir in [&self.container_clips_dir, &self.cache_dir, &self.thumbnail_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".config"));
    base.join("montage").join("config.json")
}

fn data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".local").join("share"))
        .join("montage")
}

fn cache_home() -> PathBuf {
    std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".cache"))
        .join("montage")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_keep_waiting_forever() {
        let policy = RenderPolicy::default();
        assert_eq!(policy.stall_timeout_secs, None);
        assert_eq!(policy.abort_grace_secs, 10);
        assert_eq!(policy.default_generator_length, 200);
    }

    #[test]
    fn test_config_without_render_section_uses_default_policy() {
        let mut value = serde_json::to_value(AppConfig::default()).unwrap();
        value.as_object_mut().unwrap().remove("render");

        let parsed: AppConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.render.poll_interval_ms, 500);
    }

    #[test]
    fn test_rooted_config_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::rooted_at(dir.path());
        config.ensure_dirs().unwrap();
        assert!(dir.path().join("container_clips").is_dir());
        assert!(dir.path().join("cache").is_dir());
        assert!(dir.path().join("thumbnails").is_dir());
    }
}
