use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for media-lens.
///
/// Every section falls back to its defaults when missing from the file, so
/// a partial `config.json` is valid.
///
/// # Loading
///
/// ```rust,no_run
/// use media_lens::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.export.pretty = false;
/// config.scan.recursive = true;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GPS resolution behavior.
    pub gps: GpsConfig,
    /// Export and sanitize output.
    pub export: ExportConfig,
    /// Input collection from directories.
    pub scan: ScanConfig,
}

/// GPS resolution options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Negate a longitude read from the raw tag value (not its description)
    /// before hemisphere correction. Legacy behavior that mis-places eastern
    /// coordinates; kept only for compatibility with older exports.
    pub negate_raw_longitude: bool,
}

/// Export output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for exports and sanitized copies. `None` means the current directory.
    pub output_dir: Option<String>,
    /// Pretty-print exported JSON.
    pub pretty: bool,
}

/// Directory scanning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Walk directories recursively. `--recursive` turns this on for one run.
    pub recursive: bool,
    /// Follow symlinks while walking.
    pub follow_links: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            pretty: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            follow_links: true,
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Output directory for exports, defaulting to the current directory.
    pub fn output_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
