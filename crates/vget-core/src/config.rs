use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// CLI defaults loaded from `~/.config/vget/config.toml`.
///
/// These only seed the `DownloadRequest` built by the CLI; the engine never
/// reads ambient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VgetConfig {
    /// Segment fetchers to run when the command line does not say.
    pub default_parallelism: usize,
    /// Attempt budget per segment.
    pub default_retries: u32,
    /// Aggregator sampling cadence in milliseconds (kept within 250..=500).
    pub progress_interval_ms: u64,
    /// Heatmap cells per row.
    pub heatmap_columns: usize,
}

impl Default for VgetConfig {
    fn default() -> Self {
        Self {
            default_parallelism: 8,
            default_retries: 3,
            progress_interval_ms: 400,
            heatmap_columns: 16,
        }
    }
}

impl VgetConfig {
    /// Sampling cadence with the supported bounds applied.
    pub fn progress_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress_interval_ms.clamp(250, 500))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VgetConfig = toml::from_str(&data)?;
    Ok(cfg)
}
