use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings. Distinct from `app_config.json`, which holds user data
/// (preset tags and imported folders) and is rewritten by the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Location of `app_config.json`.
    pub app_config: String,
    pub scan: ScanSettings,
    pub probe: ProbeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Recognized video extensions, matched case-insensitively.
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub enabled: bool,
    pub ffprobe: String,
    pub ffmpeg: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub thumbnail_dir: Option<String>,
}

impl Settings {
    pub fn app_config_path(&self) -> PathBuf {
        PathBuf::from(&self.app_config)
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_config: storage::CONFIG_FILENAME.to_string(),
            scan: ScanSettings {
                extensions: vec!["mp4".to_string()],
            },
            probe: ProbeSettings {
                enabled: true,
                ffprobe: "ffprobe".to_string(),
                ffmpeg: "ffmpeg".to_string(),
                timeout_secs: 3,
                thumbnail_dir: None,
            },
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<Settings> {
    let mut settings = config::Config::builder()
        .set_default("app_config", storage::CONFIG_FILENAME)?
        .set_default("scan.extensions", vec!["mp4"])?
        .set_default("probe.enabled", true)?
        .set_default("probe.ffprobe", "ffprobe")?
        .set_default("probe.ffmpeg", "ffmpeg")?
        .set_default("probe.timeout_secs", 3i64)?;
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix("HIGHLIGHT").separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
