use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed milestone screenshot file names, in capture order.
pub const SCREENSHOT_NAMES: [&str; 3] = ["start_page.png", "question_page.png", "after_refresh.png"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address of the development server under inspection
    pub target_url: String,
    /// Directory the milestone screenshots are written to
    pub output_dir: PathBuf,
    /// Visible-text substring that identifies the start control
    pub start_label: String,
    /// Run the browser without a window (screenshots still captured)
    pub headless: bool,
    /// Emulated device metrics
    pub viewport: ViewportConfig,
    /// Wall-clock pauses for human observation
    pub pacing: PacingConfig,
    /// Number of rapid-transition iterations
    pub rapid_iterations: u32,
    /// Network-quiescence detection parameters
    pub quiescence: QuiescenceConfig,
    /// How long to keep polling for an expected control before failing
    pub lookup_deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause after each milestone so the operator can watch for flicker
    pub observe_ms: u64,
    /// Pause between clicks inside the rapid-transition loop
    pub transition_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuiescenceConfig {
    /// Trailing window with no network activity that counts as "idle"
    pub idle_ms: u64,
    /// Overall budget before the wait fails instead of hanging
    pub deadline_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:5173".to_string(),
            output_dir: std::env::temp_dir(),
            start_label: "테스트 시작하기".to_string(),
            headless: false,
            viewport: ViewportConfig {
                width: 375,
                height: 667,
                device_scale_factor: 2.0,
            },
            pacing: PacingConfig {
                observe_ms: 1000,
                transition_ms: 500,
            },
            rapid_iterations: 3,
            quiescence: QuiescenceConfig {
                idle_ms: 500,
                deadline_ms: 30_000,
            },
            lookup_deadline_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home_dir.join(".flickerwatch").join("config.toml")
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home_dir.join(".flickerwatch").join("config.toml")
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Absolute paths of the three milestone screenshots, in capture order.
    pub fn screenshot_paths(&self) -> [PathBuf; 3] {
        SCREENSHOT_NAMES.map(|name| self.output_dir.join(name))
    }
}
