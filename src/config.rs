use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::mux::MuxBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Coarse navigation step, in frames.
    pub step_frames: u64,
    /// Divisor applied to `step_frames` for the fine step.
    pub fine_divisor: u64,
    /// Player coarse seek as a fraction of the whole video.
    pub seek_fraction: f64,
    pub cover_file: PathBuf,
    pub output_directory: PathBuf,
    pub ffmpeg_path: Option<PathBuf>,
    pub backend: MuxBackend,
    pub jpeg_quality: u8,
    pub title_refresh_ms: u64,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            step_frames: 60,
            fine_divisor: 5,
            seek_fraction: 0.01,
            cover_file: PathBuf::from("selected.jpg"),
            output_directory: PathBuf::from("output"),
            ffmpeg_path: None,
            backend: MuxBackend::Ffmpeg,
            jpeg_quality: 95,
            title_refresh_ms: 500,
            window_width: 500.0,
            window_height: 400.0,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path).map_err(|e| {
                anyhow::anyhow!("Failed to save default config: {}", e)
            })?;
            log::info!("Created new config file at {}", config_path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                log::debug!("Loaded config from {}", config_path.display());
                Ok(config)
            }
            Err(e) => {
                log::warn!(
                    "Config file has issues ({}), replacing it with defaults",
                    e
                );
                let config = Self::default();
                config.save_to(config_path)?;
                Ok(config)
            }
        }
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vcover")
            .join("config.json")
    }

    pub fn ffmpeg_program(&self) -> PathBuf {
        self.ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    /// Where the player writes the muxed copy of `video`.
    pub fn output_for(&self, video: &Path) -> PathBuf {
        match video.file_name() {
            Some(name) => self.output_directory.join(name),
            None => self.output_directory.join("output.mp4"),
        }
    }

    /// Player coarse seek in frames, never less than one.
    pub fn player_step(&self, total_frames: u64) -> u64 {
        ((total_frames as f64 * self.seek_fraction).round() as u64).max(1)
    }
}
