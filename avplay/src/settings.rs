use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use media_present::PresenterConfig;

/// Audio output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Output ring size in milliseconds; also the delay applied to video.
    pub buffer_ms: u64,
    /// Playback volume (0.0 to 1.0).
    pub volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            buffer_ms: 100,
            volume: 1.0,
        }
    }
}

/// Saved player settings for persistence across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub presenter: PresenterConfig,
    pub audio: AudioSettings,
}

impl Settings {
    /// Get the path to the default settings file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("avplay").join("config.json"))
    }

    /// Load settings from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        serde_json::from_str(&contents).map_err(io::Error::from)
    }

    /// Save settings to `path`.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_present::PlaybackMode;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.presenter.mode = PlaybackMode::VideoOnly;
        settings.presenter.video.capacity_ms = 3_000;
        settings.audio.buffer_ms = 250;
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "audio": { "volume": 0.5 } }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.audio.volume, 0.5);
        assert_eq!(settings.audio.buffer_ms, 100);
        assert_eq!(settings.presenter, PresenterConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
