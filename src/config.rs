//! User settings
//!
//! Settings come from three layers: built-in defaults, an optional TOML file
//! and command-line flags, each overriding the previous one.
//!
//! ```toml
//! volume = 0.3
//! attention_seconds = 45
//! sound_set = "material"
//! character = "glass"
//! reverse = false
//! ```

use crate::error::{MurmurError, Result};
use crate::materials::SoundSet;
use crate::monitor::{Mode, MonitorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_VOLUME: f32 = 0.5;
pub const DEFAULT_ATTENTION_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output volume (0.0-1.0)
    pub volume: f32,
    /// Seconds of silence before the attention alert
    pub attention_seconds: f64,
    pub sound_set: SoundSet,
    /// Character name within the set; `None` picks one at random
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    /// Sound during silence instead of during output
    pub reverse: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            attention_seconds: DEFAULT_ATTENTION_SECONDS,
            sound_set: SoundSet::default(),
            character: None,
            reverse: false,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub volume: Option<f32>,
    pub attention_seconds: Option<f64>,
    pub sound_set: Option<SoundSet>,
    pub character: Option<String>,
    pub reverse: bool,
}

/// `$XDG_CONFIG_HOME/murmur/config.toml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("murmur").join("config.toml"))
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read settings from `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| MurmurError::ConfigParse(format!("{}: {}", path.display(), e)))
    }

    /// Defaults overlaid with the config file. An explicit path must exist;
    /// a missing default file just means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => {
                    debug!("Loading settings from {}", path.display());
                    Self::from_file(&path)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// Apply command-line values on top
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(volume) = overrides.volume {
            self.volume = volume;
        }
        if let Some(seconds) = overrides.attention_seconds {
            self.attention_seconds = seconds;
        }
        if let Some(set) = overrides.sound_set {
            self.sound_set = set;
        }
        if overrides.character.is_some() {
            self.character = overrides.character;
        }
        self.reverse |= overrides.reverse;
        self
    }

    /// Clamp volume and reject unusable silence thresholds
    pub fn normalized(mut self) -> Result<Self> {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };
        if !self.attention_seconds.is_finite() || self.attention_seconds <= 0.0 {
            return Err(MurmurError::InvalidConfig(format!(
                "attention must be a positive number of seconds, got {}",
                self.attention_seconds
            )));
        }
        if let Some(name) = &self.character {
            if name.trim().is_empty() || name == "random" {
                self.character = None;
            }
        }
        Ok(self)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            mode: if self.reverse {
                Mode::Reverse
            } else {
                Mode::Normal
            },
            silence_threshold: Duration::from_secs_f64(self.attention_seconds),
            ..MonitorConfig::default()
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| MurmurError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse("volume = 0.2\n").unwrap();
        assert_eq!(settings.volume, 0.2);
        assert_eq!(settings.attention_seconds, DEFAULT_ATTENTION_SECONDS);
        assert_eq!(settings.sound_set, SoundSet::Ambient);
        assert!(settings.character.is_none());
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::parse(
            "volume = 0.8\nattention_seconds = 12.5\nsound_set = \"material\"\ncharacter = \"glass\"\nreverse = true\n",
        )
        .unwrap();
        assert_eq!(settings.sound_set, SoundSet::Material);
        assert_eq!(settings.character.as_deref(), Some("glass"));
        assert!(settings.reverse);
        assert_eq!(settings.attention_seconds, 12.5);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let err = Settings::parse("volume = \"loud\"").unwrap_err();
        assert!(matches!(err, MurmurError::ConfigParse(_)));
        let err = Settings::parse("sound_set = \"jazz\"").unwrap_err();
        assert!(matches!(err, MurmurError::ConfigParse(_)));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "volume = 0.2\nsound_set = \"material\"").unwrap();

        let settings = Settings::load(Some(file.path()))
            .unwrap()
            .apply(Overrides {
                volume: Some(0.9),
                ..Default::default()
            })
            .normalized()
            .unwrap();
        assert_eq!(settings.volume, 0.9);
        assert_eq!(settings.sound_set, SoundSet::Material);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, MurmurError::Io(_)));
    }

    #[test]
    fn test_normalize_clamps_volume() {
        let settings = Settings {
            volume: 3.0,
            ..Default::default()
        };
        assert_eq!(settings.normalized().unwrap().volume, 1.0);
        let settings = Settings {
            volume: -1.0,
            ..Default::default()
        };
        assert_eq!(settings.normalized().unwrap().volume, 0.0);
    }

    #[test]
    fn test_normalize_rejects_bad_attention() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let settings = Settings {
                attention_seconds: bad,
                ..Default::default()
            };
            assert!(matches!(
                settings.normalized(),
                Err(MurmurError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_random_character_keyword() {
        let settings = Settings {
            character: Some("random".to_string()),
            ..Default::default()
        };
        assert!(settings.normalized().unwrap().character.is_none());
    }

    #[test]
    fn test_monitor_config() {
        let settings = Settings {
            attention_seconds: 5.0,
            reverse: true,
            ..Default::default()
        };
        let config = settings.monitor_config();
        assert_eq!(config.mode, Mode::Reverse);
        assert_eq!(config.silence_threshold, Duration::from_secs(5));
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = Settings {
            character: Some("moss".to_string()),
            ..Default::default()
        };
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::parse(&text).unwrap(), settings);
    }
}
