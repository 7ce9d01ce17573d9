use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::player::{RepeatMode, DEFAULT_VOLUME};
use crate::theme::ThemeName;

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home)
}

pub fn default_config_path() -> PathBuf {
    home_dir().join(".config").join("tilawa").join("config.toml")
}

pub fn default_log_path() -> PathBuf {
    home_dir().join(".cache").join("tilawa").join("tilawa.log")
}

/// Settings read from `config.toml`. Every key is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: ThemeName,
    pub volume: f64,
    pub repeat: RepeatMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    /// argv of a native share tool; receives title, text and URL as
    /// trailing arguments. Empty means "copy the URL to the clipboard".
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub share_command: Vec<String>,
    pub mpv_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeName::Default,
            volume: DEFAULT_VOLUME,
            repeat: RepeatMode::None,
            download_dir: None,
            share_command: Vec::new(),
            mpv_path: PathBuf::from("mpv"),
            catalog_file: None,
            log_level: "info".into(),
        }
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| home_dir().join("Downloads"))
    }
}

/// Rewrite only the theme key, keeping whatever else the file holds.
pub fn save_theme(path: &Path, theme: ThemeName) -> Result<(), ConfigError> {
    let mut config = Config::load(path)?;
    config.theme = theme;
    config.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.volume, 0.7);
        assert_eq!(config.mpv_path, PathBuf::from("mpv"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
theme = "Sand"
repeat = "surah"
share_command = ["kdeconnect-cli", "--share"]
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.theme, ThemeName::Sand);
        assert_eq!(config.repeat, RepeatMode::Surah);
        assert_eq!(config.share_command, vec!["kdeconnect-cli", "--share"]);
        assert_eq!(config.volume, 0.7);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn save_theme_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.volume = 0.4;
        config.download_dir = Some(PathBuf::from("/tmp/quran"));
        config.save(&path).unwrap();

        save_theme(&path, ThemeName::Night).unwrap();
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.theme, ThemeName::Night);
        assert_eq!(reloaded.volume, 0.4);
        assert_eq!(reloaded.download_dir(), PathBuf::from("/tmp/quran"));
    }
}
