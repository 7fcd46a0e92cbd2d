// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Run configuration, read from a TOML file.
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! The default location is `{config_dir}/pixel_deck/deck.toml`.

use crate::error::{DeckError, DeckResult};
use crate::util::Size;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Text,
    Offscreen,
    OpenGl,
}

impl DriverKind {
    pub fn from_name(name: &str) -> Option<DriverKind> {
        match name {
            "text" => Some(DriverKind::Text),
            "offscreen" => Some(DriverKind::Offscreen),
            "opengl" => Some(DriverKind::OpenGl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub width: i32,
    pub height: i32,
    pub driver: DriverKind,
    /// snapshots go to `{output_dir}/screens`; none disables them
    pub output_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_file: String,
    /// elide repeated leading fields in text traces
    pub text_dedup: bool,
    /// upper bound on one OS event wait in the live loop, milliseconds
    pub poll_interval_ms: u64,
    pub double_click_usecs: i64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            driver: DriverKind::Text,
            output_dir: None,
            log_level: "info".to_string(),
            log_file: "log/pixel_deck.log".to_string(),
            text_dedup: true,
            poll_interval_ms: 16,
            double_click_usecs: crate::render::adapter::DOUBLE_CLICK_USECS,
        }
    }
}

impl DeckConfig {
    pub fn screen_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|d| d.join("pixel_deck").join("deck.toml"))
    }

    pub fn parse(text: &str) -> DeckResult<Self> {
        let config: DeckConfig =
            toml::from_str(text).map_err(|e| DeckError::Config(e.to_string()))?;
        if config.width <= 0 || config.height <= 0 {
            return Err(DeckError::Config(format!(
                "screen size {}x{} is not positive",
                config.width, config.height
            )));
        }
        Ok(config)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> DeckResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// `path` if given, else the default location.
    pub fn load_or_default(path: Option<&Path>) -> DeckResult<Self> {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => Self::load(&p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> DeckResult<()> {
        let text = toml::to_string(self).map_err(|e| DeckError::Config(e.to_string()))?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, text)?;
        Ok(())
    }
}
