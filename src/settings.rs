//! JSON-backed watermark settings
//!
//! Settings live in a flat JSON document with two top-level keys:
//!
//! ```json
//! {
//!     "watermark": {
//!         "enabled": true,
//!         "text": "@YourChannel",
//!         "position": "bottom-right",
//!         "opacity": 0.7,
//!         "font_size": 24,
//!         "color": "white",
//!         "pdf_opacity": 0.3,
//!         "pdf_angle": 45.0,
//!         "pdf_font_size": 48
//!     },
//!     "max_file_size": 52428800
//! }
//! ```
//!
//! The store reads the file once when opened and writes through on every
//! mutation. There is no locking; concurrent writers race and the last one wins.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Settings file used when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "bot_config.json";

/// Informational upload ceiling (50 MiB); never enforced here
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Anchor used to place the watermark on a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    Center,
    /// Also the fallback for unrecognised names
    #[default]
    #[serde(other)]
    BottomRight,
}

impl Position {
    /// All anchors, corners first
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    /// Parse an anchor name, falling back to bottom-right for anything unknown
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "top-left" => Position::TopLeft,
            "top-right" => Position::TopRight,
            "bottom-left" => Position::BottomLeft,
            "bottom-right" => Position::BottomRight,
            "center" => Position::Center,
            _ => Position::BottomRight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
            Position::Center => "center",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Position::from_name(s))
    }
}

/// User-adjustable watermark settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    /// Whether outgoing media gets stamped at all
    pub enabled: bool,
    /// Watermark text, usually a channel tag
    pub text: String,
    /// Anchor for video overlays
    pub position: Position,
    /// Video overlay opacity (0.0 to 1.0)
    pub opacity: f32,
    /// Video overlay font size in pixels
    pub font_size: u32,
    /// Named color or #RRGGBB
    pub color: String,
    /// PDF overlay opacity (0.0 to 1.0)
    pub pdf_opacity: f32,
    /// PDF text rotation in degrees, counter-clockwise
    pub pdf_angle: f32,
    /// PDF font size in points
    pub pdf_font_size: u32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            text: "@YourChannel".to_string(),
            position: Position::BottomRight,
            opacity: 0.7,
            font_size: 24,
            color: "white".to_string(),
            pdf_opacity: 0.3,
            pdf_angle: 45.0,
            pdf_font_size: 48,
        }
    }
}

/// Whole settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub watermark: WatermarkSettings,
    /// Byte ceiling for incoming media
    pub max_file_size: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            watermark: WatermarkSettings::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// A single typed change to [`WatermarkSettings`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    Enabled(bool),
    Text(String),
    Position(Position),
    Opacity(f32),
    FontSize(u32),
    Color(String),
    PdfOpacity(f32),
    PdfAngle(f32),
    PdfFontSize(u32),
}

impl SettingUpdate {
    /// Build an update from a settings key and a textual value.
    ///
    /// Returns `Ok(None)` when the key is not a watermark setting.
    pub fn parse(key: &str, value: &str) -> Result<Option<Self>> {
        let invalid = || Error::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        };

        let update = match key {
            "enabled" => SettingUpdate::Enabled(parse_bool(value).ok_or_else(invalid)?),
            "text" => SettingUpdate::Text(value.to_string()),
            "position" => SettingUpdate::Position(Position::from_name(value)),
            "opacity" => SettingUpdate::Opacity(value.trim().parse().map_err(|_| invalid())?),
            "font_size" => SettingUpdate::FontSize(value.trim().parse().map_err(|_| invalid())?),
            "color" => SettingUpdate::Color(value.to_string()),
            "pdf_opacity" => SettingUpdate::PdfOpacity(value.trim().parse().map_err(|_| invalid())?),
            "pdf_angle" => SettingUpdate::PdfAngle(value.trim().parse().map_err(|_| invalid())?),
            "pdf_font_size" => {
                SettingUpdate::PdfFontSize(value.trim().parse().map_err(|_| invalid())?)
            }
            _ => return Ok(None),
        };

        Ok(Some(update))
    }

    fn apply(self, settings: &mut WatermarkSettings) {
        match self {
            SettingUpdate::Enabled(v) => settings.enabled = v,
            SettingUpdate::Text(v) => settings.text = v,
            SettingUpdate::Position(v) => settings.position = v,
            SettingUpdate::Opacity(v) => settings.opacity = v,
            SettingUpdate::FontSize(v) => settings.font_size = v,
            SettingUpdate::Color(v) => settings.color = v,
            SettingUpdate::PdfOpacity(v) => settings.pdf_opacity = v,
            SettingUpdate::PdfAngle(v) => settings.pdf_angle = v,
            SettingUpdate::PdfFontSize(v) => settings.pdf_font_size = v,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Settings persisted to a single JSON file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    config: BotConfig,
}

impl SettingsStore {
    /// Open the store at `path`, reading it if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_config(&path)?;
        Ok(Self { path, config })
    }

    /// Open the store at [`DEFAULT_CONFIG_FILE`] in the working directory
    pub fn open_default() -> Result<Self> {
        Self::open(DEFAULT_CONFIG_FILE)
    }

    /// Re-read the settings file, replacing in-memory state.
    ///
    /// A missing file yields the defaults; the file is not created.
    pub fn load(&mut self) -> Result<()> {
        self.config = load_config(&self.path)?;
        Ok(())
    }

    /// Write the current state to disk, overwriting the file
    pub fn save(&self) -> Result<()> {
        let write_err = |source| Error::ConfigWrite {
            path: self.path.clone(),
            source,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.config
            .serialize(&mut ser)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        fs::write(&self.path, buf).map_err(write_err)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Flip `enabled`, or set it when `enabled` is given. Returns the new state.
    pub fn toggle_watermark(&mut self, enabled: Option<bool>) -> Result<bool> {
        let watermark = &mut self.config.watermark;
        watermark.enabled = enabled.unwrap_or(!watermark.enabled);
        let state = watermark.enabled;
        self.save()?;
        Ok(state)
    }

    pub fn set_watermark_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.update_setting(SettingUpdate::Text(text.into()))
    }

    /// Apply one typed change and persist it
    pub fn update_setting(&mut self, update: SettingUpdate) -> Result<()> {
        update.apply(&mut self.config.watermark);
        self.save()
    }

    /// Apply a change addressed by key name.
    ///
    /// Unknown keys are a no-op: nothing changes, nothing is written and
    /// `Ok(false)` is returned.
    pub fn update_setting_by_key(&mut self, key: &str, value: &str) -> Result<bool> {
        match SettingUpdate::parse(key, value)? {
            Some(update) => {
                self.update_setting(update)?;
                Ok(true)
            }
            None => {
                debug!(key, "ignoring unknown watermark setting");
                Ok(false)
            }
        }
    }

    /// Snapshot of the current watermark settings
    pub fn watermark_status(&self) -> WatermarkSettings {
        self.config.watermark.clone()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file absent, using defaults");
        return Ok(BotConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| Error::ConfigLoad {
        path: path.to_path_buf(),
        source,
    })
}
