// Application settings
// Loaded from ~/.config/colmatch/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use colmatch_engine::options::{CompareOptions, MarkMode, MissingColumnPolicy, DEFAULT_SHEET};
use colmatch_engine::style::{HighlightStyle, Rgb};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Comparison
    #[serde(rename = "compare.sheet")]
    pub sheet: String,

    #[serde(rename = "compare.missingColumn")]
    pub missing_column: MissingColumnPolicy,

    #[serde(rename = "compare.markMode")]
    pub mark_mode: MarkMode,

    // Highlight, as "#RRGGBB"
    #[serde(rename = "highlight.fill")]
    pub highlight_fill: String,

    #[serde(rename = "highlight.border")]
    pub highlight_border: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            missing_column: MissingColumnPolicy::default(),
            mark_mode: MarkMode::default(),
            highlight_fill: Rgb::MARKER_YELLOW.to_string(),
            highlight_border: Rgb::BLACK.to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("colmatch");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Engine options for these settings. Fails on an unparseable colour.
    pub fn compare_options(&self) -> Result<CompareOptions, String> {
        let fill: Rgb = self
            .highlight_fill
            .parse()
            .map_err(|e| format!("highlight.fill: {}", e))?;
        let border: Rgb = self
            .highlight_border
            .parse()
            .map_err(|e| format!("highlight.border: {}", e))?;

        Ok(CompareOptions {
            sheet: self.sheet.clone(),
            missing_column: self.missing_column,
            mark_mode: self.mark_mode,
            style: HighlightStyle::default().with_fill(fill).with_border_color(border),
        })
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let options = Settings::default().compare_options().unwrap();
        assert_eq!(options, CompareOptions::default());
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["compare.sheet"], "Sheet1");
        assert_eq!(json["compare.missingColumn"], "skip");
        assert_eq!(json["compare.markMode"], "symmetric");
        assert_eq!(json["highlight.fill"], "#FFEB00");
        assert_eq!(json["highlight.border"], "#000000");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // working sheet\n  \"compare.sheet\": \"Data\",\n  \"compare.markMode\": \"row-range\"\n}\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.sheet, "Data");
        assert_eq!(settings.mark_mode, MarkMode::RowRange);
        assert_eq!(settings.missing_column, MissingColumnPolicy::Skip);
        assert_eq!(settings.highlight_fill, "#FFEB00");
    }

    #[test]
    fn test_missing_or_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load_from(&dir.path().join("absent.json")), Settings::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&broken), Settings::default());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            missing_column: MissingColumnPolicy::Abort,
            highlight_fill: "#92D050".to_string(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_invalid_colour_is_an_error() {
        let settings = Settings {
            highlight_border: "blue".to_string(),
            ..Settings::default()
        };
        let err = settings.compare_options().unwrap_err();
        assert!(err.starts_with("highlight.border"), "{err}");
    }

    #[test]
    fn test_custom_colours_reach_the_style() {
        let settings = Settings {
            highlight_fill: "92D050".to_string(),
            highlight_border: "#FF0000".to_string(),
            ..Settings::default()
        };
        let style = settings.compare_options().unwrap().style;
        assert_eq!(style.fill, Rgb(0x92D050));
        assert_eq!(style.border_color, Rgb(0xFF0000));
    }
}
