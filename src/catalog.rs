use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::formats::{builtin_formats, OutputFormat};
use crate::presets::{builtin_presets, SpeedPreset};
use crate::speed::{parse_speed_list, SpeedFactor};

/// Output formats and speed presets to choose from.
///
/// A catalog file may replace either list; a missing list keeps the
/// built-in one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "builtin_formats")]
    pub formats: Vec<OutputFormat>,
    #[serde(default = "builtin_presets")]
    pub presets: Vec<SpeedPreset>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            formats: builtin_formats(),
            presets: builtin_presets(),
        }
    }
}

impl Catalog {
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = serde_json::from_str::<Catalog>(&json).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(format) = catalog.formats.iter().find(|f| f.command.is_empty()) {
            return Err(CatalogError::EmptyCommand(format.name.clone()));
        }
        Ok(catalog)
    }

    /// Find a format by `name` or `display_name`, ignoring case.
    pub fn format(&self, name: &str) -> Result<&OutputFormat, CatalogError> {
        self.formats
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name) || f.display_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownFormat(String::from(name)))
    }

    pub fn preset(&self, label: &str) -> Result<&SpeedPreset, CatalogError> {
        let wanted = label.replace(' ', "");
        self.presets
            .iter()
            .find(|p| p.label == wanted)
            .ok_or_else(|| CatalogError::UnknownPreset(String::from(label)))
    }

    /// Speeds from an explicit list when given, otherwise from a preset.
    pub fn speeds(&self, preset: &str, custom: Option<&str>) -> Result<Vec<SpeedFactor>, CatalogError> {
        match custom {
            Some(list) => parse_speed_list(list).map_err(|_| CatalogError::InvalidSpeeds(String::from(list))),
            None => Ok(self.preset(preset)?.speeds.clone()),
        }
    }

    pub fn describe(&self) -> String {
        let mut s = String::from("Output formats:\n");
        for format in &self.formats {
            s.push_str(&format!("  {:<10} {}\n", format.name, format));
        }
        s.push_str("Speed presets:\n");
        for preset in &self.presets {
            s.push_str(&format!("  {}\n", preset.label));
        }
        s
    }
}
