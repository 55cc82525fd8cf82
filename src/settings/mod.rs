//! User settings — a flat record of enumerated options.
//!
//! Updates are merged field by field. A field that is present but invalid
//! resets to its default instead of failing the whole update.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

pub const DEFAULT_SELECTION_COLOR: &str = "#14b8a6";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    DarkTeal,
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

impl Quality {
    /// JPEG encoder quality for this level.
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Quality::High => 100,
            Quality::Medium => 85,
            Quality::Low => 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub format: ImageFormat,
    pub quality: Quality,
    pub selection_color: String,
    pub sound_enabled: bool,
    pub animations_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            format: ImageFormat::default(),
            quality: Quality::default(),
            selection_color: DEFAULT_SELECTION_COLOR.to_string(),
            sound_enabled: true,
            animations_enabled: true,
        }
    }
}

impl Settings {
    /// Builds a full record from an untrusted blob (e.g. persisted storage).
    pub fn from_value(raw: &Value) -> Self {
        let mut settings = Self::default();
        settings.merge(raw);
        settings
    }

    /// Merges a partial update into `self`.
    ///
    /// Returns the names of fields that were present but invalid and were
    /// therefore reset to their defaults.
    pub fn merge(&mut self, patch: &Value) -> Vec<&'static str> {
        let mut rejected = Vec::new();
        let Some(obj) = patch.as_object() else {
            if !patch.is_null() {
                log::warn!("[SETTINGS] Ignoring non-object settings payload");
            }
            return rejected;
        };
        let defaults = Self::default();

        merge_field(obj, "theme", &mut self.theme, defaults.theme, &mut rejected);
        merge_field(obj, "format", &mut self.format, defaults.format, &mut rejected);
        merge_field(obj, "quality", &mut self.quality, defaults.quality, &mut rejected);
        merge_field(
            obj,
            "soundEnabled",
            &mut self.sound_enabled,
            defaults.sound_enabled,
            &mut rejected,
        );
        merge_field(
            obj,
            "animationsEnabled",
            &mut self.animations_enabled,
            defaults.animations_enabled,
            &mut rejected,
        );

        if let Some(color) = obj.get("selectionColor") {
            match color.as_str().filter(|c| is_valid_color(c)) {
                Some(c) => self.selection_color = c.to_lowercase(),
                None => {
                    self.selection_color = defaults.selection_color;
                    rejected.push("selectionColor");
                }
            }
        }

        if !rejected.is_empty() {
            log::warn!("[SETTINGS] Reset invalid fields to defaults: {}", rejected.join(", "));
        }
        rejected
    }
}

pub fn is_valid_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

fn merge_field<T: DeserializeOwned>(
    obj: &serde_json::Map<String, Value>,
    key: &'static str,
    slot: &mut T,
    default: T,
    rejected: &mut Vec<&'static str>,
) {
    let Some(raw) = obj.get(key) else {
        return;
    };
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => *slot = value,
        Err(_) => {
            *slot = default;
            rejected.push(key);
        }
    }
}
