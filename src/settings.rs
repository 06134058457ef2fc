//! Widget settings and preferences
//!
//! Persisted separately from game saves in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::platform::KeyValueStore;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Live firework sparks allowed before launches pause
    pub fn spark_budget(&self) -> usize {
        match self {
            QualityPreset::Low => 400,
            QualityPreset::Medium => 1500,
            QualityPreset::High => 4000,
        }
    }

    /// Radial glow per spark (flat squares otherwise)
    pub fn glow_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Widget settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Background fireworks
    pub fireworks: bool,
    /// Reduced motion (no fireworks, no pulsing rows)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            fireworks: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// LocalStorage key
    pub const STORAGE_KEY: &'static str = "moyu_settings";

    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective fireworks (respects reduced_motion)
    pub fn effective_fireworks(&self) -> bool {
        self.fireworks && !self.reduced_motion
    }

    /// Effective spark cap, zero when fireworks are off
    pub fn spark_budget(&self) -> usize {
        if self.effective_fireworks() {
            self.quality.spark_budget()
        } else {
            0
        }
    }

    /// Load settings, falling back to defaults on missing or bad data
    pub fn load(store: &dyn KeyValueStore) -> Self {
        if let Some(json) = store.get(Self::STORAGE_KEY) {
            match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from storage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings: {}", e),
            }
        }
        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        match serde_json::to_string(self) {
            Ok(json) => {
                store.set(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
            Err(e) => log::error!("Failed to encode settings: {}", e),
        }
    }
}
