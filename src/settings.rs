use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fx::reverb::PlateVariant;

/// Smoothing ramp lengths, in seconds, for the reverb controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbRamps {
    pub mix: f64,
    pub size: f64,
    pub damp: f64,
    pub tone: f64,
    pub shimmer: f64,
}

impl ReverbRamps {
    /// Ramp times each plate variant ships with; the shimmer plate glides
    /// its tone more slowly.
    pub const fn for_variant(variant: PlateVariant) -> Self {
        let tone = match variant {
            PlateVariant::Shimmer => 0.15,
            PlateVariant::Classic => 0.05,
        };
        Self {
            mix: 0.02,
            size: 0.05,
            damp: 0.05,
            tone,
            shimmer: 0.20,
        }
    }
}

impl Default for ReverbRamps {
    fn default() -> Self {
        Self::for_variant(PlateVariant::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayRamps {
    pub mix: f64,
    pub time: f64,
    pub feedback: f64,
    pub tone: f64,
    pub sub: f64,
    pub pingpong: f64,
    #[serde(rename = "mod")]
    pub modulation: f64,
}

impl Default for DelayRamps {
    fn default() -> Self {
        Self {
            mix: 0.05,
            time: 0.2,
            feedback: 0.05,
            tone: 0.05,
            sub: 0.2,
            pingpong: 0.05,
            modulation: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationRamps {
    pub drive: f64,
    pub grit: f64,
    pub tone: f64,
    pub warmth: f64,
    pub attack: f64,
    pub output: f64,
    pub mix: f64,
    #[serde(rename = "type")]
    pub kind: f64,
    pub comp: f64,
}

impl Default for SaturationRamps {
    fn default() -> Self {
        Self {
            drive: 0.02,
            grit: 0.02,
            tone: 0.02,
            warmth: 0.05,
            attack: 0.05,
            output: 0.02,
            mix: 0.02,
            kind: 0.08,
            comp: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    pub variant: PlateVariant,
    /// Shimmer grain buffer length; must be a power of two.
    pub shimmer_buffer_len: usize,
    /// Explicit ramp times; `None` uses the variant's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ramps: Option<ReverbRamps>,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            variant: PlateVariant::default(),
            shimmer_buffer_len: 8192,
            ramps: None,
        }
    }
}

impl ReverbSettings {
    pub fn ramps(&self) -> ReverbRamps {
        self.ramps
            .clone()
            .unwrap_or_else(|| ReverbRamps::for_variant(self.variant))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelaySettings {
    /// Length of each delay line.
    pub buffer_seconds: f64,
    pub lfo_rate_hz: f32,
    /// Start phase of the second LFO, in cycles.
    pub lfo_phase_offset: f32,
    pub ramps: DelayRamps,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            buffer_seconds: 1.65,
            lfo_rate_hz: 0.4,
            lfo_phase_offset: 0.13,
            ramps: DelayRamps::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationSettings {
    pub ramps: SaturationRamps,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reverb: ReverbSettings,
    pub delay: DelaySettings,
    pub saturation: SaturationSettings,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;
        writeln!(f, "Reverb:")?;
        writeln!(f, "  Variant: {}", self.reverb.variant)?;
        writeln!(f, "  Shimmer Buffer: {} samples", self.reverb.shimmer_buffer_len)?;
        writeln!(f, "Delay:")?;
        writeln!(f, "  Buffer Length: {} s", self.delay.buffer_seconds)?;
        writeln!(f, "  LFO Rate: {} Hz", self.delay.lfo_rate_hz)?;
        writeln!(f, "  LFO Phase Offset: {}", self.delay.lfo_phase_offset)?;
        writeln!(f, "Saturation:")?;
        writeln!(f, "  Type Ramp: {} s", self.saturation.ramps.kind)?;
        Ok(())
    }
}

impl Settings {
    /// Load from the per-user config directory, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        if settings_path.exists() {
            Self::load_from(&settings_path)
        } else {
            info!("No settings file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents).context("Failed to parse settings")?;
        settings.validate()?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).context("Failed to write settings file")?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Reject values the engines would have to assert on.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.reverb.shimmer_buffer_len >= 4 && self.reverb.shimmer_buffer_len.is_power_of_two(),
            "shimmer buffer length {} must be a power of two of at least 4",
            self.reverb.shimmer_buffer_len
        );
        anyhow::ensure!(
            self.delay.buffer_seconds.is_finite() && self.delay.buffer_seconds > 0.0,
            "delay buffer length must be positive, got {}",
            self.delay.buffer_seconds
        );
        anyhow::ensure!(
            self.delay.lfo_rate_hz.is_finite() && self.delay.lfo_rate_hz >= 0.0,
            "LFO rate must be non-negative, got {}",
            self.delay.lfo_rate_hz
        );
        Ok(())
    }

    fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("dreamfx")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("dreamfx")
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }
}
