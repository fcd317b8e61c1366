//! Configuration management for Clarion
//!
//! Startup configuration only: engine geometry (sample rate, block sizes,
//! analyzer cadence) and the initial equalizer parameter values, stored as
//! TOML. Parameter presets and their persistence are outside this crate's
//! responsibility.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::domain::audio::{ChannelCount, SampleRate, StreamConfig};
use crate::domain::params::{EqParams, Slope};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing block size in frames
    pub buffer_size: u32,

    /// Length of the blocks handed to the analyzer, in samples
    pub analyzer_block_size: u32,

    /// Analyzer polling rate in Hz
    pub analyzer_rate_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            buffer_size: 512,
            analyzer_block_size: 2048,
            analyzer_rate_hz: 60,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be > 0".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be > 0".to_string()));
        }
        if self.analyzer_block_size == 0 {
            return Err(ConfigError::Invalid(
                "analyzer_block_size must be > 0".to_string(),
            ));
        }
        if self.analyzer_rate_hz == 0 {
            return Err(ConfigError::Invalid(
                "analyzer_rate_hz must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: SampleRate::from_hz(self.sample_rate),
            channels: ChannelCount::Stereo,
            buffer_size: self.buffer_size,
        }
    }
}

/// Initial equalizer parameter values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EqConfig {
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_q: f32,
    /// Cut slopes in dB per octave: 12, 24, 36 or 48
    pub low_cut_slope_db: u32,
    pub high_cut_slope_db: u32,
    #[serde(default)]
    pub low_cut_bypassed: bool,
    #[serde(default)]
    pub peak_bypassed: bool,
    #[serde(default)]
    pub high_cut_bypassed: bool,
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            low_cut_freq: EqParams::DEFAULT_LOW_CUT_FREQ,
            high_cut_freq: EqParams::DEFAULT_HIGH_CUT_FREQ,
            peak_freq: EqParams::DEFAULT_PEAK_FREQ,
            peak_gain_db: 0.0,
            peak_q: 1.0,
            low_cut_slope_db: 12,
            high_cut_slope_db: 12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
        }
    }
}

impl EqConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, freq) in [
            ("low_cut_freq", self.low_cut_freq),
            ("high_cut_freq", self.high_cut_freq),
            ("peak_freq", self.peak_freq),
        ] {
            if !(EqParams::FREQ_MIN..=EqParams::FREQ_MAX).contains(&freq) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within {}..{} Hz, got {}",
                    name,
                    EqParams::FREQ_MIN,
                    EqParams::FREQ_MAX,
                    freq
                )));
            }
        }

        if !(EqParams::PEAK_GAIN_MIN..=EqParams::PEAK_GAIN_MAX).contains(&self.peak_gain_db) {
            return Err(ConfigError::Invalid(format!(
                "peak_gain_db must be within {}..{} dB, got {}",
                EqParams::PEAK_GAIN_MIN,
                EqParams::PEAK_GAIN_MAX,
                self.peak_gain_db
            )));
        }

        if !(EqParams::PEAK_Q_MIN..=EqParams::PEAK_Q_MAX).contains(&self.peak_q) {
            return Err(ConfigError::Invalid(format!(
                "peak_q must be within {}..{}, got {}",
                EqParams::PEAK_Q_MIN,
                EqParams::PEAK_Q_MAX,
                self.peak_q
            )));
        }

        for (name, db) in [
            ("low_cut_slope_db", self.low_cut_slope_db),
            ("high_cut_slope_db", self.high_cut_slope_db),
        ] {
            if Slope::from_db_per_octave(db).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "{} must be one of 12, 24, 36, 48, got {}",
                    name, db
                )));
            }
        }

        Ok(())
    }

    /// Push these values into a live parameter store.
    ///
    /// Assumes `validate` has passed; the slope figures are then guaranteed
    /// to parse.
    pub fn apply_to(&self, params: &EqParams) {
        params.set_low_cut_freq(self.low_cut_freq);
        params.set_high_cut_freq(self.high_cut_freq);
        params.set_peak_freq(self.peak_freq);
        params.set_peak_gain_db(self.peak_gain_db);
        params.set_peak_q(self.peak_q);
        if let Some(slope) = Slope::from_db_per_octave(self.low_cut_slope_db) {
            params.set_low_cut_slope(slope);
        }
        if let Some(slope) = Slope::from_db_per_octave(self.high_cut_slope_db) {
            params.set_high_cut_slope(slope);
        }
        params.set_low_cut_bypassed(self.low_cut_bypassed);
        params.set_peak_bypassed(self.peak_bypassed);
        params.set_high_cut_bypassed(self.high_cut_bypassed);
    }
}

/// Complete Clarion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClarionConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub eq: EqConfig,
}

impl ClarionConfig {
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.eq.validate()
    }

    /// Load configuration from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}
