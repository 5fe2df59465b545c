//! The engine configuration file.

use crate::error::ConfigError;
use crate::paths;
use crate::validation::validate_config;
use eigensound_core::{FactoryPreset, SolverConfig};
use eigensound_synth::{ExcitationPolicy, FilterSettings, ModeMapping, SynthSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which signal path the engine starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// Excite the eigenmodes and play the chord.
    #[default]
    Synthesizer,
    /// Filter the live input through the resonator bank.
    Effect,
}

impl EngineMode {
    /// Lowercase name as written in config files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Synthesizer => "synthesizer",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synthesizer" | "synth" => Ok(Self::Synthesizer),
            "effect" | "filter" => Ok(Self::Effect),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// `[audio]`: device and stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per scheduler block.
    pub block_size: usize,
    /// Output channel count; the mono signal is copied to each.
    pub channels: u16,
    /// Input device name, or the system default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Output device name, or the system default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    /// Gain applied after synthesis or filtering, before the hard clamp.
    pub master_gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 256,
            channels: 2,
            input_device: None,
            output_device: None,
            master_gain: 0.5,
        }
    }
}

/// `[matrix]`: the operator the engine starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Initial N.
    pub dimension: usize,
    /// Start with the Hermitian constraint enabled.
    pub hermitian: bool,
    /// Factory layout name: `diagonal`, `tridiagonal` or `circulant`.
    pub preset: String,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            dimension: 6,
            hermitian: false,
            preset: FactoryPreset::default().name().to_string(),
        }
    }
}

impl MatrixConfig {
    /// Parses [`preset`](Self::preset).
    pub fn factory_preset(&self) -> Result<FactoryPreset, ConfigError> {
        self.preset.parse().map_err(|reason| {
            ConfigError::Validation(crate::ValidationError::InvalidValue {
                field: "matrix.preset".to_string(),
                reason,
            })
        })
    }
}

/// `[solver]`: eigen-solver limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    /// Iteration budget per eigenvalue.
    pub max_iterations_per_eigenvalue: usize,
    /// Relative tolerance for the Hermitian path check.
    pub hermitian_tolerance: f64,
}

impl Default for SolverSection {
    fn default() -> Self {
        let defaults = SolverConfig::default();
        Self {
            max_iterations_per_eigenvalue: defaults.max_iterations_per_eigenvalue,
            hermitian_tolerance: defaults.hermitian_tolerance,
        }
    }
}

impl From<&SolverSection> for SolverConfig {
    fn from(section: &SolverSection) -> Self {
        SolverConfig {
            max_iterations_per_eigenvalue: section.max_iterations_per_eigenvalue,
            hermitian_tolerance: section.hermitian_tolerance,
        }
    }
}

/// Excitation policy as spelled in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySetting {
    /// Keep old voices and add new ones.
    Layer,
    /// Fade old voices out on every excitation.
    #[default]
    Retrigger,
}

impl From<PolicySetting> for ExcitationPolicy {
    fn from(policy: PolicySetting) -> Self {
        match policy {
            PolicySetting::Layer => ExcitationPolicy::Layer,
            PolicySetting::Retrigger => ExcitationPolicy::Retrigger,
        }
    }
}

/// `[synth]`: eigenvalue mapping and voice handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Frequency of a mode with `Im λ = 0`.
    pub offset_hz: f32,
    /// Hz per unit of `|Im λ|`.
    pub hz_per_unit: f32,
    /// Lower frequency clamp.
    pub min_hz: f32,
    /// Upper frequency clamp.
    pub max_hz: f32,
    /// Decay rate per unit of positive `Re λ`.
    pub decay_scale: f32,
    /// Ring time of undamped modes.
    pub sustain_seconds: f32,
    /// Voice pool size.
    pub max_voices: usize,
    /// Fade applied to old voices on retrigger.
    pub retrigger_release_ms: f32,
    /// Quietest modal amplitude that still gets a voice.
    pub min_amplitude: f32,
    /// `layer` or `retrigger`.
    pub policy: PolicySetting,
}

impl Default for SynthConfig {
    fn default() -> Self {
        let mapping = ModeMapping::default();
        let settings = SynthSettings::default();
        Self {
            offset_hz: mapping.offset_hz,
            hz_per_unit: mapping.hz_per_unit,
            min_hz: mapping.min_hz,
            max_hz: mapping.max_hz,
            decay_scale: mapping.decay_scale,
            sustain_seconds: mapping.sustain_seconds,
            max_voices: settings.max_voices,
            retrigger_release_ms: settings.retrigger_release_ms,
            min_amplitude: settings.min_amplitude,
            policy: PolicySetting::default(),
        }
    }
}

impl SynthConfig {
    /// The pitch/decay mapping described by this section.
    pub fn mapping(&self) -> ModeMapping {
        ModeMapping {
            offset_hz: self.offset_hz,
            hz_per_unit: self.hz_per_unit,
            min_hz: self.min_hz,
            max_hz: self.max_hz,
            decay_scale: self.decay_scale,
            sustain_seconds: self.sustain_seconds,
        }
    }

    /// Voice pool settings described by this section.
    pub fn settings(&self) -> SynthSettings {
        SynthSettings {
            max_voices: self.max_voices,
            retrigger_release_ms: self.retrigger_release_ms,
            min_amplitude: self.min_amplitude,
            policy: self.policy.into(),
        }
    }
}

/// `[filter]`: resonator bank settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Bank crossfade length.
    pub crossfade_ms: f32,
    /// Bandwidth of undamped modes.
    pub min_bandwidth_hz: f32,
    /// Bandwidth ceiling.
    pub max_bandwidth_hz: f32,
    /// Initial wet ratio.
    pub dry_wet: f32,
    /// Dry/wet glide time.
    pub dry_wet_smoothing_ms: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let d = FilterSettings::default();
        Self {
            crossfade_ms: d.crossfade_ms,
            min_bandwidth_hz: d.min_bandwidth_hz,
            max_bandwidth_hz: d.max_bandwidth_hz,
            dry_wet: d.dry_wet,
            dry_wet_smoothing_ms: d.dry_wet_smoothing_ms,
        }
    }
}

impl From<&FilterConfig> for FilterSettings {
    fn from(c: &FilterConfig) -> Self {
        FilterSettings {
            crossfade_ms: c.crossfade_ms,
            min_bandwidth_hz: c.min_bandwidth_hz,
            max_bandwidth_hz: c.max_bandwidth_hz,
            dry_wet: c.dry_wet,
            dry_wet_smoothing_ms: c.dry_wet_smoothing_ms,
        }
    }
}

/// Complete engine configuration.
///
/// Every section and field has a default, so a file only needs the values
/// it changes.
///
/// # TOML Format
///
/// ```toml
/// mode = "synthesizer"
///
/// [audio]
/// sample_rate = 48000
/// block_size = 256
/// master_gain = 0.5
///
/// [matrix]
/// dimension = 6
/// hermitian = false
/// preset = "tridiagonal"
///
/// [synth]
/// policy = "layer"
/// sustain_seconds = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting signal path.
    pub mode: EngineMode,
    /// Device and stream settings.
    pub audio: AudioConfig,
    /// Initial operator.
    pub matrix: MatrixConfig,
    /// Solver limits.
    pub solver: SolverSection,
    /// Synthesizer settings.
    pub synth: SynthConfig,
    /// Modal filter settings.
    pub filter: FilterConfig,
}

impl EngineConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, else the user config file if it exists,
    /// else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = paths::default_config_path();
        if default_path.is_file() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serializes to pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::persist(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::persist(path, e))?;
        Ok(())
    }

    /// Range and consistency checks on every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)?;
        Ok(())
    }

    /// Solver settings.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::from(&self.solver)
    }

    /// Filter settings.
    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings::from(&self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.synth.mapping(), ModeMapping::default());
        assert_eq!(config.synth.settings(), SynthSettings::default());
        assert_eq!(config.filter_settings(), FilterSettings::default());
        assert_eq!(config.solver_config(), SolverConfig::default());
        assert_eq!(config.matrix.factory_preset().unwrap(), FactoryPreset::Diagonal);
        assert!(!config.matrix.hermitian);
        assert_eq!(config.mode, EngineMode::Synthesizer);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            mode = "effect"

            [matrix]
            preset = "circulant"

            [synth]
            policy = "layer"
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, EngineMode::Effect);
        assert_eq!(config.matrix.factory_preset().unwrap(), FactoryPreset::Circulant);
        assert_eq!(config.matrix.dimension, 6);
        assert_eq!(config.synth.settings().policy, ExcitationPolicy::Layer);
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected_on_parse() {
        let err = EngineConfig::from_toml("[audio]\nmaster_gain = 4.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{err}");
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = EngineConfig::from_toml("mode = \"karaoke\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn toml_round_trip() {
        let mut config = EngineConfig::default();
        config.audio.output_device = Some("Speakers".to_string());
        config.synth.policy = PolicySetting::Layer;
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("synth".parse::<EngineMode>(), Ok(EngineMode::Synthesizer));
        assert_eq!("Effect".parse::<EngineMode>(), Ok(EngineMode::Effect));
        assert!("other".parse::<EngineMode>().is_err());
    }
}
