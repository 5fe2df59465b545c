//! Range and consistency checks for [`EngineConfig`](crate::EngineConfig).
//!
//! Every problem is collected, so a bad file reports all of its mistakes at
//! once instead of one per run.

use crate::engine::EngineConfig;
use eigensound_core::{FactoryPreset, MAX_DIMENSION};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field outside its allowed range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field name, e.g. `audio.block_size`.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Field with a value that does not parse or contradicts another field.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Default)]
struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !(min..=max).contains(&value) {
            self.errors.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn invalid(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}

/// Checks every section of `config`.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut c = Collector::default();

    let audio = &config.audio;
    c.range("audio.sample_rate", f64::from(audio.sample_rate), 8000.0, 192_000.0);
    c.range("audio.block_size", audio.block_size as f64, 16.0, 8192.0);
    c.range("audio.channels", f64::from(audio.channels), 1.0, 8.0);
    c.range("audio.master_gain", f64::from(audio.master_gain), 0.0, 1.0);

    let matrix = &config.matrix;
    c.range("matrix.dimension", matrix.dimension as f64, 1.0, MAX_DIMENSION as f64);
    if let Err(reason) = matrix.preset.parse::<FactoryPreset>() {
        c.invalid("matrix.preset", reason);
    }

    let solver = &config.solver;
    c.range(
        "solver.max_iterations_per_eigenvalue",
        solver.max_iterations_per_eigenvalue as f64,
        1.0,
        10_000.0,
    );
    c.range("solver.hermitian_tolerance", solver.hermitian_tolerance, 0.0, 1e-3);

    let synth = &config.synth;
    let nyquist = f64::from(audio.sample_rate) / 2.0;
    c.range("synth.offset_hz", f64::from(synth.offset_hz), 0.0, nyquist);
    c.range("synth.hz_per_unit", f64::from(synth.hz_per_unit), 0.0, 10_000.0);
    c.range("synth.min_hz", f64::from(synth.min_hz), 1.0, nyquist);
    c.range("synth.max_hz", f64::from(synth.max_hz), 1.0, 20_000.0);
    if synth.min_hz > synth.max_hz {
        c.invalid("synth.min_hz", "must not exceed synth.max_hz");
    }
    c.range("synth.decay_scale", f64::from(synth.decay_scale), 0.0, 1000.0);
    c.range("synth.sustain_seconds", f64::from(synth.sustain_seconds), 0.01, 600.0);
    c.range("synth.max_voices", synth.max_voices as f64, 1.0, 4096.0);
    c.range("synth.retrigger_release_ms", f64::from(synth.retrigger_release_ms), 0.0, 1000.0);
    c.range("synth.min_amplitude", f64::from(synth.min_amplitude), 0.0, 1.0);

    let filter = &config.filter;
    c.range("filter.crossfade_ms", f64::from(filter.crossfade_ms), 0.0, 1000.0);
    c.range("filter.min_bandwidth_hz", f64::from(filter.min_bandwidth_hz), 0.1, nyquist);
    c.range("filter.max_bandwidth_hz", f64::from(filter.max_bandwidth_hz), 0.1, nyquist);
    if filter.min_bandwidth_hz > filter.max_bandwidth_hz {
        c.invalid("filter.min_bandwidth_hz", "must not exceed filter.max_bandwidth_hz");
    }
    c.range("filter.dry_wet", f64::from(filter.dry_wet), 0.0, 1.0);
    c.range("filter.dry_wet_smoothing_ms", f64::from(filter.dry_wet_smoothing_ms), 0.0, 1000.0);

    c.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let mut config = EngineConfig::default();
        config.matrix.dimension = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "matrix.dimension"
        ));
    }

    #[test]
    fn all_errors_are_reported() {
        let mut config = EngineConfig::default();
        config.audio.block_size = 1;
        config.matrix.preset = "banded".to_string();
        config.filter.min_bandwidth_hz = 3000.0;
        config.filter.max_bandwidth_hz = 100.0;

        let Err(ValidationError::Multiple(errors)) = validate_config(&config) else {
            panic!("expected multiple errors");
        };
        assert_eq!(errors.len(), 3);
        let msg = ValidationError::Multiple(errors).to_string();
        assert!(msg.contains("audio.block_size"), "{msg}");
        assert!(msg.contains("matrix.preset"), "{msg}");
        assert!(msg.contains("filter.min_bandwidth_hz"), "{msg}");
    }

    #[test]
    fn nan_is_out_of_range() {
        let mut config = EngineConfig::default();
        config.filter.dry_wet = f32::NAN;
        assert!(validate_config(&config).is_err());
    }
}
