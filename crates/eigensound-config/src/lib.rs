//! Configuration for the eigensound engine.
//!
//! One TOML file describes the audio stream, the starting operator, solver
//! limits and the synthesizer and filter tuning. Every field has a default;
//! values are range-checked on load.
//!
//! # Features
//!
//! - **EngineConfig**: `[audio]`, `[matrix]`, `[solver]`, `[synth]`, `[filter]`
//! - **Validation**: every out-of-range field reported at once
//! - **Paths**: platform config directory via `dirs`
//! - **Conversions**: sections turn into the library settings types
//!
//! # Example
//!
//! ```rust
//! use eigensound_config::{EngineConfig, EngineMode};
//!
//! let config = EngineConfig::from_toml(
//!     r#"
//!     mode = "effect"
//!
//!     [filter]
//!     dry_wet = 0.8
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.mode, EngineMode::Effect);
//! assert_eq!(config.filter_settings().dry_wet, 0.8);
//! ```

mod engine;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Configuration validation.
pub mod validation;

pub use engine::{
    AudioConfig, EngineConfig, EngineMode, FilterConfig, MatrixConfig, PolicySetting,
    SolverSection, SynthConfig,
};
pub use error::ConfigError;
pub use paths::{CONFIG_FILE_NAME, default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_config};
