//! Engine configuration.
//!
//! # Responsibility
//! - Parse host-supplied JSON settings for layout and logging.
//! - Reject out-of-range values before they reach the engine.
//!
//! # Invariants
//! - Every field has a default; `{}` is a valid config.

use crate::graph::layout::LayoutConfig;
use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_BARYCENTER_PASSES: usize = 32;

/// Top-level engine settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// Logging stays off when absent.
    pub logging: Option<LoggingConfig>,
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if !(layout.rank_spacing.is_finite() && layout.rank_spacing > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "layout.rank_spacing must be positive, got {}",
                layout.rank_spacing
            )));
        }
        if !(layout.slot_spacing.is_finite() && layout.slot_spacing > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "layout.slot_spacing must be positive, got {}",
                layout.slot_spacing
            )));
        }
        if layout.barycenter_passes > MAX_BARYCENTER_PASSES {
            return Err(ConfigError::Invalid(format!(
                "layout.barycenter_passes must be at most {MAX_BARYCENTER_PASSES}, got {}",
                layout.barycenter_passes
            )));
        }
        if let Some(logging) = &self.logging {
            logging
                .resolve()
                .map_err(|message| ConfigError::Invalid(format!("logging: {message}")))?;
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::graph::layout::Orientation;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.layout.barycenter_passes, 4);
        assert!(config.logging.is_none());
    }

    #[test]
    fn partial_layout_section_overrides_fields() {
        let config = EngineConfig::from_json_str(
            r#"{"layout": {"orientation": "top_to_bottom", "rank_spacing": 80.0}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.orientation, Orientation::TopToBottom);
        assert_eq!(config.layout.rank_spacing, 80.0);
        assert_eq!(config.layout.slot_spacing, 120.0);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"layout": {"slot_spacing": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("slot_spacing")));

        let err =
            EngineConfig::from_json_str(r#"{"layout": {"barycenter_passes": 99}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str(r#"{"logging": {"log_dir": "relative"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("absolute")));

        let err = EngineConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
