//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_bridge(config, &mut result);
        Self::validate_discovery(config, &mut result);
        Self::validate_fields(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_bridge(config: &Config, result: &mut ValidationResult) {
        if config.bridge.channel.trim().is_empty() {
            result.add_error(ValidationError::new(
                "bridge.channel",
                "Channel name cannot be empty",
            ));
        }

        if config.bridge.request_timeout_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "bridge.request_timeout_ms",
                "Requests never time out; a silent server leaves callers waiting forever",
            ));
        }
    }

    fn validate_discovery(config: &Config, result: &mut ValidationResult) {
        if config.discovery.marker_attribute.trim().is_empty() {
            result.add_error(ValidationError::new(
                "discovery.marker_attribute",
                "Marker attribute cannot be empty",
            ));
        }
    }

    fn validate_fields(config: &Config, result: &mut ValidationResult) {
        let fields = &config.fields;
        if !fields.text_input.enabled && !fields.password_input.enabled && !fields.checkbox.enabled {
            result.add_warning(ValidationWarning::new(
                "fields",
                "All field kinds are disabled, nothing will be discovered",
            ));
        }

        if let Some(attribute) = &fields.text_input.section_attribute {
            if attribute.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "fields.text_input.section_attribute",
                    "section_attribute cannot be empty",
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
