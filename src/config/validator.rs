use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{KwildError, Result, ValidationError};
use crate::filtering::CompiledFilter;
use crate::patterns::MAX_FUZZY_DISTANCE;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_matching(config, &mut errors);
        Self::validate_actions(config, &mut errors);
        Self::validate_profiles(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(KwildError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_matching(config: &Config, errors: &mut Vec<ValidationError>) {
        let distance = config.matching.fuzzy_distance;
        if distance == 0 || distance > MAX_FUZZY_DISTANCE {
            errors.push(ValidationError::new(
                "matching.fuzzy_distance",
                format!(
                    "Fuzzy distance must be between 1 and {}, got {}",
                    MAX_FUZZY_DISTANCE, distance
                ),
            ));
        }
    }

    fn validate_actions(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.actions.batch_size == 0 {
            errors.push(ValidationError::new(
                "actions.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    /// Each profile must compile on its own
    fn validate_profiles(config: &Config, errors: &mut Vec<ValidationError>) {
        for (name, spec) in &config.profiles {
            if let Err(e) = CompiledFilter::compile(spec) {
                errors.push(ValidationError::new(
                    format!("profiles.{}", name),
                    e.to_string(),
                ));
            }
        }
    }
}
