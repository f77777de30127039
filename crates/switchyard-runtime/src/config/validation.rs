//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    ExpirationConfig, LogOutput, LogRotation, LoggingConfig, PolicyKind, SwitchyardConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchyardConfig) -> ConfigResult<()> {
    validate_expiration(&config.expiration)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_expiration(expiration: &ExpirationConfig) -> ConfigResult<()> {
    if expiration.policy == PolicyKind::Inactivity && expiration.inactivity_minutes == 0 {
        return Err(ConfigError::validation(
            "expiration.inactivity_minutes must be greater than 0",
        ));
    }

    if expiration.sweep_interval_secs == 0 {
        return Err(ConfigError::validation(
            "expiration.sweep_interval_secs must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if logging.rotation != LogRotation::Never && logging.max_files == 0 {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0 when rotation is enabled",
        ));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation("logging.filters contains an empty module name"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SwitchyardConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_intervals() {
        let mut config = SwitchyardConfig::default();
        config.expiration.inactivity_minutes = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        // Explicit runtimes never look at the inactivity window.
        config.expiration.policy = PolicyKind::Explicit;
        assert!(validate_config(&config).is_ok());

        config.expiration.sweep_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = SwitchyardConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("switchyard.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rotation_keeps_at_least_one_file() {
        let mut config = SwitchyardConfig::default();
        config.logging.max_files = 0;
        assert!(validate_config(&config).is_ok());

        config.logging.rotation = LogRotation::Daily;
        assert!(validate_config(&config).is_err());
    }
}
