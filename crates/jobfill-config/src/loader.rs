//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.jobfill`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.bridge.channel, "jobfill");
    }

    #[test]
    fn test_load_bridge_section() {
        let content = r#"
            [bridge]
            channel = "applications"
            request_timeout_ms = 0
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.bridge.channel, "applications");
        assert!(config.bridge.request_timeout().is_none());
    }

    #[test]
    fn test_load_fields_with_locator() {
        let content = r#"
            [fields.text_input]
            section_attribute = "data-fkit-id"

            [fields.checkbox]
            enabled = false

            [fields.password_input.locator]
            tag = "div"
            has = [{ tag = "input", attributes = [{ op = "equals", name = "type", value = "password" }] }]
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(
            config.fields.text_input.section_attribute.as_deref(),
            Some("data-fkit-id")
        );
        assert!(!config.fields.checkbox.enabled);
        let locator = config.fields.password_input.locator.unwrap();
        assert_eq!(locator.to_string(), ".//div[.//input[@type='password']]");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[discovery]").unwrap();
        writeln!(file, "marker_attribute = \"data-filled\"").unwrap();
        writeln!(file, "watch_mutations = false").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.discovery.marker_attribute, "data-filled");
        assert!(!config.discovery.watch_mutations);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.bridge.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("JOBFILL_TEST_CHANNEL", "from-env");
        }
        let config = ConfigLoader::load_str("[bridge]\nchannel = \"${JOBFILL_TEST_CHANNEL}\"").unwrap();
        assert_eq!(config.bridge.channel, "from-env");
        unsafe {
            std::env::remove_var("JOBFILL_TEST_CHANNEL");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_JOBFILL_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        assert_eq!(ConfigLoader::expand_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(ConfigLoader::expand_path("/var/log"), "/var/log");
        let expanded = ConfigLoader::expand_path("~/test");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/test"));
    }
}
