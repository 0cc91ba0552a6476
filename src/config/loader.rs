//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::VeilConfig;
use crate::domain::{Result, VeilError};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into VeilConfig
/// 4. Applies environment variable overrides (VEIL_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - An override has the wrong format
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use veil::config::load_config;
///
/// let config = load_config("veil.toml").expect("Failed to load config");
/// println!("max retries: {}", config.anonymizer.max_retries);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VeilConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VeilError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VeilError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: VeilConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        VeilError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Every missing variable is reported
/// in a single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| VeilError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(VeilError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    let mut result = lines.join("\n");
    if input.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Read and parse an override variable, if set
fn env_override<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            VeilError::Configuration(format!("Invalid value '{raw}' for {name}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using VEIL_* prefix
///
/// Environment variables follow the pattern: VEIL_<SECTION>_<KEY>
/// For example: VEIL_ANONYMIZER_MAX_RETRIES, VEIL_AUDIT_ENABLED
fn apply_env_overrides(config: &mut VeilConfig) -> Result<()> {
    // Anonymizer overrides
    if let Some(max_retries) = env_override("VEIL_ANONYMIZER_MAX_RETRIES")? {
        config.anonymizer.max_retries = max_retries;
    }
    if let Some(reset) = env_override("VEIL_ANONYMIZER_RESET")? {
        config.anonymizer.reset = reset;
    }
    if let Some(seed) = env_override("VEIL_ANONYMIZER_SEED")? {
        config.anonymizer.seed = Some(seed);
    }
    if let Ok(val) = std::env::var("VEIL_ANONYMIZER_LOCALE") {
        config.anonymizer.locale = val;
    }

    // Audit overrides
    if let Some(enabled) = env_override("VEIL_AUDIT_ENABLED")? {
        config.audit.enabled = enabled;
    }
    if let Ok(val) = std::env::var("VEIL_AUDIT_LOG_PATH") {
        config.audit.log_path = val.into();
    }
    if let Some(json_format) = env_override("VEIL_AUDIT_JSON_FORMAT")? {
        config.audit.json_format = json_format;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("VEIL_LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some(local_enabled) = env_override("VEIL_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = local_enabled;
    }
    if let Ok(val) = std::env::var("VEIL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_substitute_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("VEIL_TEST_SUBST", "test_value");
        let input = "log_path = \"${VEIL_TEST_SUBST}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "log_path = \"test_value\"");
        std::env::remove_var("VEIL_TEST_SUBST");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("VEIL_MISSING_A");
        std::env::remove_var("VEIL_MISSING_B");
        let input = "a = \"${VEIL_MISSING_A}\"\nb = \"${VEIL_MISSING_B}${VEIL_MISSING_A}\"\n";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("VEIL_MISSING_A, VEIL_MISSING_B"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("VEIL_IN_COMMENT");
        let input = "# path = \"${VEIL_IN_COMMENT}\"\nlevel = \"info\"\n";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(VeilError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
[anonymizer]
max_retries = 50
seed = 7

[audit]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.anonymizer.max_retries, 50);
        assert_eq!(config.anonymizer.seed, Some(7));
        assert_eq!(config.anonymizer.locale, "en");
    }

    #[test]
    fn test_invalid_override_is_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("VEIL_ANONYMIZER_MAX_RETRIES", "many");
        let mut config = VeilConfig::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        std::env::remove_var("VEIL_ANONYMIZER_MAX_RETRIES");
        assert!(err.to_string().contains("VEIL_ANONYMIZER_MAX_RETRIES"));
    }
}
