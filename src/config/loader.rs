//! Configuration loading from and saving to disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `account.private_key`.
pub const PRIVATE_KEY_ENV_VAR: &str = "VERIFIER_ACCOUNT_PRIVATE_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse configuration from TOML text, applying environment overrides.
///
/// Does not validate; the agent and the CLI have different requirements.
pub fn parse_config(content: &str) -> Result<AgentConfig, ConfigError> {
    let mut config: AgentConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    if let Ok(key) = std::env::var(PRIVATE_KEY_ENV_VAR) {
        config.account.private_key = Some(key);
    }
    if let Some(key) = config.account.private_key.take() {
        config.account.private_key = Some(normalize_hex(&key));
    }

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Write configuration to a TOML file, replacing any previous contents.
///
/// A private key injected from the environment is never written; the key
/// already on disk, if any, is kept in its place.
pub fn save_config(path: &Path, config: &AgentConfig) -> Result<(), ConfigError> {
    write_config(path, config, std::env::var(PRIVATE_KEY_ENV_VAR).ok().as_deref())
}

fn write_config(path: &Path, config: &AgentConfig, env_key: Option<&str>) -> Result<(), ConfigError> {
    let mut persisted = config.clone();
    let from_env = env_key.map(normalize_hex);
    if from_env.is_some() && persisted.account.private_key == from_env {
        persisted.account.private_key = stored_private_key(path)?;
    }

    let content = toml::to_string_pretty(&persisted).map_err(ConfigError::Serialize)?;

    // Write to a sibling file first so a crash never leaves a truncated config.
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, content).map_err(ConfigError::Io)?;
    fs::rename(&tmp, path).map_err(ConfigError::Io)?;

    tracing::info!(path = %path.display(), "Configuration written");
    Ok(())
}

/// The private key currently in the file, without environment overrides.
fn stored_private_key(path: &Path) -> Result<Option<String>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Io(e)),
    };
    let stored: AgentConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
    Ok(stored.account.private_key)
}

/// Ensure a hex string carries the `0x` prefix.
pub fn normalize_hex(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        format!("0x{}", &trimmed[2..])
    } else {
        format!("0x{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex() {
        assert_eq!(normalize_hex("abcd"), "0xabcd");
        assert_eq!(normalize_hex("0xabcd"), "0xabcd");
        assert_eq!(normalize_hex("0Xabcd"), "0xabcd");
        assert_eq!(normalize_hex("  abcd\n"), "0xabcd");
    }

    #[test]
    fn test_parse_error() {
        let result = parse_config("[ledger\nrpc_url = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_reload_contract_address() {
        let path = std::env::temp_dir().join(format!(
            "device-verifier-config-{}.toml",
            std::process::id()
        ));

        let config = AgentConfig::default()
            .with_contract_address("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        save_config(&path, &config).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let reloaded = parse_config(&content).unwrap();
        assert_eq!(
            reloaded.contract.address.as_deref(),
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );

        let _ = fs::remove_file(&path);
    }

    const FILE_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const ENV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("device-verifier-{}-{}.toml", name, std::process::id()))
    }

    fn config_with_key(key: Option<&str>) -> AgentConfig {
        let mut config = AgentConfig::default();
        config.account.private_key = key.map(str::to_string);
        config
    }

    #[test]
    fn test_environment_key_keeps_file_key_on_save() {
        let path = temp_path("env-key");
        write_config(&path, &config_with_key(Some(FILE_KEY)), None).unwrap();

        // As loaded with the environment variable set.
        let loaded = config_with_key(Some(ENV_KEY))
            .with_contract_address("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        write_config(&path, &loaded, Some(ENV_KEY.trim_start_matches("0x"))).unwrap();

        let stored: AgentConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.account.private_key.as_deref(), Some(FILE_KEY));
        assert!(stored.contract.address.is_some());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_environment_key_is_not_written_to_new_file() {
        let path = temp_path("env-key-new");
        let _ = fs::remove_file(&path);

        write_config(&path, &config_with_key(Some(ENV_KEY)), Some(ENV_KEY)).unwrap();

        let stored: AgentConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.account.private_key, None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_edited_key_is_saved_despite_environment() {
        let path = temp_path("edited-key");
        write_config(&path, &config_with_key(Some(ENV_KEY)), Some(FILE_KEY)).unwrap();

        let stored: AgentConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.account.private_key.as_deref(), Some(ENV_KEY));

        let _ = fs::remove_file(&path);
    }
}
