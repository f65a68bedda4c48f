//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Load and validate configuration from a YAML or TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_layout() {
        let yaml = r#"
server:
  listen: "8080"
  paths:
    - location: /api/
      target: http://127.0.0.1:9000
      connection_limit: 2
      drop_over_limit: true
    - location: /
      target: http://127.0.0.1:9001
      connection_limit: 10
"#;
        let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.server.paths.len(), 2);
        assert_eq!(config.server.paths[0].location, "/api/");
        assert!(config.server.paths[0].drop_over_limit);
        assert!(!config.server.paths[1].drop_over_limit);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn parses_toml_layout() {
        let toml = r#"
[server]
listen = "127.0.0.1:3000"

[[server.paths]]
location = "/"
target = "http://127.0.0.1:9000"
connection_limit = 1

[timeouts]
upstream_secs = 10
"#;
        let config = parse_config(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.timeouts.upstream_secs, 10);
    }

    #[test]
    fn validation_errors_are_fatal() {
        let yaml = r#"
server:
  paths:
    - location: /
      target: http://127.0.0.1:9000
      connection_limit: 1
    - location: /
      target: http://127.0.0.1:9001
      connection_limit: 1
"#;
        let err = parse_config(yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("proxy.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Yaml);
    }
}
