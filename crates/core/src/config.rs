use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub audit: AuditConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Load deterministic demo fixtures at startup.
    pub seed_demo: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Role tables consulted by the audit gate, one per phase. `*` allows any
/// role.
#[derive(Clone, Debug)]
pub struct AuditConfig {
    pub inbound_roles: Vec<String>,
    pub outbound_roles: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8088,
                seed_demo: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            audit: AuditConfig {
                inbound_roles: vec![
                    "procurement_auditor".to_string(),
                    "ops_admin".to_string(),
                ],
                outbound_roles: vec![
                    "procurement_auditor".to_string(),
                    "ops_admin".to_string(),
                ],
            },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("opsdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(seed_demo) = server.seed_demo {
                self.server.seed_demo = seed_demo;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(audit) = patch.audit {
            if let Some(inbound_roles) = audit.inbound_roles {
                self.audit.inbound_roles = inbound_roles;
            }
            if let Some(outbound_roles) = audit.outbound_roles {
                self.audit.outbound_roles = outbound_roles;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OPSDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("OPSDESK_SERVER_PORT") {
            self.server.port = parse_u16("OPSDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("OPSDESK_SERVER_SEED_DEMO") {
            self.server.seed_demo = parse_bool("OPSDESK_SERVER_SEED_DEMO", &value)?;
        }

        let log_level = read_env("OPSDESK_LOGGING_LEVEL").or_else(|| read_env("OPSDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OPSDESK_LOGGING_FORMAT").or_else(|| read_env("OPSDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("OPSDESK_AUDIT_INBOUND_ROLES") {
            self.audit.inbound_roles = split_roles(&value);
        }
        if let Some(value) = read_env("OPSDESK_AUDIT_OUTBOUND_ROLES") {
            self.audit.outbound_roles = split_roles(&value);
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation("server.bind_address must be set".to_string()));
        }
        if self.audit.inbound_roles.is_empty() {
            return Err(ConfigError::Validation(
                "audit.inbound_roles must name at least one role".to_string(),
            ));
        }
        if self.audit.outbound_roles.is_empty() {
            return Err(ConfigError::Validation(
                "audit.outbound_roles must name at least one role".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    audit: Option<AuditPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    seed_demo: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct AuditPatch {
    inbound_roles: Option<Vec<String>>,
    outbound_roles: Option<Vec<String>>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("opsdesk.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{split_roles, AppConfig, ConfigError, ConfigPatch, LogFormat};

    #[test]
    fn defaults_pass_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn toml_patch_overrides_only_named_fields() {
        let patch: ConfigPatch = toml::from_str(
            r#"
            [server]
            port = 9090

            [audit]
            inbound_roles = ["warehouse_lead"]
            "#,
        )
        .expect("valid patch");

        let mut config = AppConfig::default();
        config.apply_patch(patch);

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.audit.inbound_roles, vec!["warehouse_lead".to_string()]);
        assert_eq!(config.audit.outbound_roles.len(), 2);
    }

    #[test]
    fn log_format_parsing_is_case_insensitive() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn role_lists_split_on_commas_and_drop_blanks() {
        assert_eq!(
            split_roles("procurement_auditor, ops_admin,,  "),
            vec!["procurement_auditor".to_string(), "ops_admin".to_string()]
        );
    }

    #[test]
    fn empty_role_table_fails_validation() {
        let mut config = AppConfig::default();
        config.audit.inbound_roles.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
