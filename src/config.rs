use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub debug_mode: bool,
    pub db_url: String,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub db_port: u16,
    pub schema: String,
    pub max_connections: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            db_url: "localhost".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            db_name: "bag".to_string(),
            db_port: 5432,
            schema: "bagactueel".to_string(),
            max_connections: num_cpus::get() as u32,
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("host", &self.db_url)
            .field("port", &self.db_port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.db_name)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .field("debug_mode", &self.debug_mode)
            .finish()
    }
}

impl RegistryConfig {
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
        let config: Self = if is_yaml {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })?
        } else {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?
        };
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_schema = !self.schema.is_empty()
            && self.schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !self.schema.starts_with(|c: char| c.is_ascii_digit());
        if !valid_schema {
            return Err(ConfigError::Invalid(format!("schema '{}' is not a plain SQL identifier", self.schema)));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("maxConnections must be at least 1".to_string()));
        }
        Ok(())
    }
}
