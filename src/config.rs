//! Process configuration, read once at startup from the environment.
//!
//! `MYSQL_*` variables describe the database, `SCHOOLS_*` the HTTP side.

use crate::error::SchoolsError;
use crate::types::school_form::DEFAULT_MAX_IMAGE_BYTES;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, SchoolsError> {
        let mut database: DatabaseConfig = Figment::new()
            .merge(Env::prefixed("MYSQL_").ignore(RAW_KEYS))
            .extract()?;
        database.read_raw_env();
        let server: ServerConfig = Figment::from(Serialized::defaults(ServerConfig::default()))
            .merge(Env::prefixed("SCHOOLS_"))
            .extract()?;
        // Fail at startup rather than on first connect.
        database.connection_url()?;
        Ok(Self { database, server })
    }
}

/// Keys read verbatim. The env provider would parse `007` as a number or
/// `[secret]` as an array.
const RAW_KEYS: &[&str] = &["host", "user", "password", "database", "url"];

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip)]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(skip)]
    pub user: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip)]
    pub database: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    /// Full connection URL; takes precedence over the discrete settings.
    #[serde(skip)]
    pub url: Option<String>,
}

fn default_port() -> u16 {
    3306
}

fn default_connection_limit() -> u32 {
    10
}

impl DatabaseConfig {
    fn read_raw_env(&mut self) {
        let raw = |key: &str| dotenvy::var(format!("MYSQL_{}", key.to_ascii_uppercase())).ok();
        self.host = raw("host");
        self.user = raw("user");
        self.password = raw("password");
        self.database = raw("database");
        self.url = raw("url");
    }

    /// Connection URL for the pool. User and password are percent-encoded.
    pub fn connection_url(&self) -> Result<String, SchoolsError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let missing: Vec<&str> = [
            ("MYSQL_HOST", self.host.is_none()),
            ("MYSQL_USER", self.user.is_none()),
            ("MYSQL_PASSWORD", self.password.is_none()),
            ("MYSQL_DATABASE", self.database.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(SchoolsError::ConfigValue(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let host = self.host.as_deref().unwrap_or_default();
        let user = self.user.as_deref().unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        let database = self.database.as_deref().unwrap_or_default();

        let mut url = Url::parse("mysql://localhost")?;
        url.set_host(Some(host))?;
        url.set_port(Some(self.port))
            .map_err(|_| SchoolsError::ConfigValue("MYSQL_PORT cannot be applied".into()))?;
        url.set_username(user)
            .map_err(|_| SchoolsError::ConfigValue("MYSQL_USER cannot be applied".into()))?;
        if !password.is_empty() {
            url.set_password(Some(password))
                .map_err(|_| SchoolsError::ConfigValue("MYSQL_PASSWORD cannot be applied".into()))?;
        }
        url.set_path(database);
        url.query_pairs_mut()
            .append_pair("ssl-mode", if self.ssl { "required" } else { "disabled" });
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub public_dir: PathBuf,
    pub max_image_bytes: u64,
    pub loglevel: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            public_dir: PathBuf::from("public"),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            loglevel: "info".to_string(),
        }
    }
}
