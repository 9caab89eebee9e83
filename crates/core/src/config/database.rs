//! Named database connection configuration
//!
//! Each connection has a name ("mysql", "postgres", "mysql_secondary", ...),
//! a dialect and pool settings. Configurations come either from a YAML file
//! or from environment variables using the conventional per-connection
//! prefixes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::validation::ConfigError;

/// Name of the connection used when nothing else is configured
pub const DEFAULT_CONNECTION: &str = "mysql";

/// Database engine family of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl DatabaseType {
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::MySql => Some(3306),
            DatabaseType::Postgres => Some(5432),
            DatabaseType::Sqlite => None,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::MySql => write!(f, "mysql"),
            DatabaseType::Postgres => write!(f, "postgres"),
            DatabaseType::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DatabaseType::MySql),
            "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            "sqlite" => Ok(DatabaseType::Sqlite),
            _ => Err(ConfigError::UnknownDatabaseType(s.to_string())),
        }
    }
}

/// Configuration for one named connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: DatabaseType,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or the database file path for SQLite
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub ssl_mode: Option<String>,
    /// Connections the pool keeps open when idle; capped at `max_open_conns`
    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: u32,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
    #[serde(default = "default_conn_max_lifetime")]
    pub conn_max_lifetime_secs: u64,
    #[serde(default = "default_conn_max_idle_time")]
    pub conn_max_idle_time_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_idle_conns() -> u32 {
    10
}

fn default_max_open_conns() -> u32 {
    200
}

fn default_conn_max_lifetime() -> u64 {
    15 * 60
}

fn default_conn_max_idle_time() -> u64 {
    5 * 60
}

fn default_acquire_timeout() -> u64 {
    30
}

impl DatabaseConfig {
    /// Create a configuration with default pool settings
    pub fn new(kind: DatabaseType) -> Self {
        Self {
            kind,
            host: String::new(),
            port: None,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            charset: None,
            timezone: None,
            ssl_mode: None,
            max_idle_conns: default_max_idle_conns(),
            max_open_conns: default_max_open_conns(),
            conn_max_lifetime_secs: default_conn_max_lifetime(),
            conn_max_idle_time_secs: default_conn_max_idle_time(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }

    /// SQLite configuration backed by a database file
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            database: path.into(),
            ..Self::new(DatabaseType::Sqlite)
        }
    }

    /// Check the fields required by this connection's engine
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        match self.kind {
            DatabaseType::MySql | DatabaseType::Postgres => {
                if self.host.is_empty() {
                    return Err(ConfigError::invalid(name, format!("host is required for {}", self.kind)));
                }
                if self.database.is_empty() {
                    return Err(ConfigError::invalid(
                        name,
                        format!("database name is required for {}", self.kind),
                    ));
                }
                if self.username.is_empty() {
                    return Err(ConfigError::invalid(
                        name,
                        format!("username is required for {}", self.kind),
                    ));
                }
            }
            DatabaseType::Sqlite => {
                if self.database.is_empty() {
                    return Err(ConfigError::invalid(name, "database file path is required for sqlite"));
                }
            }
        }
        Ok(())
    }

    /// Build the driver URL for this connection
    pub fn build_url(&self) -> Result<String, ConfigError> {
        self.url_with_password(&self.password)
    }

    /// Driver URL with the password replaced, suitable for display
    pub fn masked_url(&self) -> String {
        let mask = if self.password.is_empty() { "" } else { "***" };
        self.url_with_password(mask)
            .unwrap_or_else(|_| format!("{}://***", self.kind))
    }

    fn url_with_password(&self, password: &str) -> Result<String, ConfigError> {
        let invalid = |reason: &str| ConfigError::url(self.database.clone(), reason);

        match self.kind {
            DatabaseType::Sqlite => {
                if self.database == ":memory:" {
                    Ok("sqlite::memory:".to_string())
                } else {
                    Ok(format!("sqlite://{}?mode=rwc", self.database))
                }
            }
            DatabaseType::MySql | DatabaseType::Postgres => {
                let scheme = match self.kind {
                    DatabaseType::MySql => "mysql",
                    _ => "postgres",
                };
                let port = self.port.or_else(|| self.kind.default_port()).unwrap_or_default();
                let mut url = Url::parse(&format!("{}://{}:{}/{}", scheme, self.host, port, self.database))
                    .map_err(|e| invalid(&e.to_string()))?;

                if !self.username.is_empty() {
                    url.set_username(&self.username)
                        .map_err(|_| invalid("username cannot be encoded in url"))?;
                }
                if !password.is_empty() {
                    url.set_password(Some(password))
                        .map_err(|_| invalid("password cannot be encoded in url"))?;
                }

                {
                    let mut query = url.query_pairs_mut();
                    match self.kind {
                        DatabaseType::MySql => {
                            if let Some(charset) = &self.charset {
                                query.append_pair("charset", charset);
                            }
                        }
                        _ => {
                            if let Some(ssl_mode) = &self.ssl_mode {
                                query.append_pair("sslmode", ssl_mode);
                            }
                            if let Some(timezone) = &self.timezone {
                                query.append_pair("options", &format!("-c TimeZone={}", timezone));
                            }
                        }
                    }
                }

                let mut built = url.to_string();
                if built.ends_with('?') {
                    built.pop();
                }
                Ok(built)
            }
        }
    }
}

/// All configured connections plus the name of the default one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfigs {
    #[serde(default = "default_connection_name")]
    pub default: String,
    #[serde(default)]
    pub connections: BTreeMap<String, DatabaseConfig>,
}

fn default_connection_name() -> String {
    DEFAULT_CONNECTION.to_string()
}

impl Default for DatabaseConfigs {
    fn default() -> Self {
        Self {
            default: default_connection_name(),
            connections: BTreeMap::new(),
        }
    }
}

impl DatabaseConfigs {
    /// Load the stock connections from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the stock connections through an arbitrary variable lookup
    ///
    /// Recognised prefixes are `MYSQL_`, `POSTGRES_` and `MYSQL_SECONDARY_`.
    /// `DB_CONNECTION` selects the default connection name.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup: &lookup };
        let mut connections = BTreeMap::new();

        let mut mysql = env.connection("MYSQL", DatabaseType::MySql);
        mysql.charset = Some(env.string("MYSQL_CHARSET", "utf8mb4"));
        connections.insert("mysql".to_string(), mysql);

        let mut postgres = env.connection("POSTGRES", DatabaseType::Postgres);
        postgres.timezone = Some(env.string("POSTGRES_TIMEZONE", "UTC"));
        postgres.ssl_mode = Some(env.string("POSTGRES_SSLMODE", "disable"));
        connections.insert("postgres".to_string(), postgres);

        let mut secondary = env.connection("MYSQL_SECONDARY", DatabaseType::MySql);
        secondary.charset = Some(env.string("MYSQL_SECONDARY_CHARSET", "utf8mb4"));
        connections.insert("mysql_secondary".to_string(), secondary);

        Self {
            default: env.string("DB_CONNECTION", DEFAULT_CONNECTION),
            connections,
        }
    }

    /// Parse configurations from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseConfig> {
        self.connections.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, config: DatabaseConfig) {
        self.connections.insert(name.into(), config);
    }

    pub fn with_connection(mut self, name: impl Into<String>, config: DatabaseConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = name.into();
        self
    }

    /// Configured connection names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }
}

struct EnvReader<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<'a, F: Fn(&str) -> Option<String>> EnvReader<'a, F> {
    fn string(&self, key: &str, fallback: &str) -> String {
        (self.lookup)(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str, fallback: T) -> T {
        (self.lookup)(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(fallback)
    }

    fn connection(&self, prefix: &str, kind: DatabaseType) -> DatabaseConfig {
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);
        let default_port = kind.default_port().unwrap_or_default();

        DatabaseConfig {
            host: self.string(&key("HOST"), "localhost"),
            port: Some(self.parse(&key("PORT"), default_port)),
            database: self.string(&key("DB"), ""),
            username: self.string(&key("USER"), ""),
            password: self.string(&key("PASSWORD"), ""),
            timezone: (self.lookup)(&key("TIMEZONE")),
            max_idle_conns: self.parse(&key("MAX_IDLE_CONNS"), default_max_idle_conns()),
            max_open_conns: self.parse(&key("MAX_OPEN_CONNS"), default_max_open_conns()),
            conn_max_lifetime_secs: self.parse(&key("CONN_MAX_LIFETIME"), default_conn_max_lifetime()),
            conn_max_idle_time_secs: self.parse(&key("CONN_MAX_IDLE_TIME"), default_conn_max_idle_time()),
            ..DatabaseConfig::new(kind)
        }
    }
}
