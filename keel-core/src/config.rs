use crate::{ErrorKind, Result};
use std::env;

/// Environment variable holding a connection URL, the dialect is taken from its scheme.
pub const DATABASE_URL_VAR: &str = "KEEL_DATABASE_URL";
/// Environment variable naming the dialect directly.
pub const DIALECT_VAR: &str = "KEEL_DIALECT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Key in the dialect registry.
    pub dialect: String,
    /// Idle builders kept for reuse.
    pub builder_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: "sqlite".into(),
            builder_pool_size: 32,
        }
    }
}

impl Config {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            ..Default::default()
        }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| ErrorKind::UnknownDialect(url.to_string()))?;
        let dialect = match scheme.as_str() {
            "sqlite" => "sqlite",
            "postgres" | "postgresql" => "postgres",
            "mysql" | "mariadb" => "mysql",
            "sqlserver" | "mssql" => "sqlserver",
            "oracle" => "oracle",
            _ => return Err(ErrorKind::UnknownDialect(scheme).into()),
        };
        Ok(Self::new(dialect))
    }

    /// Reads `KEEL_DATABASE_URL`, falling back to `KEEL_DIALECT`, then to the default.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = env::var(DATABASE_URL_VAR) {
            return Self::from_url(&url);
        }
        if let Ok(dialect) = env::var(DIALECT_VAR) {
            return Ok(Self::new(dialect));
        }
        Ok(Default::default())
    }

    pub fn with_builder_pool_size(mut self, size: usize) -> Self {
        self.builder_pool_size = size;
        self
    }
}
