//! Database configuration.
//!
//! [`DbConfig`] can be deserialized from an application's own config file
//! (it implements `serde::Deserialize`) or resolved from the process
//! environment with [`DbConfig::from_env`]:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `DATABASE_URL` / `DB_STRING` | full connection string, wins when set |
//! | `PG_HOST`, `PG_PORT`, `PG_USER`, `PG_PASSWORD`, `PG_DATABASE` | assembled into a URL otherwise |
//! | `PG_MAX_CONNECTIONS` | pool size, default 16 |

use crate::error::{OrmError, OrmResult};
use crate::pool::DEFAULT_MAX_CONNECTIONS;
use serde::Deserialize;

/// Connection settings for a [`Db`](crate::Db).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    /// PostgreSQL connection string (URL or key/value form).
    pub url: String,
    /// Upper bound of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Resolve from the environment, loading a `.env` file first if present.
    pub fn from_env() -> OrmResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = match get("PG_MAX_CONNECTIONS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                OrmError::Config(format!("PG_MAX_CONNECTIONS must be a number: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        if let Some(url) = get("DATABASE_URL").or_else(|| get("DB_STRING")) {
            return Ok(Self {
                url,
                max_connections,
            });
        }

        let host = get("PG_HOST").ok_or_else(|| {
            OrmError::Config("set DATABASE_URL, DB_STRING or PG_HOST".to_string())
        })?;
        let port = match get("PG_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| OrmError::Config(format!("PG_PORT must be a port number: {e}")))?,
            None => 5432,
        };
        let user = get("PG_USER").unwrap_or_else(|| "postgres".to_string());
        let database = get("PG_DATABASE").unwrap_or_else(|| user.clone());

        let url = match get("PG_PASSWORD") {
            Some(password) => format!("postgres://{user}:{password}@{host}:{port}/{database}"),
            None => format!("postgres://{user}@{host}:{port}/{database}"),
        };

        Ok(Self {
            url,
            max_connections,
        })
    }
}
