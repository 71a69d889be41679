// src/config.rs
use sqlx::postgres::PgConnectOptions;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings shared by the API server and the migration tool.
///
/// Built once at startup and passed by reference; nothing below the binaries
/// reads the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: PgConnectOptions,
    pub max_connections: u32,
    pub batch_size: usize,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `DATABASE_URL` wins over
    /// the individual `DB_*` / `POSTGRES_*` parts.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match var("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                expected: "Postgres connection URL",
                value: "<hidden>".to_string(),
            })?,
            None => {
                // Built from parts so credentials never need URL escaping.
                let port: u16 = parse_or("DB_PORT", var("DB_PORT"), 5432, "port number")?;
                let options = PgConnectOptions::new()
                    .host(&var("DB_HOST").unwrap_or_else(|| "localhost".to_string()))
                    .port(port)
                    .database(&var("POSTGRES_DB").unwrap_or_else(|| "lv_project".to_string()))
                    .username(&var("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string()));
                match var("POSTGRES_PASSWORD") {
                    Some(password) => options.password(&password),
                    None => options,
                }
            }
        };

        let max_connections = parse_or(
            "DB_MAX_CONNECTIONS",
            var("DB_MAX_CONNECTIONS"),
            5,
            "connection count",
        )?;
        let batch_size: usize = parse_or(
            "MIGRATION_BATCH_SIZE",
            var("MIGRATION_BATCH_SIZE"),
            10,
            "positive batch size",
        )?;
        if batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "MIGRATION_BATCH_SIZE",
                expected: "positive batch size",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database,
            max_connections,
            batch_size,
            host: parse_or("HOST", var("HOST"), IpAddr::from([127, 0, 0, 1]), "IP address")?,
            port: parse_or("PORT", var("PORT"), 8000, "port number")?,
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database.get_host(), "localhost");
        assert_eq!(config.database.get_port(), 5432);
        assert_eq!(config.database.get_username(), "postgres");
        assert_eq!(config.database.get_database(), Some("lv_project"));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_origin, "http://localhost:3000");
    }

    #[test]
    fn database_url_takes_precedence_over_parts() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://app:secret@db:5433/luxx"),
            ("DB_HOST", "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.database.get_host(), "db");
        assert_eq!(config.database.get_port(), 5433);
        assert_eq!(config.database.get_username(), "app");
        assert_eq!(config.database.get_database(), Some("luxx"));
    }

    #[test]
    fn parts_may_hold_url_reserved_characters() {
        let config = Config::from_lookup(lookup(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("POSTGRES_DB", "inventory"),
            ("POSTGRES_USER", "luxx@ops"),
            ("POSTGRES_PASSWORD", "p@ss/w:rd"),
        ]))
        .unwrap();
        assert_eq!(config.database.get_host(), "db.internal");
        assert_eq!(config.database.get_port(), 6543);
        assert_eq!(config.database.get_username(), "luxx@ops");
        assert_eq!(config.database.get_database(), Some("inventory"));
    }

    #[test]
    fn malformed_database_url_is_rejected_without_echoing_it() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://app:topsecret@[db/luxx")]))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(!msg.contains("topsecret"));
    }

    #[test]
    fn rejects_zero_batch_size_and_bad_numbers() {
        assert!(Config::from_lookup(lookup(&[("MIGRATION_BATCH_SIZE", "0")])).is_err());
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
