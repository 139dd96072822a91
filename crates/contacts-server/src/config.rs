//! Server configuration from environment variables.
//!
//!   CONTACTS_DATABASE_URL            Postgres connection string (falls back to DATABASE_URL)
//!   CONTACTS_BIND_ADDR               listen address (default: 0.0.0.0:3000)
//!   CONTACTS_DB_MAX_CONNECTIONS      pool size (default: 10)
//!   CONTACTS_DB_ACQUIRE_TIMEOUT_SECS pool acquire timeout (default: 30)
//!   CONTACTS_STORE                   `postgres` (default) or `memory`
//!   CONTACTS_SEED_PHONE_TYPES        seed the standard phone types (default: true)

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};

use contacts_postgres::DatabaseConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub enum StoreKind {
    Postgres(DatabaseConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub store: StoreKind,
    pub seed_phone_types: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("CONTACTS_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let seed_phone_types = match get("CONTACTS_SEED_PHONE_TYPES") {
            Some(v) => parse_bool("CONTACTS_SEED_PHONE_TYPES", &v)?,
            None => true,
        };

        let store = match get("CONTACTS_STORE").as_deref() {
            None | Some("postgres") => {
                let url = get("CONTACTS_DATABASE_URL")
                    .or_else(|| get("DATABASE_URL"))
                    .ok_or_else(|| {
                        anyhow!("CONTACTS_DATABASE_URL or DATABASE_URL must be set")
                    })?;
                let mut db = DatabaseConfig::new(url);
                if let Some(v) = get("CONTACTS_DB_MAX_CONNECTIONS") {
                    db.max_connections = parse("CONTACTS_DB_MAX_CONNECTIONS", &v)?;
                }
                if let Some(v) = get("CONTACTS_DB_ACQUIRE_TIMEOUT_SECS") {
                    db.acquire_timeout =
                        Duration::from_secs(parse("CONTACTS_DB_ACQUIRE_TIMEOUT_SECS", &v)?);
                }
                StoreKind::Postgres(db)
            }
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("CONTACTS_STORE must be 'postgres' or 'memory', got '{other}'"),
        };

        Ok(Self {
            bind_addr,
            store,
            seed_phone_types,
        })
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: '{value}'"))
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("invalid value for {key}: '{value}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_with_database_url_fallback() {
        let cfg = config(&[("DATABASE_URL", "postgresql:///contacts")]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert!(cfg.seed_phone_types);
        match cfg.store {
            StoreKind::Postgres(db) => {
                assert_eq!(db.database_url, "postgresql:///contacts");
                assert_eq!(db.max_connections, 10);
                assert_eq!(db.acquire_timeout, Duration::from_secs(30));
            }
            StoreKind::Memory => panic!("expected postgres store"),
        }
    }

    #[test]
    fn prefixed_url_wins() {
        let cfg = config(&[
            ("DATABASE_URL", "postgresql:///other"),
            ("CONTACTS_DATABASE_URL", "postgresql:///contacts"),
            ("CONTACTS_DB_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();
        let StoreKind::Postgres(db) = cfg.store else {
            panic!("expected postgres store");
        };
        assert_eq!(db.database_url, "postgresql:///contacts");
        assert_eq!(db.max_connections, 4);
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn memory_store_needs_no_url() {
        let cfg = config(&[("CONTACTS_STORE", "memory"), ("CONTACTS_SEED_PHONE_TYPES", "false")])
            .unwrap();
        assert!(matches!(cfg.store, StoreKind::Memory));
        assert!(!cfg.seed_phone_types);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config(&[("CONTACTS_STORE", "redis")]).is_err());
        assert!(config(&[
            ("DATABASE_URL", "postgresql:///contacts"),
            ("CONTACTS_DB_MAX_CONNECTIONS", "many"),
        ])
        .is_err());
        assert!(config(&[("CONTACTS_STORE", "memory"), ("CONTACTS_SEED_PHONE_TYPES", "maybe")])
            .is_err());
    }
}
