use std::env;
use std::net::{IpAddr, SocketAddr};

use crate::error::{config_error, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub seed: bool,
}

impl Config {
    /// Reads the process environment. Call `dotenv().ok()` first to pick up
    /// a local `.env` file.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match lookup("HOST") {
            Some(value) => value.parse().map_err(|_| config_error("HOST"))?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| config_error("PORT"))?,
            None => 5000,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());

        let mock_data = parse_flag(&lookup, "MOCK_DATA")?.unwrap_or(false);

        let store = match lookup("STORE").as_deref() {
            _ if mock_data => StoreKind::Memory,
            Some("memory") => StoreKind::Memory,
            Some("postgres") => StoreKind::Postgres,
            Some(_) => return Err(config_error("STORE")),
            None if database_url.is_some() => StoreKind::Postgres,
            None => StoreKind::Memory,
        };

        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(config_error("DATABASE_URL"));
        }

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .map_err(|_| config_error("DATABASE_MAX_CONNECTIONS"))?,
            None => 5,
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| "dev_secret_change_me".into());

        let seed = parse_flag(&lookup, "SEED")?.unwrap_or(store == StoreKind::Memory);

        Ok(Self {
            host,
            port,
            store,
            database_url,
            database_max_connections,
            jwt_secret,
            seed,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Fails for the in-memory store, which does not outlive the process.
    pub fn require_persistent_store(&self) -> Result<(), Error> {
        if self.store == StoreKind::Memory {
            return Err(config_error("STORE"));
        }

        Ok(())
    }
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>, Error>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).as_deref() {
        None => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(_) => Err(config_error(name)),
    }
}

#[cfg(test)]
fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: std::collections::HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    move |name| vars.get(name).cloned()
}

#[test]
fn defaults_to_seeded_memory_store() {
    let config = Config::from_lookup(lookup_in(&[])).unwrap();

    assert_eq!(config.store, StoreKind::Memory);
    assert_eq!(config.addr(), "127.0.0.1:5000".parse().unwrap());
    assert_eq!(config.jwt_secret, "dev_secret_change_me");
    assert!(config.seed);
}

#[test]
fn database_url_selects_postgres_unless_mocked() {
    let url = ("DATABASE_URL", "postgresql://trotro@localhost/trotro");

    let config = Config::from_lookup(lookup_in(&[url])).unwrap();
    assert_eq!(config.store, StoreKind::Postgres);
    assert!(!config.seed);

    let config = Config::from_lookup(lookup_in(&[url, ("MOCK_DATA", "true")])).unwrap();
    assert_eq!(config.store, StoreKind::Memory);
}

#[test]
fn malformed_values_fail() {
    assert_eq!(
        Config::from_lookup(lookup_in(&[("PORT", "http")])).unwrap_err().code,
        3
    );
    assert!(Config::from_lookup(lookup_in(&[("STORE", "postgres")])).is_err());
    assert!(Config::from_lookup(lookup_in(&[("SEED", "maybe")])).is_err());
}

#[test]
fn maintenance_needs_a_persistent_store() {
    let config = Config::from_lookup(lookup_in(&[])).unwrap();
    assert_eq!(config.require_persistent_store().unwrap_err().code, 3);

    let url = ("DATABASE_URL", "postgresql://trotro@localhost/trotro");
    let config = Config::from_lookup(lookup_in(&[url])).unwrap();
    assert!(config.require_persistent_store().is_ok());
}
