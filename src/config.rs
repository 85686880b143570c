use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use uuid::Uuid;

use crate::{
    error::{Error, TypeError},
    services::composition::TagPolicy,
};

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub base_url: String,
    pub tag_policy: TagPolicy,
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL");
        let session_secret = match var("SESSION_SECRET") {
            Some(secret) => secret,
            None if database_url.is_some() => {
                return Err(TypeError::new("SESSION_SECRET must be set when DATABASE_URL is").into())
            }
            None => {
                log::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                Uuid::new_v4().to_string()
            }
        };

        Ok(Self {
            addr: try_load(&var, "FOODGRAM_ADDR", "0.0.0.0:8000")?,
            database_max_connections: try_load(&var, "DATABASE_MAX_CONNECTIONS", "5")?,
            database_url,
            redis_url: var("REDIS_URL"),
            session_secret,
            session_ttl_hours: try_load(&var, "SESSION_TTL_HOURS", "24")?,
            base_url: var("BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8000".to_owned())
                .trim_end_matches('/')
                .to_owned(),
            tag_policy: try_load(&var, "TAG_POLICY", "strict")?,
            catalog_path: var("CATALOG_PATH").map(PathBuf::from),
        })
    }
}

fn try_load<T, F>(var: &F, key: &str, default: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_owned()
        })
        .parse()
        .map_err(|e| TypeError::new(&format!("Invalid {key} value: {e}")).into())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_a_database() {
        let config = load(&[]).unwrap();

        assert_eq!(config.addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.tag_policy, TagPolicy::Strict);
        assert!(!config.session_secret.is_empty());
    }

    #[test]
    fn database_requires_a_session_secret() {
        assert!(load(&[("DATABASE_URL", "postgres://localhost/foodgram")]).is_err());

        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/foodgram"),
            ("SESSION_SECRET", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.session_secret, "s3cret");
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(load(&[("FOODGRAM_ADDR", "nowhere")]).is_err());
        assert!(load(&[("SESSION_TTL_HOURS", "soon")]).is_err());
        assert!(load(&[("TAG_POLICY", "loose")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("TAG_POLICY", "Lenient"),
            ("BASE_URL", "https://foodgram.example/"),
            ("CATALOG_PATH", "data/catalog.json"),
        ])
        .unwrap();

        assert_eq!(config.tag_policy, TagPolicy::Lenient);
        assert_eq!(config.base_url, "https://foodgram.example");
        assert_eq!(config.catalog_path, Some(PathBuf::from("data/catalog.json")));
    }
}
