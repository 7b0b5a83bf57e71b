use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    /// PostgREST endpoint authenticated with the public anon key.
    Rest { url: String, api_key: String },
    Postgres { database_url: String },
    Memory { seed_file: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub page_size: usize,
    pub users_page_size: usize,
    pub recent_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let backend_name = match get("DATA_BACKEND") {
            Some(name) => name.to_lowercase(),
            None if get("SUPABASE_URL").is_some() => "rest".to_string(),
            None if get("DATABASE_URL").is_some() => "postgres".to_string(),
            None => return Err(ConfigError::Missing("DATA_BACKEND")),
        };

        let backend = match backend_name.as_str() {
            "rest" => Backend::Rest {
                url: require("SUPABASE_URL")?.trim_end_matches('/').to_string(),
                api_key: require("SUPABASE_ANON_KEY")?,
            },
            "postgres" => Backend::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            "memory" => Backend::Memory {
                seed_file: get("SEED_FILE").map(PathBuf::from),
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "DATA_BACKEND",
                    reason: format!("unknown backend '{}'", other),
                })
            }
        };

        Ok(Self {
            backend,
            port: parse_or(get("PORT"), "PORT", 3000)?,
            jwt_secret: require("JWT_SECRET")?,
            admin_email: require("ADMIN_EMAIL")?,
            admin_password_hash: require("ADMIN_PASSWORD_HASH")?,
            page_size: positive(parse_or(get("PAGE_SIZE"), "PAGE_SIZE", 10)?, "PAGE_SIZE")?,
            users_page_size: positive(
                parse_or(get("USERS_PAGE_SIZE"), "USERS_PAGE_SIZE", 5)?,
                "USERS_PAGE_SIZE",
            )?,
            recent_limit: positive(parse_or(get("RECENT_LIMIT"), "RECENT_LIMIT", 100)?, "RECENT_LIMIT")?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive(value: usize, name: &'static str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
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

    const AUTH: [(&str, &str); 3] = [
        ("JWT_SECRET", "secret"),
        ("ADMIN_EMAIL", "admin@example.com"),
        ("ADMIN_PASSWORD_HASH", "$2b$04$hash"),
    ];

    #[test]
    fn rest_backend_is_inferred_from_supabase_url() {
        let mut pairs = AUTH.to_vec();
        pairs.push(("SUPABASE_URL", "https://project.supabase.co/"));
        pairs.push(("SUPABASE_ANON_KEY", "anon"));

        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.backend,
            Backend::Rest {
                url: "https://project.supabase.co".to_string(),
                api_key: "anon".to_string(),
            }
        );
        assert_eq!(config.port, 3000);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.users_page_size, 5);
        assert_eq!(config.recent_limit, 100);
    }

    #[test]
    fn rest_backend_requires_the_anon_key() {
        let mut pairs = AUTH.to_vec();
        pairs.push(("DATA_BACKEND", "rest"));
        pairs.push(("SUPABASE_URL", "https://project.supabase.co"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_ANON_KEY")));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut pairs = AUTH.to_vec();
        pairs.push(("DATA_BACKEND", "memory"));
        pairs.push(("PAGE_SIZE", "0"));

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PAGE_SIZE", .. }));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut pairs = AUTH.to_vec();
        pairs.push(("DATA_BACKEND", "mysql"));

        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }
}
