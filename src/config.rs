use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

// Service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct TeamgateConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub cookies: CookieSettings,
    pub session_idle_timeout_secs: u64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

/// Session cookie attributes shared with the HTTP layer.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

/// Initial admin account created when the user store is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TeamgateConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    postgres_acquire_timeout_ms: Option<u64>,
    cookie_name: Option<String>,
    cookie_secure: Option<bool>,
    session_idle_timeout_secs: Option<u64>,
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => bail!("unknown storage backend: {other}"),
    }
}

impl TeamgateConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("TEAMGATE_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8443".to_string())
            .parse()
            .with_context(|| "parse TEAMGATE_BIND")?;
        let metrics_bind = std::env::var("TEAMGATE_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse TEAMGATE_METRICS_BIND")?;
        let storage = parse_storage(
            &std::env::var("TEAMGATE_STORAGE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let postgres = match std::env::var("TEAMGATE_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: std::env::var("TEAMGATE_POSTGRES_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()
                    .with_context(|| "parse TEAMGATE_POSTGRES_MAX_CONNECTIONS")?,
                acquire_timeout_ms: std::env::var("TEAMGATE_POSTGRES_ACQUIRE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .with_context(|| "parse TEAMGATE_POSTGRES_ACQUIRE_TIMEOUT_MS")?,
            }),
            Err(_) => None,
        };
        if storage == StorageBackend::Postgres && postgres.is_none() {
            bail!("TEAMGATE_POSTGRES_URL is required when TEAMGATE_STORAGE=postgres");
        }
        let cookies = CookieSettings {
            name: std::env::var("TEAMGATE_COOKIE_NAME")
                .unwrap_or_else(|_| "teamgate_session".to_string()),
            secure: std::env::var("TEAMGATE_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        };
        let session_idle_timeout_secs = std::env::var("TEAMGATE_SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".to_string())
            .parse()
            .with_context(|| "parse TEAMGATE_SESSION_IDLE_TIMEOUT_SECS")?;
        let bootstrap_admin = match (
            std::env::var("TEAMGATE_BOOTSTRAP_ADMIN_USERNAME"),
            std::env::var("TEAMGATE_BOOTSTRAP_ADMIN_EMAIL"),
            std::env::var("TEAMGATE_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(email), Ok(password)) => Some(BootstrapAdmin {
                username,
                email,
                password,
            }),
            _ => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            cookies,
            session_idle_timeout_secs,
            bootstrap_admin,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TEAMGATE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TEAMGATE_CONFIG: {path}"))?;
            let override_cfg: TeamgateConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.storage {
                config.storage = parse_storage(&value)?;
            }
            if let Some(url) = override_cfg.postgres_url {
                let existing = config.postgres.take();
                config.postgres = Some(PostgresConfig {
                    url,
                    max_connections: override_cfg
                        .postgres_max_connections
                        .or(existing.as_ref().map(|p| p.max_connections))
                        .unwrap_or(16),
                    acquire_timeout_ms: override_cfg
                        .postgres_acquire_timeout_ms
                        .or(existing.as_ref().map(|p| p.acquire_timeout_ms))
                        .unwrap_or(5000),
                });
            }
            if let Some(value) = override_cfg.cookie_name {
                config.cookies.name = value;
            }
            if let Some(value) = override_cfg.cookie_secure {
                config.cookies.secure = value;
            }
            if let Some(value) = override_cfg.session_idle_timeout_secs {
                config.session_idle_timeout_secs = value;
            }
            if config.storage == StorageBackend::Postgres && config.postgres.is_none() {
                bail!("postgres_url is required when storage is postgres");
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "TEAMGATE_BIND",
            "TEAMGATE_METRICS_BIND",
            "TEAMGATE_STORAGE",
            "TEAMGATE_POSTGRES_URL",
            "TEAMGATE_POSTGRES_MAX_CONNECTIONS",
            "TEAMGATE_POSTGRES_ACQUIRE_TIMEOUT_MS",
            "TEAMGATE_COOKIE_NAME",
            "TEAMGATE_COOKIE_SECURE",
            "TEAMGATE_SESSION_IDLE_TIMEOUT_SECS",
            "TEAMGATE_BOOTSTRAP_ADMIN_USERNAME",
            "TEAMGATE_BOOTSTRAP_ADMIN_EMAIL",
            "TEAMGATE_BOOTSTRAP_ADMIN_PASSWORD",
            "TEAMGATE_CONFIG",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_env_is_empty() {
        clear_env();
        let config = TeamgateConfig::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 8443);
        assert_eq!(config.metrics_bind.port(), 8080);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.postgres.is_none());
        assert_eq!(config.cookies.name, "teamgate_session");
        assert!(config.cookies.secure);
        assert_eq!(config.session_idle_timeout_secs, 1800);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    #[serial]
    fn postgres_backend_requires_url() {
        clear_env();
        std::env::set_var("TEAMGATE_STORAGE", "postgres");
        let err = TeamgateConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("TEAMGATE_POSTGRES_URL"));
        clear_env();
    }

    #[test]
    #[serial]
    fn env_overrides_are_honored() {
        clear_env();
        std::env::set_var("TEAMGATE_BIND", "127.0.0.1:9000");
        std::env::set_var("TEAMGATE_STORAGE", "postgres");
        std::env::set_var("TEAMGATE_POSTGRES_URL", "postgres://localhost/teamgate");
        std::env::set_var("TEAMGATE_POSTGRES_MAX_CONNECTIONS", "4");
        std::env::set_var("TEAMGATE_COOKIE_SECURE", "false");
        let config = TeamgateConfig::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.postgres.as_ref().unwrap().max_connections, 4);
        assert!(!config.cookies.secure);
        clear_env();
    }

    #[test]
    #[serial]
    fn yaml_overrides_env() {
        clear_env();
        let dir = std::env::temp_dir().join(format!("teamgate-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(
            &path,
            "bind_addr: \"127.0.0.1:7777\"\ncookie_name: custom_session\n",
        )
        .unwrap();
        std::env::set_var("TEAMGATE_CONFIG", &path);
        let config = TeamgateConfig::from_env_or_yaml().unwrap();
        assert_eq!(config.bind_addr.port(), 7777);
        assert_eq!(config.cookies.name, "custom_session");
        clear_env();
        std::fs::remove_dir_all(&dir).ok();
    }
}
