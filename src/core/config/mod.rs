use anyhow::{bail, Context};

const DEV_JWT_SECRET: &str = "callserver-development-secret-change-me";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    #[cfg(feature = "drive")]
    pub drive: DriveConfig,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub root: String,
    pub url: String,
    pub max_upload_bytes: usize,
}

#[cfg(feature = "drive")]
#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub server: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_str = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL must be set")?;

        let port = get_str("SERVER_PORT", "8080")
            .parse::<u16>()
            .context("SERVER_PORT must be a valid port number")?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|v| !v.trim().is_empty()) {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => DEV_JWT_SECRET.to_string(),
            None => bail!("JWT_SECRET must be set in release builds"),
        };

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin {
                    email: email.trim().to_lowercase(),
                    password,
                })
            }
            _ => None,
        };

        let mut media_url = get_str("MEDIA_URL", "/media/");
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        Ok(Self {
            server: ServerConfig {
                host: get_str("SERVER_HOST", "0.0.0.0"),
                port,
                base_url: get_str("BASE_URL", &format!("http://localhost:{}", port))
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: database_url,
                pool_size: get_str("DB_POOL_SIZE", "10")
                    .parse()
                    .context("DB_POOL_SIZE must be a positive integer")?,
            },
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_minutes: get_str("JWT_EXPIRY_MINUTES", "1440")
                    .parse()
                    .context("JWT_EXPIRY_MINUTES must be an integer")?,
            },
            media: MediaConfig {
                root: get_str("MEDIA_ROOT", "./media"),
                url: media_url,
                max_upload_bytes: get_str("MAX_UPLOAD_BYTES", "52428800")
                    .parse()
                    .context("MAX_UPLOAD_BYTES must be an integer")?,
            },
            #[cfg(feature = "drive")]
            drive: DriveConfig {
                server: get_str("DRIVE_SERVER", "http://localhost:9000"),
                access_key: get_str("DRIVE_ACCESSKEY", ""),
                secret_key: get_str("DRIVE_SECRET", ""),
                bucket: get_str("DRIVE_BUCKET", "callserver"),
                region: get_str("DRIVE_REGION", "auto"),
            },
            cors_origins: get_str("CORS_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            bootstrap_admin,
        })
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
    fn test_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/calls")]))
                .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.media.url, "/media/");
        assert_eq!(config.database.pool_size, 10);
        assert!(config.cors_origins.is_empty());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/calls"),
            ("SERVER_PORT", "9090"),
            ("BASE_URL", "https://calls.example.com/"),
            ("MEDIA_URL", "/files"),
            ("CORS_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("BOOTSTRAP_ADMIN_EMAIL", " Admin@Example.com "),
            ("BOOTSTRAP_ADMIN_PASSWORD", "Secret123"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.base_url, "https://calls.example.com");
        assert_eq!(config.media.url, "/files/");
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(
            config.bootstrap_admin.map(|a| a.email),
            Some("admin@example.com".to_string())
        );
    }

    #[test]
    fn test_missing_database_url() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_invalid_port() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/calls"),
            ("SERVER_PORT", "not-a-port"),
        ]));
        assert!(result.is_err());
    }
}
