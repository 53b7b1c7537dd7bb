use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub public_base_url: String,
    pub allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_ttl_hours: i64,
    pub chapa_secret_key: String,
    pub chapa_base_url: String,
    pub chapa_webhook_secret: Option<String>,
    pub payment_currency: String,
    pub email: EmailConfig,
    pub embedded_worker: bool,
    pub rate_limit_enabled: bool,
}

/// SMTP settings. When `host` is unset, emails are written to the log instead.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        let email_username = env::var("EMAIL_HOST_USER").unwrap_or_default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            port,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "travel-api".to_string()),
            jwt_ttl_hours: env::var("JWT_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("JWT_TTL_HOURS must be a valid number")?,
            chapa_secret_key: env::var("CHAPA_SECRET_KEY").unwrap_or_default(),
            chapa_base_url: env::var("CHAPA_BASE_URL")
                .unwrap_or_else(|_| "https://api.chapa.co/v1".to_string()),
            chapa_webhook_secret: env::var("CHAPA_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
            email: EmailConfig {
                host: env::var("EMAIL_HOST").ok().filter(|s| !s.is_empty()),
                port: env::var("EMAIL_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .context("EMAIL_PORT must be a valid number")?,
                from_address: env::var("EMAIL_FROM").unwrap_or_else(|_| {
                    if email_username.is_empty() {
                        "ALX Travel <noreply@example.com>".to_string()
                    } else {
                        email_username.clone()
                    }
                }),
                username: email_username,
                password: env::var("EMAIL_HOST_PASSWORD").unwrap_or_default(),
            },
            embedded_worker: parse_bool(env::var("EMBEDDED_WORKER").ok(), true),
            rate_limit_enabled: parse_bool(env::var("RATE_LIMIT_ENABLED").ok(), true),
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("TRUE".into()), false));
        assert!(!parse_bool(Some("off".into()), true));
        assert!(parse_bool(Some("maybe".into()), true));
        assert!(!parse_bool(None, false));
    }
}
