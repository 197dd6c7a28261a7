use std::{fmt, time::Duration};

use anyhow::Context;

/// Connection string sources for the shared pool, highest priority first.
pub const POOLED_URL_SOURCES: &[&str] = &[
    "POSTGRES_URL",
    "DATABASE_URL",
    "POSTGRES_URL_NON_POOLING",
    "DATABASE_URL_UNPOOLED",
    "POSTGRES_PRISMA_URL",
    "POSTGRES_URL_NO_SSL",
];

/// Connection string sources for the direct (non-pooled) DDL connection.
pub const DIRECT_URL_SOURCES: &[&str] = &[
    "POSTGRES_URL_NON_POOLING",
    "DATABASE_URL_UNPOOLED",
    "POSTGRES_URL",
    "DATABASE_URL",
];

const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub issuer: String,
    /// `None` means tokens carry no `exp` claim.
    pub ttl_minutes: Option<i64>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub url_source: Option<&'static str>,
    pub direct_url: Option<String>,
    pub max_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Connection strings embed credentials.
        f.debug_struct("DatabaseSettings")
            .field("url_source", &self.url_source)
            .field("has_direct_url", &self.direct_url.is_some())
            .field("max_connections", &self.max_connections)
            .field("max_lifetime", &self.max_lifetime)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the whole configuration through `lookup`, once.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (url_source, url) = match first_non_empty(POOLED_URL_SOURCES, &lookup) {
            // the provider's explicitly non-TLS alias is taken as is
            Some((source @ "POSTGRES_URL_NO_SSL", url)) => (Some(source), Some(url)),
            Some((source, url)) => (Some(source), Some(with_sslmode(url))),
            None => (None, None),
        };
        let direct_url = first_non_empty(DIRECT_URL_SOURCES, &lookup).map(|(_, url)| with_sslmode(url));

        let database = DatabaseSettings {
            url,
            url_source,
            direct_url,
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(4),
            max_lifetime: Duration::from_secs(30 * 60),
            acquire_timeout: Duration::from_secs(
                lookup("DB_ACQUIRE_TIMEOUT_SECS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(10),
            ),
        };

        let ttl_minutes = lookup("JWT_TTL_MINUTES")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_TTL_MINUTES);
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "chronos".into()),
            ttl_minutes: (ttl_minutes > 0).then_some(ttl_minutes),
        };

        let port = match lookup("APP_PORT") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid APP_PORT {p:?}"))?,
            None => 8080,
        };

        Ok(Self {
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database,
            jwt,
        })
    }
}

/// Returns the first source whose value is not blank, with the source name.
pub fn first_non_empty<F>(sources: &[&'static str], lookup: F) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    sources.iter().find_map(|&name| {
        lookup(name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (name, v))
    })
}

/// Appends `sslmode=require` unless the URL already pins a TLS mode.
pub fn with_sslmode(mut url: String) -> String {
    if url.contains("sslmode=") {
        return url;
    }
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str("sslmode=require");
    url
}
