use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use chrono::FixedOffset;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use url::Url;

use crate::domain::EmailAddress;

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub newsletter: NewsletterSettings,
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        let path = env::current_dir()?.join("settings");
        // `APP_ENV` selects the runtime file, defaulting to `dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }

    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from(base_path.join("base")).required(true))
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // NOTE: Prod secrets come in as `APP_<section>__<name>`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,

    secret_key: Secret<String>,
    cron_secret: Secret<String>,

    #[serde(default)]
    cookie_secure: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    session_ttl_hours: i64,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
    /// The secret used to sign admin session tokens
    pub fn secret_key(&self) -> &Secret<String> {
        &self.secret_key
    }
    /// Bearer secret expected by the scheduled newsletter trigger
    pub fn cron_secret(&self) -> &Secret<String> {
        &self.cron_secret
    }

    pub fn session(&self) -> SessionSettings {
        SessionSettings {
            ttl: chrono::Duration::hours(self.session_ttl_hours),
            cookie_secure: self.cookie_secure,
        }
    }
}

/// Options for issuing admin session cookies
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: chrono::Duration,
    pub cookie_secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::hours(12),
            cookie_secure: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    require_ssl: bool,
}

impl DatabaseSettings {
    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        use secrecy::ExposeSecret;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }

    /// The database connection options, with the database name
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    sender: String,
    api_base_url: String,
    api_auth_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
    /// Inbox that receives contact and catering notifications
    notify_address: Option<String>,
}

impl EmailSettings {
    /// The email address to send application emails from
    pub fn sender(&self) -> anyhow::Result<EmailAddress> {
        self.sender
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse email sender address: {}", e))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }

    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse email base URL")
    }

    pub fn api_auth_token(&self) -> Secret<String> {
        self.api_auth_token.clone()
    }

    pub fn notify_address(&self) -> anyhow::Result<Option<EmailAddress>> {
        self.notify_address
            .as_deref()
            .map(|addr| {
                addr.parse()
                    .map_err(|e| anyhow::anyhow!("Failed to parse notify address: {}", e))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsletterSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_delay_milliseconds: u64,
    /// `0` disables the in-process worker
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub stale_after_minutes: i64,
}

impl NewsletterSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_milliseconds)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        match self.poll_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stale_after_minutes)
    }
}

impl Default for NewsletterSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay_milliseconds: 1000,
            poll_interval_seconds: 0,
            stale_after_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    utc_offset_minutes: i32,
    /// Path to a `regexes.yaml` file for the user-agent parser
    user_agent_regexes: Option<PathBuf>,
}

impl AnalyticsSettings {
    /// The site's local offset, used to find calendar-day boundaries
    pub fn utc_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .context("UTC offset out of range")
    }

    pub fn user_agent_regexes(&self) -> Option<&Path> {
        self.user_agent_regexes.as_deref()
    }
}

/// Optional administrator created at startup when no users exist
#[derive(Debug, Default, Deserialize)]
pub struct AdminSettings {
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
}
