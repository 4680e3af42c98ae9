use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Plain environment variables understood for compatibility with existing
/// deployments, mapped to their settings key.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("MONITOR_CONFIG_FILE", "monitor.targets_file"),
    ("MONITOR_STATE_FILE", "monitor.state_file"),
    ("MONITOR_TIMEZONE", "monitor.timezone"),
    ("MONITOR_BASE_DIR", "monitor.base_dir"),
    ("HTTP_TIMEOUT_SECONDS", "http.timeout_seconds"),
    ("SMTP_HOST", "smtp.host"),
    ("SMTP_PORT", "smtp.port"),
    ("SMTP_USER", "smtp.username"),
    ("SMTP_PASS", "smtp.password"),
    ("EMAIL_FROM", "smtp.from_address"),
    ("SMTP_USE_TLS", "smtp.use_tls"),
    ("SMTP_TIMEOUT_SECONDS", "smtp.timeout_seconds"),
    ("LOG_FILE", "logging.file"),
    ("LOG_BACKUP_COUNT", "logging.max_files"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub http: HttpConfig,
    pub smtp: SmtpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub targets_file: PathBuf,
    pub state_file: PathBuf,
    /// IANA timezone name used to interpret daily schedule times.
    pub timezone: String,
    /// Directory that relative targets, state and log paths are anchored to.
    /// Unset means the working directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub accept_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub use_tls: bool,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
    pub max_files: usize,
    pub filter: String,
}

impl SmtpConfig {
    /// Sender address, falling back to the login name like most SMTP relays expect.
    pub fn sender(&self) -> Option<&str> {
        self.from_address
            .as_deref()
            .or(self.username.as_deref())
            .filter(|sender| !sender.trim().is_empty())
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?
            // Optional settings files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables such as STOCK_WATCHER__SMTP__HOST
            .add_source(Environment::with_prefix("STOCK_WATCHER").separator("__"));

        for (variable, key) in LEGACY_ENV_KEYS {
            let value = env::var(variable).ok().filter(|value| !value.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        config.anchor_paths();
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("monitor.targets_file", "monitor_targets.json")?
            .set_default("monitor.state_file", "monitor_state.json")?
            .set_default("monitor.timezone", "UTC")?
            .set_default("http.timeout_seconds", 30)?
            .set_default(
                "http.user_agent",
                "Mozilla/5.0 (X11; Linux) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            )?
            .set_default("http.accept_language", "fr-FR,fr;q=0.9,en;q=0.8")?
            .set_default("smtp.port", 587)?
            .set_default("smtp.use_tls", true)?
            .set_default("smtp.timeout_seconds", 30)?
            .set_default("logging.file", "monitor.log")?
            .set_default("logging.max_files", 5)?
            .set_default("logging.filter", "stock_watcher=info")
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.monitor.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Message(format!("Unknown timezone '{}'", self.monitor.timezone))
        })
    }

    /// Join relative file paths onto `monitor.base_dir`, when one is set.
    pub fn anchor_paths(&mut self) {
        let Some(base) = self.monitor.base_dir.clone() else {
            return;
        };
        anchor(&base, &mut self.monitor.targets_file);
        anchor(&base, &mut self.monitor.state_file);
        if let Some(file) = self.logging.file.as_mut() {
            anchor(&base, file);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Message("HTTP timeout_seconds must be greater than 0".into()));
        }

        if self.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if self.smtp.timeout_seconds == 0 {
            return Err(ConfigError::Message("SMTP timeout_seconds must be greater than 0".into()));
        }

        if self.logging.max_files == 0 {
            return Err(ConfigError::Message("Logging max_files must be greater than 0".into()));
        }

        Ok(())
    }
}

fn anchor(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
