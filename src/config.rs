use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Outgoing mail relay. Without it, mail is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade the connection with STARTTLS; disable only for local relays.
    pub starttls: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub static_dir: String,
    pub mail_from: String,
    pub ngo_contact_email: String,
    pub support_email: String,
    pub smtp: Option<SmtpSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 4000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            static_dir: "public".to_string(),
            mail_from: "noreply@donation-relay.local".to_string(),
            ngo_contact_email: "ngo@donation-relay.local".to_string(),
            support_email: "support@donation-relay.local".to_string(),
            smtp: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
            mail_from: env::var("MAIL_FROM").unwrap_or(defaults.mail_from),
            ngo_contact_email: env::var("NGO_CONTACT_EMAIL").unwrap_or(defaults.ngo_contact_email),
            support_email: env::var("SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            smtp: smtp_from_env()?,
        })
    }
}

fn smtp_from_env() -> Result<Option<SmtpSettings>, AppError> {
    let Some(host) = non_empty_var("SMTP_HOST") else {
        return Ok(None);
    };

    Ok(Some(SmtpSettings {
        host,
        port: parse_or_default("SMTP_PORT", 587)?,
        username: non_empty_var("SMTP_USERNAME"),
        password: non_empty_var("SMTP_PASSWORD"),
        starttls: parse_or_default("SMTP_STARTTLS", true)?,
    }))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat, AppError> {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("compact") => Ok(LogFormat::Compact),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(AppError::Internal(format!(
            "invalid LOG_FORMAT: {other}, expected compact or json"
        ))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
