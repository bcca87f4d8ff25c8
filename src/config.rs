//! Environment-driven configuration.
//!
//! The binary loads `.env` with `dotenvy` first; everything here reads
//! through a lookup function so tests can supply their own environment.

use std::fmt;
use std::path::PathBuf;

use crate::engine::diagnostics::DEFAULT_DEBUG_DIR;
use crate::error::ConfigError;
use crate::hands::BrowserOptions;
use crate::selectors::SelectorTable;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_CONTEXT: &str = "Mahasiswa Magang IT";

/// Portal login pair. Never written to disk; `Debug` hides the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Option<Credentials>,
    pub openrouter_api_key: Option<String>,
    pub ai_model: String,
    pub activity_context: String,
    pub show_browser: bool,
    pub log_level: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub prefer_stealth: bool,
    pub selectors_path: Option<PathBuf>,
    pub debug_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
    pub persist_profile: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| non_empty(lookup(name));

        let credentials = match (get("MAGANGHUB_EMAIL"), get("MAGANGHUB_PASSWORD")) {
            (Some(identifier), Some(secret)) => Some(Credentials::new(identifier, secret)),
            _ => None,
        };
        // CI runners default to the plain launch
        let on_ci = flag(&lookup, "GITHUB_ACTIONS", false)?;

        Ok(Self {
            credentials,
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            ai_model: get("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            activity_context: get("AKTIVITAS_KONTEKS")
                .unwrap_or_else(|| DEFAULT_CONTEXT.to_string()),
            show_browser: flag(&lookup, "SHOW_BROWSER", true)?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("ALLOWED_TELEGRAM_ID"),
            prefer_stealth: flag(&lookup, "AUTOABSEN_USE_UC", !on_ci)?,
            selectors_path: get("AUTOABSEN_SELECTORS").map(PathBuf::from),
            debug_dir: get("AUTOABSEN_DEBUG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_DIR)),
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            profile_dir: get("AUTOABSEN_PROFILE_DIR").map(PathBuf::from),
            persist_profile: flag(&lookup, "AUTOABSEN_PERSIST_PROFILE", false)?,
        })
    }

    pub fn credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials
            .as_ref()
            .ok_or(ConfigError::Missing("MAGANGHUB_EMAIL / MAGANGHUB_PASSWORD"))
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.openrouter_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))
    }

    /// Default portal selectors, overlaid with the configured file if any.
    pub fn selectors(&self) -> Result<SelectorTable, ConfigError> {
        match &self.selectors_path {
            Some(path) => SelectorTable::from_file(path),
            None => Ok(SelectorTable::default()),
        }
    }

    pub fn browser_options(&self, show_browser: bool) -> BrowserOptions {
        BrowserOptions {
            headless: !show_browser,
            chrome_path: self.chrome_path.clone(),
            profile_dir: self.profile_dir.clone(),
            persist_profile: self.persist_profile,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Boolean variable with a default when unset or blank.
pub fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match non_empty(lookup(name)) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got {raw:?}"),
        }),
    }
}
