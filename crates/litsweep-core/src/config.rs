//! Configuration types for litsweep components.
//!
//! Runtime knobs (`HttpConfig`, `Pacing`) have hardcoded defaults matching the
//! published limits of each backend. The optional TOML file layers terms,
//! credentials and per-backend overrides on top:
//!
//! ```toml
//! output_dir = "runs/2024-survey"
//!
//! [terms]
//! primary = ["anchoring bias or framing effect", "confirmation bias"]
//! secondary = ["machine learning", "clinical decision"]
//!
//! [backends.scopus]
//! api_key = "..."
//! insttoken = "..."
//!
//! [backends.ieee]
//! enabled = false
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::Backend;

/// Requests allowed per backend before the daily cooldown kicks in.
pub const DEFAULT_DAILY_BUDGET: u64 = 500;

/// HTTP client configuration for external API calls.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Request pacing for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Wait before every network call.
    pub delay: Duration,
    /// Requests allowed before a cooldown; `None` disables the guard.
    pub daily_budget: Option<u64>,
    /// Length of the pause once the budget is used up.
    pub cooldown: Duration,
}

impl Pacing {
    /// Pacing used against the live APIs.
    ///
    /// IEEE meters its own quota server-side, so it carries no local budget.
    pub fn for_backend(backend: Backend) -> Self {
        let daily_budget = match backend {
            Backend::Ieee => None,
            Backend::Springer | Backend::Scopus | Backend::PubMed => Some(DEFAULT_DAILY_BUDGET),
        };
        Self {
            delay: Duration::from_secs(1),
            daily_budget,
            cooldown: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// No waiting and no budget; for tests and mocked backends.
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            daily_budget: None,
            cooldown: Duration::ZERO,
        }
    }

    pub fn with_daily_budget(mut self, budget: Option<u64>) -> Self {
        self.daily_budget = budget;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Search terms supplied through the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TermsConfig {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

/// One `[backends.<name>]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendEntry {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Institution token; only Scopus uses it.
    pub insttoken: Option<String>,
    pub request_delay_ms: Option<u64>,
    pub daily_budget: Option<u64>,
}

impl Default for BackendEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            insttoken: None,
            request_delay_ms: None,
            daily_budget: None,
        }
    }
}

impl BackendEntry {
    /// Backend defaults with this entry's overrides applied.
    pub fn pacing(&self, backend: Backend) -> Pacing {
        let mut pacing = Pacing::for_backend(backend);
        if let Some(ms) = self.request_delay_ms {
            pacing.delay = Duration::from_millis(ms);
        }
        if let Some(budget) = self.daily_budget {
            pacing.daily_budget = Some(budget);
        }
        pacing
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub output_dir: Option<PathBuf>,
    pub terms: TermsConfig,
    pub backends: BTreeMap<Backend, BackendEntry>,
}

impl HarvestConfig {
    /// Entry for `backend`, or the defaults when the file has no table for it.
    pub fn backend(&self, backend: Backend) -> BackendEntry {
        self.backends.get(&backend).cloned().unwrap_or_default()
    }

    /// Backends not switched off in the file, in declaration order.
    pub fn enabled_backends(&self) -> Vec<Backend> {
        Backend::ALL
            .into_iter()
            .filter(|b| self.backend(*b).enabled)
            .collect()
    }
}

/// `<config dir>/litsweep/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("litsweep").join("config.toml"))
}

/// Parses a config file.
///
/// # Errors
///
/// Returns `AppError::Io` if the file cannot be read and
/// `AppError::InvalidConfig` if it is not valid TOML for [`HarvestConfig`].
pub fn load_harvest_config(path: &Path) -> Result<HarvestConfig, AppError> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))
}

/// Loads `path` if given, else the default location if it exists, else defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<HarvestConfig, AppError> {
    match path {
        Some(path) => load_harvest_config(path),
        None => match default_config_path() {
            Some(default) if default.exists() => {
                tracing::debug!(path = %default.display(), "Loading default config");
                load_harvest_config(&default)
            }
            _ => Ok(HarvestConfig::default()),
        },
    }
}
