use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const PREFERENCES_VERSION: u32 = 1;
const MAX_DEBOUNCE_MS: u64 = 10_000;

static CURRENCY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"));

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize preferences {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub storage: StoragePreferences,
    #[serde(default)]
    pub ui: UiPreferences,
    #[serde(default)]
    pub finance: FinancePreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            storage: StoragePreferences::default(),
            ui: UiPreferences::default(),
            finance: FinancePreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.storage.sanitize();
        self.ui.sanitize();
        self.finance.sanitize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePreferences {
    /// Quiet period before a changed store is written back.
    #[serde(default = "default_debounce_ms")]
    pub autosave_debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for StoragePreferences {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: default_debounce_ms(),
        }
    }
}

impl StoragePreferences {
    fn sanitize(&mut self) {
        self.autosave_debounce_ms = self.autosave_debounce_ms.min(MAX_DEBOUNCE_MS);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub theme: ThemeChoice,
    #[serde(default = "default_notification_timeout")]
    pub notification_timeout_secs: u64,
}

fn default_notification_timeout() -> u64 {
    5
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: ThemeChoice::default(),
            notification_timeout_secs: default_notification_timeout(),
        }
    }
}

impl UiPreferences {
    fn sanitize(&mut self) {
        if self.notification_timeout_secs == 0 {
            self.notification_timeout_secs = default_notification_timeout();
        }
        self.notification_timeout_secs = self.notification_timeout_secs.clamp(1, 60);
    }
}

/// Period shown by the finance views. This is the only definition of the view mode;
/// every finance surface uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Month,
    Year,
    All,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::Month, ViewMode::Year, ViewMode::All];

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Month => "Month",
            ViewMode::Year => "Year",
            ViewMode::All => "All time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancePreferences {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub default_view: ViewMode,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for FinancePreferences {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_view: ViewMode::default(),
        }
    }
}

impl FinancePreferences {
    /// Whether `code` looks like an ISO-4217 currency code.
    pub fn is_valid_currency(code: &str) -> bool {
        CURRENCY_CODE.is_match(code)
    }

    fn sanitize(&mut self) {
        let upper = self.currency.trim().to_ascii_uppercase();
        if Self::is_valid_currency(&upper) {
            self.currency = upper;
        } else {
            warn!(currency = %self.currency, "unknown currency code, falling back to default");
            self.currency = default_currency();
        }
    }
}

#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    data: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            data: preferences,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = Preferences::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PreferencesError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: Preferences =
            serde_json::from_str(&contents).map_err(|source| PreferencesError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        debug!(path = %path.display(), "loaded preferences");
        Ok(Self { path, data })
    }

    /// Like [`PreferencesStore::load`], but a broken file falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|err| {
            warn!(error = %err, "using default preferences");
            let mut data = Preferences::default();
            data.sanitize();
            Self::new(path, data)
        })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data
    }

    pub fn update<F>(&mut self, mut op: F) -> Result<(), PreferencesError>
    where
        F: FnMut(&mut Preferences),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.data = preferences;
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| PreferencesError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| PreferencesError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PreferencesError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PreferencesError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            PreferencesError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, payload.as_bytes())
            .map_err(|source| PreferencesError::Write { path, source })
    }
}
