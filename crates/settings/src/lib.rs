pub mod paths;
pub mod preferences;

pub use paths::{resolve_data_dir, DATA_DIR_ENV, DEFAULT_DATA_DIR, PREFERENCES_FILE};
pub use preferences::{
    FinancePreferences, Preferences, PreferencesError, PreferencesStore, StoragePreferences,
    ThemeChoice, UiPreferences, ViewMode,
};
