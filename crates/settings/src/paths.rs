use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MINIDESK_DATA_DIR";
/// Directory used when neither a flag nor the environment names one.
pub const DEFAULT_DATA_DIR: &str = ".minidesk";
/// File name of the preferences document inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Picks the data directory: explicit flag, then `MINIDESK_DATA_DIR`, then `.minidesk`
/// relative to `base`.
/// 依序採用參數、環境變數與預設值決定資料目錄。
pub fn resolve_data_dir(explicit: Option<&Path>, base: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(DATA_DIR_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => base.join(DEFAULT_DATA_DIR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let dir = resolve_data_dir(Some(Path::new("/tmp/explicit")), Path::new("/home/me"));
        assert_eq!(dir, PathBuf::from("/tmp/explicit"));
    }
}
