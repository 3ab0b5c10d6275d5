use std::path::PathBuf;

const APP_DIR: &str = "medquery";

pub fn medquery_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR),
        None => std::env::temp_dir().join(APP_DIR),
    }
}

/// Per-user dose-form vocabulary override location.
pub fn user_dose_forms_path() -> PathBuf {
    medquery_config_dir().join("dose_form_groups.txt")
}
