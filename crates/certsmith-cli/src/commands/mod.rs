pub mod check;
pub mod inspect;
pub mod issue;

use std::path::{Path, PathBuf};

/// Directory that relative paths in a settings file are resolved against.
pub(crate) fn settings_dir(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
