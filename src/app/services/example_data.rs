//! Locator for the example files bundled in the crate's `data/` directory

use glob::glob;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::constants::{DATA_DIR_NAME, ENV_PREFIX};
use crate::{Error, Result};

/// Bundled data directory, or the `SOLAR_IOTOOLS_DATA_DIR` override
pub fn example_data_dir() -> PathBuf {
    std::env::var_os(format!("{}DATA_DIR", ENV_PREFIX))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DATA_DIR_NAME))
}

/// Absolute path of a bundled example file such as `"723170TYA.CSV"`
pub fn get_example_dataset_path(name: &str) -> Result<PathBuf> {
    find_example_dataset(&example_data_dir(), name)
}

/// Resolve `name` inside `dir`; fails with a not-found I/O error when absent
pub fn find_example_dataset(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let plain = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if name.is_empty() || !plain {
        return Err(Error::validation(format!(
            "example dataset name '{}' must be a plain relative path",
            name
        )));
    }

    let path = dir.join(relative);
    if !path.is_file() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, "example dataset not found"),
        ));
    }
    debug!("Example dataset {} at {}", name, path.display());
    Ok(path)
}

/// File names available in `dir`, sorted
pub fn list_example_datasets(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            io::Error::new(io::ErrorKind::NotFound, "data directory not found"),
        ));
    }
    let pattern = dir.join("*");
    let pattern = pattern.to_string_lossy();
    let entries = glob(&pattern)
        .map_err(|e| Error::validation(format!("invalid data directory pattern: {}", e)))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}
