//! Definition data loading for headless runs.
//!
//! Loads `DefinitionSet` RON files from a directory and layers them over
//! the builtin tables, so balance changes can be tried without rebuilding.

use std::fs;
use std::path::{Path, PathBuf};

use arcade_core::data::{DefinitionSet, Definitions};
use arcade_core::error::GameError;

/// Outcome of loading a definitions directory.
#[derive(Debug, Clone)]
pub struct LoadedDefinitions {
    /// Builtin tables with every valid file layered on, in file name order.
    pub definitions: Definitions,
    /// Files that were applied, with their entry counts.
    pub applied: Vec<(PathBuf, usize)>,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Errors that stop a directory from being loaded at all.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionsLoadError {
    /// Directory not found.
    #[error("Definitions directory not found: {0}")]
    DirectoryNotFound(String),
    /// Failed to list the directory.
    #[error("IO error reading '{0}': {1}")]
    IoError(String, String),
}

/// Parse a single definitions file.
pub fn load_definition_file(path: &Path) -> Result<DefinitionSet, GameError> {
    let content = fs::read_to_string(path).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    ron::from_str(&content).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load every `.ron` file in `dir` over the builtin tables.
///
/// Files are applied in file name order. A file that fails to parse or
/// validate is logged and skipped; the rest still load.
pub fn load_definitions_dir(dir: &Path) -> Result<LoadedDefinitions, DefinitionsLoadError> {
    if !dir.is_dir() {
        return Err(DefinitionsLoadError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| DefinitionsLoadError::IoError(dir.display().to_string(), e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|e| e == "ron"))
        .collect();
    paths.sort();

    let mut definitions = Definitions::builtin();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        let result = load_definition_file(&path).and_then(|set| {
            let count = set.entry_count();
            definitions.clone().merged(set).map(|merged| (merged, count))
        });
        match result {
            Ok((merged, count)) => {
                tracing::debug!(?path, entries = count, "Loaded definitions file");
                definitions = merged;
                applied.push((path, count));
            }
            Err(e) => {
                tracing::warn!("Failed to load definitions from {:?}: {}", path, e);
                skipped.push((path, e.to_string()));
            }
        }
    }

    Ok(LoadedDefinitions {
        definitions,
        applied,
        skipped,
    })
}
