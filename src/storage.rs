use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// How to react when a stored document exists but cannot be read or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Report the problem to the caller.
    Strict,
    /// Log a warning and start from an empty document. Whatever was on disk
    /// is overwritten on the next save.
    #[default]
    Lenient,
}

/// Load a whole JSON document. A missing file is never an error.
pub fn load_document<T>(path: &Path, mode: LoadMode) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            return match mode {
                LoadMode::Strict => Err(e.into()),
                LoadMode::Lenient => {
                    log::warn!("could not read {}: {e}; starting fresh", path.display());
                    Ok(T::default())
                }
            };
        }
    };

    match serde_json::from_str(&content) {
        Ok(doc) => Ok(doc),
        Err(source) => match mode {
            LoadMode::Strict => Err(TallyError::CorruptDocument {
                path: path.to_path_buf(),
                source,
            }),
            LoadMode::Lenient => {
                log::warn!("ignoring corrupt {}: {source}", path.display());
                Ok(T::default())
            }
        },
    }
}

pub fn save_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
