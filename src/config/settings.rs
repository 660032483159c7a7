//! Editor settings (config.json)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// UI language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

/// UI color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// Persisted editor settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Directory holding the `.md` posts (usually `source/_posts`)
    pub posts_path: String,
    /// Root directory of the image assets (usually `source/img`)
    pub images_path: String,
    pub language: Language,
    pub theme: Theme,
}

impl Settings {
    /// Load settings from a file.
    ///
    /// A missing or unreadable file is not an error: the editor starts with
    /// the default settings and prompts the user to configure paths.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Posts directory, if configured
    pub fn posts_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.posts_path)
    }

    /// Images directory, if configured
    pub fn images_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.images_path)
    }
}

fn non_empty_path(path: &str) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
