//! hexo-editor: a local editor backend and live preview for Hexo blogs
//!
//! The library holds the preview core (front-matter parsing, image path
//! resolution, Markdown rendering and sanitizing) together with the file
//! storage and HTTP API the editor UI talks to.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod server;
pub mod store;

use anyhow::Result;
use std::path::{Path, PathBuf};

use config::Settings;
use content::Post;
use store::{AssetStore, PostStore};

/// The editor workspace: settings plus the stores they point at
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Location of the settings file
    pub settings_path: PathBuf,
    /// Settings as loaded from `settings_path`
    pub settings: Settings,
}

impl Workspace {
    /// Load the workspace from a settings file (defaults if it is missing)
    pub fn new<P: AsRef<Path>>(settings_path: P) -> Self {
        let settings_path = settings_path.as_ref().to_path_buf();
        let settings = Settings::load(&settings_path);
        Self {
            settings_path,
            settings,
        }
    }

    /// Replace and persist the settings
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        settings.save(&self.settings_path)?;
        self.settings = settings;
        Ok(())
    }

    pub fn posts(&self) -> PostStore {
        PostStore::new(self.settings.posts_dir())
    }

    pub fn assets(&self) -> AssetStore {
        AssetStore::new(self.settings.images_dir())
    }

    /// Create a new post from the scaffold, numbered when `title` is `None`
    pub fn new_post(&self, title: Option<&str>, filename: Option<&str>) -> Result<Post> {
        commands::new::create_post(self, title, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_settings_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut workspace = Workspace::new(&path);
        assert!(workspace.posts().root().is_none());

        let settings = Settings {
            posts_path: dir.path().join("posts").display().to_string(),
            ..Default::default()
        };
        workspace.save_settings(settings).unwrap();

        let reloaded = Workspace::new(&path);
        assert_eq!(reloaded.posts().root(), Some(dir.path().join("posts").as_path()));
        assert!(reloaded.assets().root().is_none());
    }
}
