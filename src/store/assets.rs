//! Image asset storage

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use super::{check_name, move_to_trash, StoreError, StoreResult};
use crate::content::resolve_image_path;

/// Folder key for images stored directly in the image root
pub const ROOT_FOLDER: &str = "root";

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// An image file under the image root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Path as written in posts, e.g. `/img/18/1.jpg`
    pub path: String,
    /// File name, e.g. `1.jpg`
    pub name: String,
    /// Directory relative to the image root, `root` for top-level files
    pub folder: String,
    /// Preview URL, e.g. `/api/image/18/1.jpg`
    pub url: String,
}

impl Asset {
    pub fn new(folder: &str, name: &str) -> Self {
        let folder = normalize_folder(folder);
        let path = if folder == ROOT_FOLDER {
            format!("/img/{}", name)
        } else {
            format!("/img/{}/{}", folder, name)
        };
        let url = resolve_image_path(&path);
        Self {
            path,
            name: name.to_string(),
            folder,
            url,
        }
    }
}

/// Image directory tree
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: Option<PathBuf>,
}

impl AssetStore {
    /// `None` means the images path is not configured yet
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// All images below the root, sorted by folder then name.
    /// Hidden directories (the trash among them) are skipped.
    pub fn list(&self) -> Vec<Asset> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        if !root.is_dir() {
            tracing::warn!("Images directory {:?} does not exist", root);
            return Vec::new();
        }

        let mut assets: Vec<Asset> = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
            .filter_map(|e| {
                let relative = e.path().strip_prefix(root).ok()?;
                let name = relative.file_name()?.to_string_lossy().to_string();
                let folder = relative
                    .parent()
                    .map(|p| {
                        p.components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                    .unwrap_or_default();
                Some(Asset::new(&folder, &name))
            })
            .collect();

        assets.sort_by(|a, b| (&a.folder, &a.name).cmp(&(&b.folder, &b.name)));
        tracing::debug!("Found {} assets in {:?}", assets.len(), root);
        assets
    }

    /// Store an uploaded file under `folder`, creating the folder if needed.
    /// Only the base name of `filename` is used.
    pub fn upload(&self, folder: &str, filename: &str, data: &[u8]) -> StoreResult<Asset> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StoreError::InvalidName(filename.to_string()))?;
        check_name(&name)?;

        let dir = self.folder_dir(folder)?;
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&name), data)?;

        let asset = Asset::new(folder, &name);
        tracing::info!("Uploaded {} ({} bytes)", asset.path, data.len());
        Ok(asset)
    }

    pub fn rename(&self, folder: &str, old_name: &str, new_name: &str) -> StoreResult<Asset> {
        check_name(old_name)?;
        check_name(new_name)?;
        let dir = self.folder_dir(folder)?;
        let from = dir.join(old_name);
        let to = dir.join(new_name);

        if !from.is_file() {
            return Err(StoreError::NotFound(old_name.to_string()));
        }
        if to.exists() {
            return Err(StoreError::AlreadyExists(new_name.to_string()));
        }

        fs::rename(&from, &to)?;
        tracing::info!("Renamed asset {} -> {}", old_name, new_name);
        Ok(Asset::new(folder, new_name))
    }

    /// Move an asset to the trash
    pub fn delete(&self, folder: &str, name: &str) -> StoreResult<()> {
        check_name(name)?;
        let file = self.folder_dir(folder)?.join(name);
        move_to_trash(self.configured_root()?, &file)?;
        Ok(())
    }

    /// File system path for an image route path such as `18/1.jpg`.
    /// Any path containing `..` is rejected.
    pub fn image_file(&self, relative: &str) -> StoreResult<PathBuf> {
        let root = self.configured_root()?;
        if relative.contains("..") {
            return Err(StoreError::InvalidName(relative.to_string()));
        }
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidName(relative.display().to_string()));
        }
        let file = root.join(relative);
        if !file.is_file() {
            return Err(StoreError::NotFound(relative.display().to_string()));
        }
        Ok(file)
    }

    fn configured_root(&self) -> StoreResult<&Path> {
        self.root
            .as_deref()
            .ok_or(StoreError::NotConfigured("Images path"))
    }

    fn folder_dir(&self, folder: &str) -> StoreResult<PathBuf> {
        let root = self.configured_root()?;
        let folder = normalize_folder(folder);
        if folder == ROOT_FOLDER {
            return Ok(root.to_path_buf());
        }
        if folder.contains("..") || folder.contains('\\') || folder.starts_with('/') {
            return Err(StoreError::InvalidName(folder));
        }
        Ok(root.join(folder))
    }
}

/// Empty folder names mean the image root
fn normalize_folder(folder: &str) -> String {
    let folder = folder.trim().trim_end_matches('/');
    if folder.is_empty() {
        ROOT_FOLDER.to_string()
    } else {
        folder.to_string()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Check if a file is an image by extension
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
