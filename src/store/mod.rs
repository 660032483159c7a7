//! File-backed storage for posts and image assets

mod assets;
mod posts;

pub use assets::{Asset, AssetStore, ROOT_FOLDER};
pub use posts::{PostFile, PostStore};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the trash directory kept at the root of each store
pub const TRASH_DIR: &str = ".trash";

/// Errors from post and asset storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Move a file into the `.trash` directory under `root`.
///
/// The trashed name is prefixed with a timestamp so deleting the same name
/// twice keeps both copies. Returns the new location.
pub fn move_to_trash(root: &Path, file: &Path) -> StoreResult<PathBuf> {
    if !file.is_file() {
        return Err(StoreError::NotFound(file.display().to_string()));
    }

    let trash_dir = root.join(TRASH_DIR);
    fs::create_dir_all(&trash_dir)?;

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");

    let mut target = trash_dir.join(format!("{}-{}", stamp, name));
    let mut n = 1;
    while target.exists() {
        target = trash_dir.join(format!("{}-{}-{}", stamp, n, name));
        n += 1;
    }

    fs::rename(file, &target)?;
    tracing::info!("Moved {:?} to trash", file);
    Ok(target)
}

/// Reject names that could leave the store directory
fn check_name(name: &str) -> StoreResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
