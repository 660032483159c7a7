//! Post storage

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{move_to_trash, StoreError, StoreResult};
use crate::content::is_valid_filename;

/// A post file as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFile {
    pub filename: String,
    pub content: String,
}

/// Posts directory (flat, `*.md` only)
#[derive(Debug, Clone)]
pub struct PostStore {
    root: Option<PathBuf>,
}

impl PostStore {
    /// `None` means the posts path is not configured yet
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// All posts, sorted by file name.
    ///
    /// An unconfigured or unreadable directory yields an empty list, and
    /// unreadable files are skipped.
    pub fn list(&self) -> Vec<PostFile> {
        let Some(root) = &self.root else {
            return Vec::new();
        };

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read posts directory {:?}: {}", root, e);
                return Vec::new();
            }
        };

        let mut posts: Vec<PostFile> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| {
                let filename = e.file_name().to_string_lossy().to_string();
                if !filename.ends_with(".md") {
                    return None;
                }
                match fs::read_to_string(e.path()) {
                    Ok(content) => Some(PostFile { filename, content }),
                    Err(err) => {
                        tracing::warn!("Skipping unreadable post {}: {}", filename, err);
                        None
                    }
                }
            })
            .collect();

        posts.sort_by(|a, b| a.filename.cmp(&b.filename));
        tracing::debug!("Loaded {} posts from {:?}", posts.len(), root);
        posts
    }

    pub fn read(&self, filename: &str) -> StoreResult<PostFile> {
        let path = self.path_of(filename)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(filename.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(PostFile {
            filename: filename.to_string(),
            content,
        })
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_of(filename).map(|p| p.exists()).unwrap_or(false)
    }

    /// Write the full content verbatim, replacing any existing file
    pub fn save(&self, filename: &str, content: &str) -> StoreResult<PostFile> {
        let path = self.path_of(filename)?;
        fs::write(&path, content)?;
        tracing::info!("Saved post {}", filename);
        Ok(PostFile {
            filename: filename.to_string(),
            content: content.to_string(),
        })
    }

    /// Write a new post, failing if the file name is taken
    pub fn create(&self, filename: &str, content: &str) -> StoreResult<PostFile> {
        if self.exists(filename) {
            return Err(StoreError::AlreadyExists(filename.to_string()));
        }
        self.save(filename, content)
    }

    /// Id for a new post: one past the highest numeric file stem
    /// (`7.md` -> 8), or one past the post count when no stem is numeric
    pub fn next_id(&self) -> u64 {
        let posts = self.list();
        let highest = posts
            .iter()
            .filter_map(|p| p.filename.strip_suffix(".md"))
            .filter(|stem| !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|stem| stem.parse::<u64>().ok())
            .max();

        match highest {
            Some(id) => id + 1,
            None => posts.len() as u64 + 1,
        }
    }

    /// Move a post to the trash
    pub fn delete(&self, filename: &str) -> StoreResult<()> {
        let path = self.path_of(filename)?;
        move_to_trash(self.configured_root()?, &path)?;
        Ok(())
    }

    fn configured_root(&self) -> StoreResult<&Path> {
        self.root
            .as_deref()
            .ok_or(StoreError::NotConfigured("Posts path"))
    }

    fn path_of(&self, filename: &str) -> StoreResult<PathBuf> {
        let root = self.configured_root()?;
        if !is_valid_filename(filename) {
            return Err(StoreError::InvalidName(filename.to_string()));
        }
        Ok(root.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> PostStore {
        PostStore::new(Some(dir.path().to_path_buf()))
    }

    #[test]
    fn test_list_only_markdown_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.md"), "B").unwrap();
        fs::write(dir.path().join("a.md"), "A").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub.md")).unwrap();

        let posts = store(&dir).list();
        let names: Vec<&str> = posts.iter().map(|p| p.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert_eq!(posts[0].content, "A");
    }

    #[test]
    fn test_unconfigured() {
        let store = PostStore::new(None);
        assert!(store.list().is_empty());
        assert!(matches!(
            store.save("a.md", "x"),
            Err(StoreError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let dir = TempDir::new().unwrap();
        let store = PostStore::new(Some(dir.path().join("missing")));
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_save_read_create() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("a.md", "---\ntitle: A\n---\n").unwrap();
        assert_eq!(store.read("a.md").unwrap().content, "---\ntitle: A\n---\n");

        assert!(matches!(
            store.create("a.md", "again"),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.save("../escape.md", "x"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(store.read("none.md"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_next_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.next_id(), 1);

        store.save("notes.md", "n").unwrap();
        store.save("about.md", "a").unwrap();
        assert_eq!(store.next_id(), 3);

        store.save("1.md", "1").unwrap();
        store.save("7.md", "7").unwrap();
        fs::write(dir.path().join("99.txt"), "x").unwrap();
        assert_eq!(store.next_id(), 8);
    }

    #[test]
    fn test_delete_moves_to_trash() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save("a.md", "A").unwrap();
        store.delete("a.md").unwrap();

        assert!(!store.exists("a.md"));
        assert!(store.list().is_empty());
        let trashed = fs::read_dir(dir.path().join(crate::store::TRASH_DIR))
            .unwrap()
            .count();
        assert_eq!(trashed, 1);
    }
}
