//! Create a new post

use anyhow::{bail, Result};
use chrono::Utc;

use crate::content::Post;
use crate::Workspace;

/// Write the post scaffold into the posts directory.
///
/// Without a title the post is numbered: the next free id is used as both
/// title and file name (`8.md`). With a title the file name defaults to
/// its slug.
pub fn create_post(
    workspace: &Workspace,
    title: Option<&str>,
    filename: Option<&str>,
) -> Result<Post> {
    let posts = workspace.posts();
    let title = match title.map(str::trim) {
        Some("") => bail!("Post title must not be empty"),
        Some(title) => title.to_string(),
        None => posts.next_id().to_string(),
    };

    let filename = match filename {
        Some(name) if name.ends_with(".md") => name.to_string(),
        Some(name) => format!("{}.md", name),
        None => default_filename(&title),
    };

    let post = Post::scaffold(&filename, &title, Utc::now());
    let saved = posts.create(&post.filename, &post.content)?;
    tracing::info!("Created post {}", saved.filename);

    Ok(post)
}

fn default_filename(title: &str) -> String {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        "untitled.md".to_string()
    } else {
        format!("{}.md", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::store::StoreError;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        let mut workspace = Workspace::new(dir.path().join("config.json"));
        workspace
            .save_settings(Settings {
                posts_path: dir.path().display().to_string(),
                ..Default::default()
            })
            .unwrap();
        workspace
    }

    #[test]
    fn test_create_post() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);

        let post = create_post(&workspace, Some("Hello World"), None).unwrap();
        assert_eq!(post.filename, "hello-world.md");
        assert_eq!(post.title(), "Hello World");

        let written = fs::read_to_string(dir.path().join("hello-world.md")).unwrap();
        assert!(written.starts_with("---\ntitle: Hello World\ndate: "));
    }

    #[test]
    fn test_create_post_explicit_filename() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);
        let post = create_post(&workspace, Some("Trip"), Some("2024-trip")).unwrap();
        assert_eq!(post.filename, "2024-trip.md");
    }

    #[test]
    fn test_create_post_existing_fails() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);
        create_post(&workspace, Some("Same"), None).unwrap();

        let err = create_post(&workspace, Some("Same"), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_numbered_post() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);
        fs::write(dir.path().join("1.md"), "").unwrap();
        fs::write(dir.path().join("7.md"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let post = create_post(&workspace, None, None).unwrap();
        assert_eq!(post.filename, "8.md");
        assert_eq!(post.title(), "8");
        let written = fs::read_to_string(dir.path().join("8.md")).unwrap();
        assert!(written.starts_with("---\ntitle: 8\ndate: "));
    }

    #[test]
    fn test_empty_title() {
        let dir = TempDir::new().unwrap();
        assert!(create_post(&workspace(&dir), Some("  "), None).is_err());
    }
}
