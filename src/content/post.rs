//! Post model

use chrono::{DateTime, TimeZone};
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};

use super::frontmatter::{FrontMatter, FrontMatterValue};

/// A blog post being edited.
///
/// `content` is the single source of truth; `front_matter` and `raw_body`
/// are re-derived from it on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// File name inside the posts directory, e.g. `hello-world.md`
    pub filename: String,

    /// Full text including front-matter
    pub content: String,

    pub front_matter: FrontMatter,

    /// Content after the front-matter block
    pub raw_body: String,

    /// Has unsaved changes
    #[serde(default)]
    pub is_dirty: bool,
}

impl Post {
    /// Build a post from its file name and full content
    pub fn from_content(filename: &str, content: &str) -> Self {
        let (front_matter, raw_body) = derive(filename, content);
        Self {
            filename: filename.to_string(),
            content: content.to_string(),
            front_matter,
            raw_body,
            is_dirty: false,
        }
    }

    /// Replace the content and re-derive front-matter and body.
    ///
    /// The derived front-matter fully replaces the previous one.
    pub fn set_content(&mut self, content: &str) {
        if content == self.content {
            return;
        }
        let (front_matter, raw_body) = derive(&self.filename, content);
        self.content = content.to_string();
        self.front_matter = front_matter;
        self.raw_body = raw_body;
        self.is_dirty = true;
    }

    /// Replace the front-matter, keeping the body
    pub fn set_front_matter(&mut self, front_matter: &FrontMatter) {
        let content = format!("{}{}", front_matter.serialize(), self.raw_body);
        self.set_content(&content);
    }

    pub fn mark_saved(&mut self) {
        self.is_dirty = false;
    }

    pub fn title(&self) -> &str {
        self.front_matter.title()
    }

    /// The initial content of a newly created post
    pub fn scaffold<Tz: TimeZone>(filename: &str, title: &str, now: DateTime<Tz>) -> Self {
        let date = now.with_timezone(&Shanghai).format("%Y-%m-%d %H:%M:%S");
        let content = format!(
            "---\ntitle: {title}\ndate: {date}\ncover: /img/{title}/1.jpg\n\n#标签\ntags:\n  - note\n\n#分类\ncategories:\n  - Daily\nabbrlink:\n---\n\n"
        );
        Self::from_content(filename, &content)
    }
}

/// A valid post file name: ends in `.md` and stays inside the posts directory
pub fn is_valid_filename(filename: &str) -> bool {
    filename.len() > 3
        && filename.ends_with(".md")
        && !filename.contains(['/', '\\'])
        && !filename.contains("..")
}

fn derive(filename: &str, content: &str) -> (FrontMatter, String) {
    let (mut front_matter, body) = FrontMatter::parse(content);
    if front_matter.title().is_empty() {
        let stem = filename
            .strip_suffix(".md")
            .or_else(|| filename.strip_suffix(".MD"))
            .unwrap_or(filename);
        front_matter.set("title", FrontMatterValue::Text(stem.to_string()));
    }
    (front_matter, body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_from_content() {
        let content = "---\ntitle: Hi\ndate: 2024-01-01\n---\n# Hello\n![a](../img/5/1.jpg)\n";
        let post = Post::from_content("hi.md", content);
        assert_eq!(post.title(), "Hi");
        assert_eq!(post.front_matter.date(), "2024-01-01");
        assert_eq!(post.raw_body, "# Hello\n![a](../img/5/1.jpg)\n");
        assert!(!post.is_dirty);
    }

    #[test]
    fn test_title_defaults_to_filename() {
        let post = Post::from_content("hello-world.md", "---\ndate: 2024-01-01\n---\nbody");
        assert_eq!(post.title(), "hello-world");

        let post = Post::from_content("plain.md", "no front matter");
        assert_eq!(post.title(), "plain");
        assert_eq!(post.raw_body, "no front matter");
    }

    #[test]
    fn test_set_content_replaces_front_matter() {
        let mut post = Post::from_content("a.md", "---\ntitle: A\ncover: x.jpg\n---\nbody");
        post.set_content("---\ntitle: B\n---\nnew body");
        assert!(post.is_dirty);
        assert_eq!(post.title(), "B");
        assert!(post.front_matter.get("cover").is_none());
        assert_eq!(post.raw_body, "new body");

        post.mark_saved();
        post.set_content("---\ntitle: B\n---\nnew body");
        assert!(!post.is_dirty);
    }

    #[test]
    fn test_set_front_matter() {
        let mut post = Post::from_content("a.md", "---\ntitle: A\n---\nbody");
        let mut fm = post.front_matter.clone();
        fm.set("tags", vec!["rust".to_string(), "hexo".to_string()]);
        post.set_front_matter(&fm);
        assert!(post.content.contains("tags: [rust, hexo]\n"));
        assert!(post.content.ends_with("---\nbody"));
        assert_eq!(post.front_matter.get_list("tags"), vec!["rust", "hexo"]);
    }

    #[test]
    fn test_scaffold_uses_utc8() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 20, 30, 0).unwrap();
        let post = Post::scaffold("trip.md", "trip", now);
        assert!(post.content.starts_with("---\ntitle: trip\ndate: 2024-01-02 04:30:00\n"));
        assert!(post.content.contains("cover: /img/trip/1.jpg\n"));
        assert!(post.content.contains("  - Daily\n"));
        assert_eq!(post.title(), "trip");
        assert_eq!(post.raw_body, "\n");
    }

    #[test]
    fn test_valid_filename() {
        assert!(is_valid_filename("hello.md"));
        assert!(!is_valid_filename(".md"));
        assert!(!is_valid_filename("hello.txt"));
        assert!(!is_valid_filename("../hello.md"));
        assert!(!is_valid_filename("a/hello.md"));
    }
}
