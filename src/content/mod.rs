//! Content module - front-matter, posts, image paths and preview rendering

mod frontmatter;
pub mod image;
mod markdown;
mod post;

pub use frontmatter::{FrontMatter, FrontMatterValue};
pub use image::resolve_image_path;
pub use markdown::{sanitize, MarkdownRenderer, PreviewStyle};
pub use post::{is_valid_filename, Post};
