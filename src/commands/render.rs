//! Render a post preview from the command line

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::content::{MarkdownRenderer, Post};

/// Render a post file to sanitized preview HTML
pub fn render_file(input: &Path) -> Result<String> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let post = Post::from_content(&filename, &content);
    tracing::debug!("Rendering {} ({})", post.filename, post.title());

    Ok(MarkdownRenderer::new().render(&post.content))
}

/// Render `input` and print the HTML, or write it to `output`
pub fn run(input: &Path, output: Option<&Path>) -> Result<()> {
    let html = render_file(input)?;
    match output {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Rendered {} -> {}", input.display(), path.display());
        }
        None => println!("{}", html),
    }
    Ok(())
}
