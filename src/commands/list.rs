//! List posts and assets

use anyhow::Result;
use std::collections::BTreeMap;

use crate::content::Post;
use crate::Workspace;

/// List workspace content by type
pub fn run(workspace: &Workspace, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let store = workspace.posts();
            if store.root().is_none() {
                println!("Posts path not configured. Set postsPath in {:?}", workspace.settings_path);
                return Ok(());
            }
            let posts = store.list();
            println!("Posts ({}):", posts.len());
            for file in posts {
                let post = Post::from_content(&file.filename, &file.content);
                println!(
                    "  {} - {} [{}]",
                    post.front_matter.date(),
                    post.title(),
                    post.filename
                );
            }
        }
        "asset" | "assets" => {
            let store = workspace.assets();
            if store.root().is_none() {
                println!("Images path not configured. Set imagesPath in {:?}", workspace.settings_path);
                return Ok(());
            }
            let mut folders: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for asset in store.list() {
                folders.entry(asset.folder).or_default().push(asset.name);
            }
            println!("Asset folders ({}):", folders.len());
            for (folder, names) in folders {
                println!("  {} ({})", folder, names.len());
                for name in names {
                    println!("    {}", name);
                }
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, asset", content_type);
        }
    }

    Ok(())
}
