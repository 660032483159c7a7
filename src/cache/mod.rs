//! Preview cache
//!
//! Memoizes rendered previews per post. An entry is only returned when the
//! hash of the requested content matches the hash it was rendered from, so a
//! newer edit of the same post always re-renders.

use std::collections::HashMap;

use crate::content::MarkdownRenderer;

/// Default number of posts kept in the cache
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: u64,
    html: String,
    /// Access tick, used for eviction
    last_used: u64,
}

/// Rendered HTML keyed by post filename
#[derive(Debug)]
pub struct PreviewCache {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Rendered HTML for `content`, rendering only when the post changed
    pub fn render(&mut self, renderer: &MarkdownRenderer, filename: &str, content: &str) -> String {
        self.tick += 1;
        let content_hash = hash_content(content);

        if let Some(entry) = self.entries.get_mut(filename) {
            if entry.content_hash == content_hash {
                entry.last_used = self.tick;
                self.hits += 1;
                return entry.html.clone();
            }
        }

        self.misses += 1;
        let html = renderer.render(content);

        if !self.entries.contains_key(filename) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            filename.to_string(),
            CacheEntry {
                content_hash,
                html: html.clone(),
                last_used: self.tick,
            },
        );
        html
    }

    /// Drop the entry of a post (deleted or renamed)
    pub fn invalidate(&mut self, filename: &str) {
        self.entries.remove(filename);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(name, _)| name.clone());
        if let Some(name) = oldest {
            tracing::debug!("Evicting preview cache entry: {}", name);
            self.entries.remove(&name);
        }
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}
