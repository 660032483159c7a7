//! Front-matter parsing
//!
//! Posts start with a block delimited by `---` lines holding one `key: value`
//! pair per line. This is a deliberately small subset of YAML: values wrapped
//! in `[` and `]` become lists, everything else is kept as a trimmed string,
//! and lines without a colon (block lists, comments, blank lines) are skipped.

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Leading `---` line, lazily matched body, closing `---` line and its newline
    static ref FRONT_MATTER_RE: Regex = Regex::new(r"\A---\r?\n((?s:.*?))\r?\n---\r?\n").unwrap();
}

/// A single front-matter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontMatterValue {
    Text(String),
    List(Vec<String>),
}

impl FrontMatterValue {
    /// The value as a plain string, if it is not a list
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontMatterValue::Text(s) => Some(s),
            FrontMatterValue::List(_) => None,
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(inner) if inner.trim().is_empty() => FrontMatterValue::List(Vec::new()),
            Some(inner) => {
                FrontMatterValue::List(inner.split(',').map(|s| s.trim().to_string()).collect())
            }
            None => FrontMatterValue::Text(raw.to_string()),
        }
    }
}

impl From<&str> for FrontMatterValue {
    fn from(s: &str) -> Self {
        FrontMatterValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for FrontMatterValue {
    fn from(v: Vec<String>) -> Self {
        FrontMatterValue::List(v)
    }
}

/// Ordered front-matter map. Always holds `title` and `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, FrontMatterValue>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), FrontMatterValue::Text(String::new()));
        fields.insert(
            "date".to_string(),
            FrontMatterValue::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self { fields }
    }
}

impl FrontMatter {
    /// Split content into the raw front-matter block and the body after it.
    /// Returns `None` when the content has no leading front-matter block.
    pub fn split(content: &str) -> Option<(&str, &str)> {
        let caps = FRONT_MATTER_RE.captures(content)?;
        let block = caps.get(1)?.as_str();
        let end = caps.get(0)?.end();
        Some((block, &content[end..]))
    }

    /// Content with the leading front-matter block removed
    pub fn strip(content: &str) -> &str {
        Self::split(content).map_or(content, |(_, body)| body)
    }

    /// Parse front-matter from content string
    /// Returns (front_matter, body)
    pub fn parse(content: &str) -> (Self, &str) {
        let mut fm = FrontMatter::default();

        let Some((block, body)) = Self::split(content) else {
            return (fm, content);
        };

        for line in block.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fm.fields
                .insert(key.to_string(), FrontMatterValue::parse(value.trim()));
        }

        (fm, body)
    }

    /// Re-emit the block in the same `key: value` / `key: [a, b]` syntax,
    /// delimiters included.
    pub fn serialize(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            match value {
                FrontMatterValue::Text(s) if s.is_empty() => {
                    out.push_str(key);
                    out.push_str(":\n");
                }
                FrontMatterValue::Text(s) => {
                    out.push_str(&format!("{}: {}\n", key, s));
                }
                FrontMatterValue::List(items) => {
                    out.push_str(&format!("{}: [{}]\n", key, items.join(", ")));
                }
            }
        }
        out.push_str("---\n");
        out
    }

    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        self.fields.get(key)
    }

    /// String value of a field; `None` for missing or list-valued fields
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FrontMatterValue::as_str)
    }

    /// List value of a field. A plain string counts as a one-element list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(FrontMatterValue::List(items)) => items.clone(),
            Some(FrontMatterValue::Text(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn set<V: Into<FrontMatterValue>>(&mut self, key: &str, value: V) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn title(&self) -> &str {
        self.get_str("title").unwrap_or_default()
    }

    pub fn date(&self) -> &str {
        self.get_str("date").unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrontMatterValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
