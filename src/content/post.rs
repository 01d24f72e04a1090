//! Post records

use pulldown_cmark::{Event, Options, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::slug::{derive_slug, kebab_case};
use super::FrontMatter;
use crate::error::ParseError;

/// Compiler mode selected by the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Markdown,
    Mdx,
}

impl SourceMode {
    /// `.md` is Markdown, `.mdx` is MDX, anything else is not content
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") => Some(SourceMode::Markdown),
            Some("mdx") => Some(SourceMode::Mdx),
            _ => None,
        }
    }
}

/// Estimated reading time of a post body
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingTime {
    pub words: usize,
    pub minutes: f64,
}

impl ReadingTime {
    pub fn from_body(body: &str, words_per_minute: u32) -> Self {
        let words = count_words(body);
        let minutes = words as f64 / f64::from(words_per_minute.max(1));
        Self { words, minutes }
    }

    /// e.g. "3 min read"
    pub fn text(&self) -> String {
        format!("{} min read", self.minutes.ceil() as u64)
    }
}

/// Count words in the text of a markdown document, ignoring markup
fn count_words(markdown: &str) -> usize {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    Parser::new_ext(markdown, options)
        .map(|event| match event {
            Event::Text(text) | Event::Code(text) => text.split_whitespace().count(),
            _ => 0,
        })
        .sum()
}

/// One post of the content index. Never mutated after the index is built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(flatten)]
    pub front_matter: FrontMatter,

    /// Path-derived identifier, unique across the index
    pub slug: String,

    /// Source file path relative to the content root, `/` separated
    pub source: String,

    pub mode: SourceMode,

    pub reading_time: ReadingTime,

    /// Raw body after the front-matter block
    #[serde(skip)]
    pub body: String,

    /// 1-based file line where the body starts
    #[serde(skip)]
    pub body_line: usize,

    #[serde(skip)]
    pub full_source: PathBuf,
}

impl PostRecord {
    /// Build a record from file contents.
    ///
    /// `category_relative` is the file path relative to the category directory
    /// and drives the slug; `source` is the path shown to users.
    pub fn from_source(
        content: &str,
        full_source: &Path,
        category_relative: &Path,
        source: String,
        words_per_minute: u32,
    ) -> Result<Self, ParseError> {
        let (front_matter, body) = FrontMatter::parse(content)?;
        let mode = SourceMode::from_path(full_source).unwrap_or(SourceMode::Markdown);

        Ok(Self {
            slug: derive_slug(category_relative),
            source,
            mode,
            reading_time: ReadingTime::from_body(body.text, words_per_minute),
            body: body.text.to_string(),
            body_line: body.line,
            full_source: full_source.to_path_buf(),
            front_matter,
        })
    }

    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    pub fn is_draft(&self) -> bool {
        self.front_matter.draft
    }

    /// Normalized tags, each key at most once, in first-seen order
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.front_matter.tags {
            let key = kebab_case(tag);
            if !key.is_empty() && !tags.contains(&key) {
                tags.push(key);
            }
        }
        tags
    }

    /// Whether any raw tag normalizes to `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.front_matter.tags.iter().any(|t| kebab_case(t) == tag)
    }
}
