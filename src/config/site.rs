//! Site configuration (site.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::compiler::Layout;

/// Immutable configuration built once at startup and shared by every stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteMetadata,
    pub build: BuildConfig,
    pub compiler: CompilerConfig,
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Serialize to YAML, used by `init`
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Site-wide metadata consumed by feeds and page props
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteMetadata {
    pub title: String,
    pub author: String,
    pub description: String,
    /// RSS channel language
    pub language: String,
    /// Locale for human-readable dates
    pub locale: String,
    pub site_url: String,
    pub social_banner: String,
    pub email: Option<String>,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            author: "John Doe".to_string(),
            description: "A blog built with mdxpress".to_string(),
            language: "en-us".to_string(),
            locale: "en-US".to_string(),
            site_url: "https://example.com".to_string(),
            social_banner: "/static/images/twitter-card.png".to_string(),
            email: None,
        }
    }
}

impl SiteMetadata {
    /// `email (author)` as RSS expects it, when an email is configured
    pub fn rss_author(&self) -> Option<String> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|email| format!("{} ({})", email, self.author))
    }
}

/// Content locations and pipeline policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub content_dir: String,
    pub public_dir: String,
    pub category: String,
    /// Include drafts in every consumer (preview builds)
    pub drafts: bool,
    /// Escalate compile errors to build failures
    pub strict: bool,
    pub words_per_minute: u32,
    pub default_layout: Layout,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: "data".to_string(),
            public_dir: "public".to_string(),
            category: "blog".to_string(),
            drafts: false,
            strict: false,
            words_per_minute: 200,
            default_layout: Layout::PostLayout,
        }
    }
}

/// Markdown/MDX compiler options
#[derive(Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub gfm: bool,
    pub math: bool,
    /// Split ```lang:title fences into a title element and the code block
    pub code_titles: bool,
    /// Components registered in addition to the built-in vocabulary
    pub components: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            math: true,
            code_titles: true,
            components: Vec::new(),
        }
    }
}
