//! mdxpress: a build-time content pipeline for Markdown/MDX blogs
//!
//! Posts are read from `<content_dir>/<category>`, indexed, tagged, compiled
//! into serialized bundles for a rendering layer, and published as RSS feeds.

pub mod cache;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod helpers;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::content::{DraftFilter, IndexOptions};

/// Name of the configuration file at the site root
pub const CONFIG_FILE: &str = "site.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content root, holding one directory per category
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open a site directory, using defaults when there is no `site.yml`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.build.content_dir);
        let public_dir = base_dir.join(&config.build.public_dir);

        Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        }
    }

    /// Directory holding the posts of the configured category
    pub fn category_dir(&self) -> PathBuf {
        self.content_dir.join(&self.config.build.category)
    }

    pub fn draft_filter(&self) -> DraftFilter {
        DraftFilter::from_drafts_flag(self.config.build.drafts)
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            words_per_minute: self.config.build.words_per_minute,
        }
    }
}
