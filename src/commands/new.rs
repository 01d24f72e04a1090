//! Create a new post

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::PathBuf;

use crate::content::{FrontMatter, PostDate};
use crate::Site;

/// How to scaffold a post
#[derive(Debug, Clone, Copy, Default)]
pub struct NewPostOptions {
    pub draft: bool,
    /// Plain Markdown (`.md`) instead of MDX
    pub markdown: bool,
}

/// Create `<content>/<category>/<slug>.mdx` dated today
pub fn create_post(site: &Site, title: &str, options: NewPostOptions) -> Result<PathBuf> {
    let today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or_else(Utc::now);
    create_post_at(site, title, options, today)
}

/// Create a post with an explicit publish date
pub fn create_post_at(
    site: &Site,
    title: &str,
    options: NewPostOptions,
    date: DateTime<Utc>,
) -> Result<PathBuf> {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}", title);
    }

    let extension = if options.markdown { "md" } else { "mdx" };
    let target_dir = site.category_dir();
    let file_path = target_dir.join(format!("{}.{}", slug, extension));

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let mut front_matter = FrontMatter::new(title, PostDate::from(date));
    front_matter.draft = options.draft;
    let content = format!("{}\n", front_matter.to_block()?);

    fs::create_dir_all(&target_dir)?;
    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
