//! RSS 2.0 feed generation
//!
//! Feeds are rendered from an already filtered and sorted slice of posts. The
//! generator never re-sorts and never reads the wall clock, so rerunning a
//! build produces the same bytes.

use rss::validation::Validate;
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::SiteMetadata;
use crate::content::PostRecord;
use crate::error::{FeedError, FeedWriteError};
use crate::helpers::{encode_path_segment, full_url, rfc822};

/// Value of the channel `<generator>` element
const GENERATOR: &str = "mdxpress";

/// Which feed of the site is being generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    /// Every post of the category, `feed.xml`
    Category,
    /// Posts carrying a normalized tag, `tags/<encoded tag>/feed.xml`
    Tag(String),
}

impl FeedTarget {
    /// Output path relative to the public directory.
    ///
    /// A tag is encoded into a single directory name, so tags such as `..` or
    /// `a/b` stay under `tags/`.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            FeedTarget::Category => PathBuf::from("feed.xml"),
            FeedTarget::Tag(tag) => Path::new("tags")
                .join(encode_path_segment(tag))
                .join("feed.xml"),
        }
    }
}

/// A rendered feed and where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    /// Relative to the public directory
    pub path: PathBuf,
    pub xml: String,
}

/// Renders RSS channels from site metadata
#[derive(Debug, Clone)]
pub struct FeedGenerator<'a> {
    site: &'a SiteMetadata,
    category: &'a str,
}

impl<'a> FeedGenerator<'a> {
    pub fn new(site: &'a SiteMetadata, category: &'a str) -> Self {
        Self { site, category }
    }

    /// Absolute URL of a post
    pub fn post_url(&self, post: &PostRecord) -> String {
        full_url(
            &self.site.site_url,
            &format!("{}/{}", self.category, post.slug),
        )
    }

    /// Render one feed. Item order is the order of `posts`.
    pub fn generate(
        &self,
        posts: &[&PostRecord],
        target: FeedTarget,
    ) -> Result<FeedDocument, FeedError> {
        let (title, description, link) = match &target {
            FeedTarget::Category => (
                self.site.title.clone(),
                self.site.description.clone(),
                full_url(&self.site.site_url, self.category),
            ),
            FeedTarget::Tag(tag) => (
                format!("{} - {}", tag, self.site.title),
                format!("{} tags - {}", tag, self.site.author),
                format!(
                    "{}/{}",
                    full_url(&self.site.site_url, "tags"),
                    encode_path_segment(tag)
                ),
            ),
        };

        let items: Vec<Item> = posts.iter().map(|post| self.item(post)).collect();
        let last_build_date = posts
            .first()
            .map(|post| rfc822(post.front_matter.date.as_datetime()));

        let channel = ChannelBuilder::default()
            .title(title)
            .link(link)
            .description(description)
            .language(Some(self.site.language.clone()))
            .managing_editor(self.site.rss_author())
            .webmaster(self.site.rss_author())
            .last_build_date(last_build_date)
            .generator(Some(GENERATOR.to_string()))
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| FeedError::Validation(e.to_string()))?;

        let path = target.relative_path();
        tracing::debug!("Rendered {:?} with {} items", path, posts.len());
        Ok(FeedDocument {
            path,
            xml: channel.to_string(),
        })
    }

    fn item(&self, post: &PostRecord) -> Item {
        let link = self.post_url(post);
        let categories = post
            .front_matter
            .tags
            .iter()
            .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
            .collect::<Vec<_>>();

        ItemBuilder::default()
            .title(Some(post.title().to_string()))
            .link(Some(link.clone()))
            .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
            .description(post.front_matter.summary.clone())
            .pub_date(Some(rfc822(post.front_matter.date.as_datetime())))
            .author(self.site.rss_author())
            .categories(categories)
            .build()
    }
}

/// Write a feed under the public directory.
///
/// The XML goes to a temporary file next to the target which is then renamed
/// over it, so a failed write never leaves a partial feed behind.
pub fn write_feed(public_dir: &Path, feed: &FeedDocument) -> Result<PathBuf, FeedWriteError> {
    let path = public_dir.join(&feed.path);
    let wrap = |source: std::io::Error| FeedWriteError {
        path: path.clone(),
        source,
    };

    let dir = path.parent().unwrap_or(public_dir);
    fs::create_dir_all(dir).map_err(wrap)?;

    let mut file = NamedTempFile::new_in(dir).map_err(wrap)?;
    file.write_all(feed.xml.as_bytes()).map_err(wrap)?;
    file.flush().map_err(wrap)?;
    file.persist(&path).map_err(|e| wrap(e.error))?;

    tracing::info!("Wrote {:?}", path);
    Ok(path)
}
