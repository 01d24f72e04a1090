//! Build the site artifacts: feeds and compiled bundles

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use super::clean;
use crate::cache::BundleCache;
use crate::compiler::{CompiledBundle, MdxCompiler};
use crate::config::BuildConfig;
use crate::content::{ContentIndex, DraftFilter, PostRecord, TagIndex};
use crate::error::{BuildError, CompileError, FeedError, FileError};
use crate::feed::{write_feed, FeedGenerator, FeedTarget};
use crate::Site;

/// Directory under the public dir holding one page-props file per post
pub const BUNDLE_DIR: &str = "_bundles";

/// Build policy, from `site.yml` and command-line flags
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Abort on the first compile error instead of skipping the post
    pub strict: bool,
    /// Include drafts in every listing, feed and bundle
    pub drafts: bool,
}

impl BuildOptions {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            strict: config.strict,
            drafts: config.drafts,
        }
    }
}

/// A file that was left out of the build
#[derive(Debug)]
pub struct BuildFailure {
    pub path: PathBuf,
    pub error: FileError,
}

/// What a build produced
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Posts taking part in the build
    pub posts: usize,
    /// Drafts left out by the draft filter
    pub drafts: usize,
    pub tags: usize,
    /// Feed files written, relative to the public dir
    pub feeds: Vec<PathBuf>,
    pub bundles: usize,
    pub cache_hits: usize,
    /// Per-file failures, sorted by path
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    /// A build with any failure is not successful, whatever it wrote
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A neighbouring post, for prev/next links
#[derive(Debug, Serialize)]
pub struct PostLink<'a> {
    pub slug: &'a str,
    pub title: &'a str,
}

impl<'a> From<&'a PostRecord> for PostLink<'a> {
    fn from(post: &'a PostRecord) -> Self {
        Self {
            slug: &post.slug,
            title: post.title(),
        }
    }
}

/// Everything a post page needs, written to `_bundles/<slug>.json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProps<'a> {
    pub post: &'a PostRecord,
    pub bundle: &'a CompiledBundle,
    /// Older post
    pub prev: Option<PostLink<'a>>,
    /// Newer post
    pub next: Option<PostLink<'a>>,
}

/// Run the pipeline: scan, parse, filter, sort, then aggregate, compile and
/// write feeds and bundles
pub async fn run(site: &Site, options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let start = Instant::now();
    let build = &site.config.build;
    let filter = DraftFilter::from_drafts_flag(options.drafts);

    let mut index =
        ContentIndex::build(&site.content_dir, &build.category, &site.index_options()).await?;
    let mut failures: Vec<BuildFailure> = index
        .take_failures()
        .into_iter()
        .map(|f| BuildFailure {
            path: f.path,
            error: f.error.into(),
        })
        .collect();

    let posts = index.select(filter);
    let drafts = index.len() - posts.len();
    tracing::info!("Loaded {} posts ({} drafts skipped)", posts.len(), drafts);

    let tags = TagIndex::aggregate(index.posts(), filter);
    tracing::debug!("Aggregated {} tags", tags.len());

    let cache = Arc::new(BundleCache::new());
    let (bundles, compile_failures) = compile_posts(site, &posts, cache.clone()).await?;

    if options.strict {
        if let Some((path, source)) = compile_failures.into_iter().next() {
            tracing::error!("{:?}: {}", path, source);
            return Err(BuildError::Strict { path, source });
        }
    } else {
        for (path, error) in compile_failures {
            tracing::warn!("Skipping bundle for {:?}: {}", path, error);
            failures.push(BuildFailure {
                path,
                error: error.into(),
            });
        }
    }

    // Artifacts of the previous build are replaced as a whole
    let stale = clean::remove_artifacts(&site.public_dir)?;
    tracing::debug!("Removed {} stale artifacts", stale.len());

    let feeds = write_feeds(site, &index, &posts, &tags, filter)?;
    let written = write_bundles(&site.public_dir, &index, &bundles, filter).await?;

    failures.sort_by(|a, b| a.path.cmp(&b.path));
    let report = BuildReport {
        posts: posts.len(),
        drafts,
        tags: tags.len(),
        feeds,
        bundles: written,
        cache_hits: cache.hits(),
        failures,
    };

    tracing::info!(
        "Built {} bundles and {} feeds in {:.2}s ({} cache hits, {} failures)",
        report.bundles,
        report.feeds.len(),
        start.elapsed().as_secs_f64(),
        report.cache_hits,
        report.failures.len()
    );
    Ok(report)
}

/// Compile every post on the blocking pool.
///
/// Bundles come back keyed by slug, failures sorted by path.
async fn compile_posts(
    site: &Site,
    posts: &[&PostRecord],
    cache: Arc<BundleCache>,
) -> Result<(BTreeMap<String, CompiledBundle>, Vec<(PathBuf, CompileError)>), BuildError> {
    let compiler = Arc::new(MdxCompiler::from_config(&site.config));

    let mut tasks = JoinSet::new();
    for post in posts {
        let post = (*post).clone();
        let compiler = Arc::clone(&compiler);
        let cache = Arc::clone(&cache);
        tasks.spawn_blocking(move || {
            let result = cache.get_or_compile(&compiler, &post);
            (post.slug, post.full_source, result)
        });
    }

    let mut bundles = BTreeMap::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (slug, path, result) = joined?;
        match result {
            Ok(bundle) => {
                bundles.insert(slug, bundle);
            }
            Err(error) => failures.push((path, error)),
        }
    }
    failures.sort_by(|a, b| a.0.cmp(&b.0));

    Ok((bundles, failures))
}

/// The category feed when there are posts, and one feed per tag
fn write_feeds(
    site: &Site,
    index: &ContentIndex,
    posts: &[&PostRecord],
    tags: &TagIndex,
    filter: DraftFilter,
) -> Result<Vec<PathBuf>, BuildError> {
    let generator = FeedGenerator::new(&site.config.site, &site.config.build.category);
    let mut feeds = Vec::new();

    if !posts.is_empty() {
        let feed = generator.generate(posts, FeedTarget::Category)?;
        write_feed(&site.public_dir, &feed).map_err(FeedError::from)?;
        feeds.push(feed.path);
    }

    for (tag, _) in tags.iter() {
        let tagged = index.tagged(tag, filter);
        if tagged.is_empty() {
            continue;
        }
        let feed = generator.generate(&tagged, FeedTarget::Tag(tag.to_string()))?;
        write_feed(&site.public_dir, &feed).map_err(FeedError::from)?;
        feeds.push(feed.path);
    }

    Ok(feeds)
}

/// Write page props for every compiled post, returns how many were written
async fn write_bundles(
    public_dir: &Path,
    index: &ContentIndex,
    bundles: &BTreeMap<String, CompiledBundle>,
    filter: DraftFilter,
) -> Result<usize, BuildError> {
    let dir = public_dir.join(BUNDLE_DIR);
    let mut written = 0;

    for (slug, bundle) in bundles {
        let Some(post) = index.find(slug) else {
            continue;
        };
        let (newer, older) = index.adjacent(slug, filter);
        let props = PageProps {
            post,
            bundle,
            prev: older.map(PostLink::from),
            next: newer.map(PostLink::from),
        };

        let path = dir.join(format!("{}.json", slug));
        let io_error = |source: std::io::Error| BuildError::Io {
            path: path.clone(),
            source,
        };
        let json = serde_json::to_string(&props)
            .map_err(|e| io_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, json).await.map_err(io_error)?;
        tracing::debug!("Wrote {:?}", path);
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(dir: &TempDir) -> Site {
        Site::with_config(dir.path().to_path_buf(), SiteConfig::default())
    }

    fn sample(dir: &TempDir) {
        write(
            dir.path(),
            "data/blog/hello.mdx",
            "---\ntitle: Hello\ndate: 2023-01-01\ntags: [\"Dev Log\"]\n---\n\n# Hi\n\n<Image src=\"/a.png\" />\n",
        );
        write(
            dir.path(),
            "data/blog/later.md",
            "---\ntitle: Later\ndate: 2023-02-01\ntags: [rust]\n---\n\nText\n",
        );
        write(
            dir.path(),
            "data/blog/wip.mdx",
            "---\ntitle: Wip\ndate: 2023-03-01\ntags: [\"Dev Log\"]\ndraft: true\n---\n\nSoon\n",
        );
    }

    #[tokio::test]
    async fn test_build_writes_feeds_and_bundles() {
        let dir = TempDir::new().unwrap();
        sample(&dir);
        let site = site(&dir);

        let report = run(&site, &BuildOptions::default()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.posts, 2);
        assert_eq!(report.drafts, 1);
        assert_eq!(report.tags, 2);
        assert_eq!(report.bundles, 2);
        assert_eq!(
            report.feeds,
            vec![
                PathBuf::from("feed.xml"),
                PathBuf::from("tags/rust/feed.xml"),
                PathBuf::from("tags/dev-log/feed.xml"),
            ]
        );

        let tag_feed =
            fs::read_to_string(site.public_dir.join("tags/dev-log/feed.xml")).unwrap();
        let channel = rss::Channel::read_from(tag_feed.as_bytes()).unwrap();
        assert_eq!(channel.items().len(), 1);
        assert_eq!(channel.items()[0].title(), Some("Hello"));
        assert!(tag_feed.contains("<title>Hello</title>"));

        let props: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(site.public_dir.join("_bundles/hello.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(props["post"]["slug"], "hello");
        assert_eq!(props["bundle"]["layout"], "PostLayout");
        assert_eq!(props["bundle"]["components"][0], "Image");
        assert_eq!(props["next"]["slug"], "later");
        assert!(props["prev"].is_null());
        assert!(!site.public_dir.join("_bundles/wip.json").exists());
    }

    #[tokio::test]
    async fn test_drafts_option_includes_drafts_everywhere() {
        let dir = TempDir::new().unwrap();
        sample(&dir);
        let site = site(&dir);

        let options = BuildOptions {
            drafts: true,
            ..BuildOptions::default()
        };
        let report = run(&site, &options).await.unwrap();
        assert_eq!(report.posts, 3);
        assert_eq!(report.drafts, 0);
        assert_eq!(report.bundles, 3);

        let tag_feed =
            fs::read_to_string(site.public_dir.join("tags/dev-log/feed.xml")).unwrap();
        let channel = rss::Channel::read_from(tag_feed.as_bytes()).unwrap();
        assert_eq!(channel.items().len(), 2);
    }

    #[tokio::test]
    async fn test_file_failures_are_collected() {
        let dir = TempDir::new().unwrap();
        sample(&dir);
        write(dir.path(), "data/blog/broken.md", "---\ntitle: [oops\n---\n");
        write(
            dir.path(),
            "data/blog/chart.mdx",
            "---\ntitle: Chart\ndate: 2022-01-01\n---\n\n<Chart />\n",
        );
        let site = site(&dir);

        let report = run(&site, &BuildOptions::default()).await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.posts, 3);
        assert_eq!(report.bundles, 2);

        let paths: Vec<_> = report
            .failures
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(paths, vec!["broken.md", "chart.mdx"]);
        assert!(matches!(report.failures[0].error, FileError::Content(_)));
        assert!(matches!(
            &report.failures[1].error,
            FileError::Compile(CompileError::UnknownComponent { name, location })
                if name == "Chart" && location.line == 6
        ));

        // The post still appears in the feed
        let feed = fs::read_to_string(site.public_dir.join("feed.xml")).unwrap();
        assert!(feed.contains("<title>Chart</title>"));
    }

    #[tokio::test]
    async fn test_strict_mode_aborts() {
        let dir = TempDir::new().unwrap();
        sample(&dir);
        write(
            dir.path(),
            "data/blog/chart.mdx",
            "---\ntitle: Chart\ndate: 2022-01-01\n---\n\n<Chart />\n",
        );
        let site = site(&dir);

        let options = BuildOptions {
            strict: true,
            ..BuildOptions::default()
        };
        let err = run(&site, &options).await.unwrap_err();
        assert!(matches!(err, BuildError::Strict { ref path, .. } if path.ends_with("chart.mdx")));
        assert!(!site.public_dir.join("feed.xml").exists());
    }

    #[tokio::test]
    async fn test_duplicate_slugs_abort() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "data/blog/hello.md",
            "---\ntitle: A\ndate: 2023-01-01\n---\n",
        );
        write(
            dir.path(),
            "data/blog/hello.mdx",
            "---\ntitle: B\ndate: 2023-01-02\n---\n",
        );
        let site = site(&dir);

        let err = run(&site, &BuildOptions::default()).await.unwrap_err();
        assert!(matches!(err, BuildError::Index(_)));
        assert!(!site.public_dir.exists());
    }

    #[tokio::test]
    async fn test_empty_site() {
        let dir = TempDir::new().unwrap();
        let report = run(&site(&dir), &BuildOptions::default()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.posts, 0);
        assert!(report.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_tag_feeds_stay_inside_tags_dir() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "data/blog/a.md",
            "---\ntitle: A\ndate: 2023-01-01\n---\n\nA\n",
        );
        write(
            dir.path(),
            "data/blog/b.md",
            "---\ntitle: B\ndate: 2023-01-02\ntags: [\"..\"]\n---\n\nB\n",
        );
        write(
            dir.path(),
            "data/blog/c.md",
            "---\ntitle: C\ndate: 2023-01-03\ntags: [\"../../escaped\"]\n---\n\nC\n",
        );
        let site = site(&dir);

        let report = run(&site, &BuildOptions::default()).await.unwrap();
        assert!(report.is_success());
        for feed in &report.feeds[1..] {
            let components: Vec<_> = feed.components().collect();
            assert_eq!(components.len(), 3, "{:?}", feed);
            assert_eq!(components[0].as_os_str(), "tags");
            assert!(matches!(components[1], std::path::Component::Normal(_)));
        }

        // The category feed is not replaced by a tag feed
        let feed = fs::read_to_string(site.public_dir.join("feed.xml")).unwrap();
        let channel = rss::Channel::read_from(feed.as_bytes()).unwrap();
        assert_eq!(channel.title(), "My Blog");
        assert_eq!(channel.items().len(), 3);

        assert!(site.public_dir.join("tags/%2E%2E/feed.xml").is_file());
        assert!(!dir.path().join("escaped").exists());
        assert!(!site.public_dir.join("escaped").exists());
    }

    #[tokio::test]
    async fn test_rebuild_drops_stale_artifacts() {
        let dir = TempDir::new().unwrap();
        sample(&dir);
        let site = site(&dir);
        run(&site, &BuildOptions::default()).await.unwrap();
        assert!(site.public_dir.join("tags/rust/feed.xml").is_file());
        assert!(site.public_dir.join("_bundles/later.json").is_file());

        fs::remove_file(dir.path().join("data/blog/later.md")).unwrap();
        fs::write(site.public_dir.join("robots.txt"), "").unwrap();
        let report = run(&site, &BuildOptions::default()).await.unwrap();

        assert_eq!(report.bundles, 1);
        assert!(!site.public_dir.join("tags/rust").exists());
        assert!(!site.public_dir.join("_bundles/later.json").exists());
        assert!(site.public_dir.join("_bundles/hello.json").is_file());
        assert!(site.public_dir.join("tags/dev-log/feed.xml").is_file());
        assert!(site.public_dir.join("robots.txt").is_file());

        // Every post gone: the category feed goes too
        fs::remove_file(dir.path().join("data/blog/hello.mdx")).unwrap();
        fs::remove_file(dir.path().join("data/blog/wip.mdx")).unwrap();
        run(&site, &BuildOptions::default()).await.unwrap();
        assert!(!site.public_dir.join("feed.xml").exists());
    }
}
