//! Content index builder - loads every post of a category

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use super::{DraftFilter, PostRecord, SourceMode};
use crate::error::{ContentError, IndexError};

/// Options for building an index
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub words_per_minute: u32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// A content file that was left out of the index
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ContentError,
}

/// All posts of one category, sorted newest first
#[derive(Debug, Default)]
pub struct ContentIndex {
    posts: Vec<PostRecord>,
    failures: Vec<FileFailure>,
}

impl ContentIndex {
    /// Scan `<content_root>/<category>`, parse every `.md`/`.mdx` file and sort the result.
    ///
    /// Files are read and parsed concurrently; nothing is exposed until every
    /// file has been joined. Files that fail to parse are skipped and recorded
    /// in [`ContentIndex::failures`]. Two files with the same slug abort the
    /// build.
    pub async fn build(
        content_root: &Path,
        category: &str,
        options: &IndexOptions,
    ) -> Result<Self, IndexError> {
        let category_dir = content_root.join(category);
        if !category_dir.is_dir() {
            tracing::debug!("No content directory at {:?}", category_dir);
            return Ok(Self::default());
        }

        let (files, mut failures) = collect_content_files(&category_dir);
        tracing::debug!("Found {} content files in {:?}", files.len(), category_dir);

        let mut tasks = JoinSet::new();
        for path in files {
            let category_relative = path
                .strip_prefix(&category_dir)
                .unwrap_or(&path)
                .to_path_buf();
            let source = path
                .strip_prefix(content_root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let words_per_minute = options.words_per_minute;

            tasks.spawn(async move {
                let result = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => PostRecord::from_source(
                        &content,
                        &path,
                        &category_relative,
                        source,
                        words_per_minute,
                    )
                    .map_err(ContentError::from),
                    Err(e) => Err(ContentError::from(e)),
                };
                (path, result)
            });
        }

        let mut posts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined?;
            match result {
                Ok(post) => posts.push(post),
                Err(error) => {
                    tracing::warn!("Skipping {:?}: {}", path, error);
                    failures.push(FileFailure { path, error });
                }
            }
        }

        Self::from_records(posts, failures)
    }

    /// Assemble an index from already parsed records
    pub fn from_records(
        mut posts: Vec<PostRecord>,
        mut failures: Vec<FileFailure>,
    ) -> Result<Self, IndexError> {
        // Date descending, ties broken by path
        posts.sort_by(|a, b| {
            b.front_matter
                .date
                .cmp(&a.front_matter.date)
                .then_with(|| a.source.cmp(&b.source))
        });
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        check_unique_slugs(&posts)?;

        Ok(Self { posts, failures })
    }

    /// Every post, drafts included
    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    /// Posts that are not drafts
    pub fn published(&self) -> Vec<&PostRecord> {
        self.select(DraftFilter::Exclude)
    }

    pub fn select(&self, filter: DraftFilter) -> Vec<&PostRecord> {
        self.posts.iter().filter(|p| filter.admits(p)).collect()
    }

    /// Posts carrying a tag that normalizes to `tag`
    pub fn tagged(&self, tag: &str, filter: DraftFilter) -> Vec<&PostRecord> {
        self.posts
            .iter()
            .filter(|p| filter.admits(p) && p.has_tag(tag))
            .collect()
    }

    pub fn find(&self, slug: &str) -> Option<&PostRecord> {
        self.posts.iter().find(|p| p.slug == slug)
    }

    /// The newer and older neighbours of a post, for prev/next navigation
    pub fn adjacent(
        &self,
        slug: &str,
        filter: DraftFilter,
    ) -> (Option<&PostRecord>, Option<&PostRecord>) {
        let posts = self.select(filter);
        let Some(pos) = posts.iter().position(|p| p.slug == slug) else {
            return (None, None);
        };
        let newer = pos.checked_sub(1).map(|i| posts[i]);
        let older = posts.get(pos + 1).copied();
        (newer, older)
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// Move the failures out, leaving the posts in place
    pub fn take_failures(&mut self) -> Vec<FileFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Content files under a category in path order, plus the entries that
/// could not be scanned
fn collect_content_files(dir: &Path) -> (Vec<PathBuf>, Vec<FileFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && SourceMode::from_path(entry.path()).is_some() {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                tracing::warn!("Cannot scan {:?}: {}", path, err);
                failures.push(FileFailure {
                    path,
                    error: ContentError::Scan(err),
                });
            }
        }
    }

    files.sort();
    (files, failures)
}

fn check_unique_slugs(posts: &[PostRecord]) -> Result<(), IndexError> {
    let mut seen: HashMap<&str, &PostRecord> = HashMap::new();
    for post in posts {
        if let Some(first) = seen.insert(&post.slug, post) {
            // Report in path order so the message is stable
            let (first, second) = if first.source <= post.source {
                (first, post)
            } else {
                (post, first)
            };
            return Err(IndexError::DuplicateSlug {
                slug: post.slug.clone(),
                first: first.full_source.clone(),
                second: second.full_source.clone(),
            });
        }
    }
    Ok(())
}
