//! Tag aggregation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PostRecord;

/// Whether drafts take part in a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftFilter {
    #[default]
    Exclude,
    Include,
}

impl DraftFilter {
    /// Include drafts only for preview builds
    pub fn from_drafts_flag(include_drafts: bool) -> Self {
        if include_drafts {
            DraftFilter::Include
        } else {
            DraftFilter::Exclude
        }
    }

    pub fn admits(self, post: &PostRecord) -> bool {
        self == DraftFilter::Include || !post.is_draft()
    }
}

/// Post count per normalized tag.
///
/// Raw tags that normalize to the same key are merged; iteration follows the
/// order keys were first seen, callers sort for presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TagIndex(IndexMap<String, usize>);

impl TagIndex {
    pub fn aggregate<'a, I>(posts: I, filter: DraftFilter) -> Self
    where
        I: IntoIterator<Item = &'a PostRecord>,
    {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for post in posts.into_iter().filter(|p| filter.admits(p)) {
            for tag in post.normalized_tags() {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        Self(counts)
    }

    /// Number of posts carrying `tag` (0 when unknown)
    pub fn get(&self, tag: &str) -> usize {
        self.0.get(tag).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Tags by count descending, then name
    pub fn sorted(&self) -> Vec<(&str, usize)> {
        let mut tags: Vec<_> = self.iter().collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tags
    }
}
