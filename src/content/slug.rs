//! Slug and tag normalization

use std::path::{Component, Path};

/// Lowercase and join whitespace-separated words with `-`
pub fn kebab_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Derive a post slug from its path relative to the category directory.
///
/// The extension is dropped and every remaining segment is kebab-cased, so
/// `nested/My Post.mdx` becomes `nested/my-post`.
pub fn derive_slug(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(kebab_case(&part.to_string_lossy())),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
