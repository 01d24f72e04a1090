//! Content module - front matter, post records, the content index and tags

mod frontmatter;
pub mod loader;
mod post;
pub mod slug;
mod tags;

pub use frontmatter::{Body, FrontMatter, PostDate};
pub use loader::{ContentIndex, FileFailure, IndexOptions};
pub use post::{PostRecord, ReadingTime, SourceMode};
pub use slug::{derive_slug, kebab_case};
pub use tags::{DraftFilter, TagIndex};
