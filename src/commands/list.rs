//! List site content

use anyhow::Result;
use std::fmt::Write;

use crate::content::{ContentIndex, TagIndex};
use crate::helpers::format_date;
use crate::Site;

/// Load the index and print the listing of `content_type`
pub async fn run(site: &Site, content_type: &str) -> Result<()> {
    let index = ContentIndex::build(
        &site.content_dir,
        &site.config.build.category,
        &site.index_options(),
    )
    .await?;

    print!("{}", render(site, &index, content_type)?);
    Ok(())
}

/// Render a listing: `post`, `tag` or `draft`
pub fn render(site: &Site, index: &ContentIndex, content_type: &str) -> Result<String> {
    let filter = site.draft_filter();
    let locale = &site.config.site.locale;
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            let posts = index.select(filter);
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in posts {
                writeln!(
                    out,
                    "  {} - {} [{}] {}",
                    format_date(post.front_matter.date.as_datetime(), locale),
                    post.title(),
                    post.source,
                    post.reading_time.text()
                )?;
            }
        }
        "tag" | "tags" => {
            let tags = TagIndex::aggregate(index.posts(), filter);
            writeln!(out, "Tags ({}):", tags.len())?;
            for (tag, count) in tags.sorted() {
                writeln!(out, "  {} ({})", tag, count)?;
            }
        }
        "draft" | "drafts" => {
            let drafts: Vec<_> = index.posts().iter().filter(|p| p.is_draft()).collect();
            writeln!(out, "Drafts ({}):", drafts.len())?;
            for post in drafts {
                writeln!(out, "  {} [{}]", post.title(), post.source)?;
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, tag, draft",
                content_type
            );
        }
    }

    for failure in index.failures() {
        writeln!(out, "Skipped {:?}: {}", failure.path, failure.error)?;
    }

    Ok(out)
}
