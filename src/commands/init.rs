//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;
use crate::CONFIG_FILE;

const SAMPLE_POST: &str = r#"---
title: Hello World
date: 2023-01-01
tags: [Getting Started]
summary: The first post of a new blog
---

Welcome! This post is written in MDX: Markdown with embedded components.

## Components

Registered components can be used directly in the body:

<Image src="/static/images/banner.png" alt="Banner" width={1200} height={630} />

Add your own under `compiler.components` in `site.yml`.

## Code

```rust:main.rs
fn main() {
    println!("Hello, world!");
}
```
"#;

/// Create `site.yml`, the content directory and a sample post.
///
/// Existing files are left untouched.
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config = SiteConfig::default();
    let category_dir = target_dir
        .join(&config.build.content_dir)
        .join(&config.build.category);
    fs::create_dir_all(&category_dir)?;
    fs::create_dir_all(target_dir.join(&config.build.public_dir))?;

    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        tracing::info!("Keeping existing {:?}", config_path);
    } else {
        let content = format!("# mdxpress configuration\n{}", config.to_yaml()?);
        fs::write(&config_path, content)?;
    }

    let sample_path = category_dir.join("hello-world.mdx");
    if !sample_path.exists() {
        fs::write(&sample_path, SAMPLE_POST)?;
    }

    Ok(())
}
