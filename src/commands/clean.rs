//! Remove generated artifacts

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::build::BUNDLE_DIR;
use crate::error::BuildError;
use crate::Site;

/// Delete feeds and bundles from the public directory.
///
/// Other files in the public directory belong to the rendering layer and are
/// left alone. Returns the paths that were removed.
pub fn run(site: &Site) -> Result<Vec<PathBuf>> {
    Ok(remove_artifacts(&site.public_dir)?)
}

/// Remove `feed.xml`, `tags/` and the bundle directory under `public_dir`.
///
/// A build calls this before writing, so feeds of vanished tags and bundles
/// of deleted posts do not outlive a rebuild.
pub fn remove_artifacts(public_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut removed = Vec::new();

    let feed = public_dir.join("feed.xml");
    if feed.is_file() {
        fs::remove_file(&feed).map_err(|source| BuildError::Io {
            path: feed.clone(),
            source,
        })?;
        tracing::info!("Deleted: {:?}", feed);
        removed.push(feed);
    }

    for dir in ["tags", BUNDLE_DIR] {
        let dir = public_dir.join(dir);
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(|source| BuildError::Io {
                path: dir.clone(),
                source,
            })?;
            tracing::info!("Deleted: {:?}", dir);
            removed.push(dir);
        }
    }

    Ok(removed)
}
