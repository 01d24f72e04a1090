//! Bundle cache for a single build
//!
//! Compilation is a pure function of its inputs, so a bundle can be reused
//! whenever the compiler digest matches. Nothing is persisted between builds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::compiler::{CompiledBundle, MdxCompiler};
use crate::content::PostRecord;
use crate::error::CompileError;

/// Compiled bundles keyed by digest
#[derive(Debug, Default)]
pub struct BundleCache {
    entries: Mutex<HashMap<String, CompiledBundle>>,
    hits: AtomicUsize,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached bundle for this post, compiling it on a miss.
    ///
    /// Failed compilations are not cached.
    pub fn get_or_compile(
        &self,
        compiler: &MdxCompiler,
        post: &PostRecord,
    ) -> Result<CompiledBundle, CompileError> {
        let digest = compiler.digest(&MdxCompiler::input_for(post));

        if let Some(bundle) = self.lock().get(&digest) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Bundle cache hit for {}", post.slug);
            return Ok(bundle.clone());
        }

        // Compile without holding the lock
        let bundle = compiler.compile_post(post)?;
        self.lock().insert(digest, bundle.clone());
        Ok(bundle)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CompiledBundle>> {
        // Entries are only ever inserted whole, so a poisoned map is still valid
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
