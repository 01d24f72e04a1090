//! The component vocabulary MDX bodies may embed

use std::collections::BTreeSet;

/// Components the rendering layer provides out of the box
pub const BUILTIN_COMPONENTS: &[&str] = &["Image", "Link", "Pre", "TOCInline"];

/// Names of the components a body is allowed to reference.
///
/// Lowercase JSX names are intrinsic elements (`div`, `svg:rect`) and always
/// allowed. Capitalized names, and the root of member names like `Foo.Bar`,
/// must be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRegistry {
    names: BTreeSet<String>,
}

impl ComponentRegistry {
    /// An empty vocabulary, only intrinsic elements are accepted
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    pub fn builtin() -> Self {
        Self::empty().with_components(BUILTIN_COMPONENTS.iter().copied())
    }

    pub fn with_components<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.register(name);
        }
        self
    }

    pub fn register(&mut self, name: impl Into<String>) {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.names.insert(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether a JSX element name may appear in a body
    pub fn allows(&self, jsx_name: &str) -> bool {
        let root = root_name(jsx_name);
        is_intrinsic(root) || self.contains(root)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `Foo` for `Foo.Bar`, `svg` for `svg:rect`
pub fn root_name(jsx_name: &str) -> &str {
    jsx_name.split(['.', ':']).next().unwrap_or(jsx_name)
}

pub fn is_intrinsic(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
}
