//! Rendering templates a bundle can select

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;

/// The closed set of layout templates offered by the rendering layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    #[default]
    PostLayout,
    PostSimple,
    ListLayout,
    AuthorLayout,
}

/// Lookup table from front-matter names to layouts
const LAYOUTS: &[(&str, Layout)] = &[
    ("PostLayout", Layout::PostLayout),
    ("PostSimple", Layout::PostSimple),
    ("ListLayout", Layout::ListLayout),
    ("AuthorLayout", Layout::AuthorLayout),
];

impl Layout {
    pub fn name(self) -> &'static str {
        LAYOUTS
            .iter()
            .find(|(_, layout)| *layout == self)
            .map(|(name, _)| *name)
            .unwrap_or("PostLayout")
    }

    pub fn lookup(name: &str) -> Option<Self> {
        LAYOUTS
            .iter()
            .find(|(key, _)| *key == name.trim())
            .map(|(_, layout)| *layout)
    }

    pub fn all() -> impl Iterator<Item = Layout> {
        LAYOUTS.iter().map(|(_, layout)| *layout)
    }
}

impl FromStr for Layout {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::lookup(s).ok_or_else(|| CompileError::UnknownLayout(s.to_string()))
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
