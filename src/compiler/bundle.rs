//! Compiled bundles handed to the rendering layer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Layout;
use crate::content::SourceMode;

/// Element and component properties, sorted by name
pub type Props = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// A bare attribute, `<Image priority />`
    Flag(bool),
    Literal(String),
    /// `{...}` attribute value, evaluated by the renderer
    Expression { expression: String },
}

/// An element or component with its props and children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,
    /// `{...spread}` attribute expressions, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spread: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BundleNode>,
}

impl ElementNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Props::new(),
            spread: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props
            .insert(key.to_string(), PropValue::Literal(value.into()));
        self
    }

    pub fn children(mut self, children: Vec<BundleNode>) -> Self {
        self.children = children;
        self
    }
}

/// The executable tree of a post body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BundleNode {
    Fragment { children: Vec<BundleNode> },
    /// Intrinsic HTML element
    Element(ElementNode),
    /// Component looked up in the renderer's vocabulary
    Component(ElementNode),
    Text { value: String },
    /// Raw HTML from Markdown sources
    Raw { html: String },
    /// An MDX `{expression}`
    Expression { code: String },
}

impl BundleNode {
    pub fn text(value: impl Into<String>) -> Self {
        BundleNode::Text {
            value: value.into(),
        }
    }

    pub fn children(&self) -> &[BundleNode] {
        match self {
            BundleNode::Fragment { children } => children,
            BundleNode::Element(el) | BundleNode::Component(el) => &el.children,
            _ => &[],
        }
    }
}

/// A heading of the table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub value: String,
    pub url: String,
    pub depth: u8,
}

/// Output of the MDX compiler for one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledBundle {
    pub layout: Layout,
    pub mode: SourceMode,
    /// Hash of everything the bundle was compiled from
    pub digest: String,
    /// JSON encoding of the [`BundleNode`] tree
    pub code: String,
    /// Registered components the body uses, sorted
    pub components: Vec<String>,
    pub toc: Vec<TocEntry>,
}

impl CompiledBundle {
    /// Decode the executable tree
    pub fn tree(&self) -> Result<BundleNode, serde_json::Error> {
        serde_json::from_str(&self.code)
    }

    /// Serialize for page props
    pub fn to_props(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_props(props: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(props)
    }
}
