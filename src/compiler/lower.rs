//! Lowering of mdast trees into bundle nodes
//!
//! Lowering validates the JSX vocabulary as it walks the tree, so the first
//! unknown component in document order is the one reported.

use markdown::mdast::{AlignKind, AttributeContent, AttributeValue, Code, Node};
use std::collections::{BTreeSet, HashMap};

use super::bundle::{BundleNode, ElementNode, PropValue, Props, TocEntry};
use super::components::{is_intrinsic, root_name, ComponentRegistry};
use super::toc::Slugger;
use crate::config::CompilerConfig;
use crate::error::{CompileError, SourceLocation};

/// Result of lowering one document
pub(crate) struct Lowered {
    pub tree: BundleNode,
    pub toc: Vec<TocEntry>,
    pub components: Vec<String>,
}

pub(crate) struct Lowering<'a> {
    registry: &'a ComponentRegistry,
    config: &'a CompilerConfig,
    definitions: HashMap<String, (String, Option<String>)>,
    slugger: Slugger,
    toc: Vec<TocEntry>,
    components: BTreeSet<String>,
    footnotes: Vec<BundleNode>,
    /// MDX body, set when text must not contain unparsed tags
    jsx_source: Option<&'a str>,
}

impl<'a> Lowering<'a> {
    pub fn new(registry: &'a ComponentRegistry, config: &'a CompilerConfig) -> Self {
        Self {
            registry,
            config,
            definitions: HashMap::new(),
            slugger: Slugger::new(),
            toc: Vec::new(),
            components: BTreeSet::new(),
            footnotes: Vec::new(),
            jsx_source: None,
        }
    }

    /// Reject a `<` in text that starts a tag, as MDX has no literal HTML
    pub fn with_jsx_source(mut self, body: &'a str) -> Self {
        self.jsx_source = Some(body);
        self
    }

    pub fn lower_root(mut self, root: &Node) -> Result<Lowered, CompileError> {
        collect_definitions(root, &mut self.definitions);

        let mut children = Vec::new();
        self.lower_into(root, &mut children)?;

        if !self.footnotes.is_empty() {
            let list = element("ol", std::mem::take(&mut self.footnotes));
            children.push(BundleNode::Element(
                ElementNode::new("section")
                    .prop("className", "footnotes")
                    .children(vec![list]),
            ));
        }

        Ok(Lowered {
            tree: BundleNode::Fragment { children },
            toc: self.toc,
            components: self.components.into_iter().collect(),
        })
    }

    fn lower_nodes(&mut self, nodes: &[Node]) -> Result<Vec<BundleNode>, CompileError> {
        let mut out = Vec::new();
        for node in nodes {
            self.lower_into(node, &mut out)?;
        }
        Ok(out)
    }

    fn wrap(&mut self, tag: &str, props: Props, nodes: &[Node]) -> Result<BundleNode, CompileError> {
        let mut el = ElementNode::new(tag);
        el.props = props;
        el.children = self.lower_nodes(nodes)?;
        Ok(BundleNode::Element(el))
    }

    fn lower_into(&mut self, node: &Node, out: &mut Vec<BundleNode>) -> Result<(), CompileError> {
        match node {
            Node::Root(root) => {
                for child in &root.children {
                    self.lower_into(child, out)?;
                }
            }
            Node::Paragraph(p) => out.push(self.wrap("p", Props::new(), &p.children)?),
            Node::Heading(heading) => {
                let value = plain_text(&heading.children);
                let id = self.slugger.slug(&value);
                self.toc.push(TocEntry {
                    value,
                    url: format!("#{}", id),
                    depth: heading.depth,
                });
                let props = literal_props([("id", id)]);
                let tag = format!("h{}", heading.depth);
                out.push(self.wrap(&tag, props, &heading.children)?);
            }
            Node::Text(text) => {
                self.check_unparsed_tag(node)?;
                out.push(BundleNode::text(text.value.clone()))
            }
            Node::Emphasis(n) => out.push(self.wrap("em", Props::new(), &n.children)?),
            Node::Strong(n) => out.push(self.wrap("strong", Props::new(), &n.children)?),
            Node::Delete(n) => out.push(self.wrap("del", Props::new(), &n.children)?),
            Node::Blockquote(n) => out.push(self.wrap("blockquote", Props::new(), &n.children)?),
            Node::InlineCode(code) => {
                out.push(element("code", vec![BundleNode::text(code.value.clone())]))
            }
            Node::Code(code) => self.lower_code(code, out),
            Node::InlineMath(math) => out.push(BundleNode::Element(
                ElementNode::new("span")
                    .prop("className", "math math-inline")
                    .children(vec![BundleNode::text(math.value.clone())]),
            )),
            Node::Math(math) => out.push(BundleNode::Element(
                ElementNode::new("div")
                    .prop("className", "math math-display")
                    .children(vec![BundleNode::text(math.value.clone())]),
            )),
            Node::Break(_) => out.push(element("br", Vec::new())),
            Node::ThematicBreak(_) => out.push(element("hr", Vec::new())),
            Node::Html(html) => out.push(BundleNode::Raw {
                html: html.value.clone(),
            }),
            Node::Link(link) => {
                let mut props = literal_props([("href", link.url.clone())]);
                if let Some(title) = &link.title {
                    props.insert("title".to_string(), PropValue::Literal(title.clone()));
                }
                out.push(self.wrap("a", props, &link.children)?);
            }
            Node::Image(image) => {
                let mut props =
                    literal_props([("src", image.url.clone()), ("alt", image.alt.clone())]);
                if let Some(title) = &image.title {
                    props.insert("title".to_string(), PropValue::Literal(title.clone()));
                }
                out.push(leaf("img", props));
            }
            Node::LinkReference(reference) => {
                match self.definitions.get(&normalize_identifier(&reference.identifier)) {
                    Some((url, title)) => {
                        let mut props = literal_props([("href", url.clone())]);
                        if let Some(title) = title {
                            props.insert("title".to_string(), PropValue::Literal(title.clone()));
                        }
                        out.push(self.wrap("a", props, &reference.children)?);
                    }
                    None => out.extend(self.lower_nodes(&reference.children)?),
                }
            }
            Node::ImageReference(reference) => {
                match self.definitions.get(&normalize_identifier(&reference.identifier)) {
                    Some((url, _)) => out.push(leaf(
                        "img",
                        literal_props([("src", url.clone()), ("alt", reference.alt.clone())]),
                    )),
                    None => out.push(BundleNode::text(reference.alt.clone())),
                }
            }
            Node::Definition(_) | Node::Yaml(_) | Node::Toml(_) => {}
            Node::List(list) => {
                let tag = if list.ordered { "ol" } else { "ul" };
                let mut props = Props::new();
                if let Some(start) = list.start.filter(|s| list.ordered && *s != 1) {
                    props.insert("start".to_string(), PropValue::Literal(start.to_string()));
                }
                out.push(self.wrap(tag, props, &list.children)?);
            }
            Node::ListItem(item) => {
                let mut children = Vec::new();
                if let Some(checked) = item.checked {
                    let mut input = ElementNode::new("input").prop("type", "checkbox");
                    input
                        .props
                        .insert("checked".to_string(), PropValue::Flag(checked));
                    input
                        .props
                        .insert("disabled".to_string(), PropValue::Flag(true));
                    children.push(BundleNode::Element(input));
                }
                for child in &item.children {
                    match child {
                        // Tight items render their paragraphs inline
                        Node::Paragraph(p) if !item.spread => {
                            children.extend(self.lower_nodes(&p.children)?)
                        }
                        _ => self.lower_into(child, &mut children)?,
                    }
                }
                out.push(element("li", children));
            }
            Node::Table(table) => {
                let mut rows = table.children.iter();
                let mut sections = Vec::new();
                if let Some(head) = rows.next() {
                    let row = self.lower_row(head, &table.align, "th")?;
                    sections.push(element("thead", vec![row]));
                }
                let body = rows
                    .map(|row| self.lower_row(row, &table.align, "td"))
                    .collect::<Result<Vec<_>, _>>()?;
                if !body.is_empty() {
                    sections.push(element("tbody", body));
                }
                out.push(element("table", sections));
            }
            Node::TableRow(row) => out.push(self.wrap("tr", Props::new(), &row.children)?),
            Node::TableCell(cell) => out.push(self.wrap("td", Props::new(), &cell.children)?),
            Node::FootnoteReference(reference) => {
                let id = normalize_identifier(&reference.identifier);
                let label = reference.label.clone().unwrap_or_else(|| id.clone());
                let link = ElementNode::new("a")
                    .prop("href", format!("#fn-{}", id))
                    .prop("id", format!("fnref-{}", id))
                    .children(vec![BundleNode::text(label)]);
                out.push(element("sup", vec![BundleNode::Element(link)]));
            }
            Node::FootnoteDefinition(definition) => {
                let id = normalize_identifier(&definition.identifier);
                let children = self.lower_nodes(&definition.children)?;
                self.footnotes.push(BundleNode::Element(
                    ElementNode::new("li")
                        .prop("id", format!("fn-{}", id))
                        .children(children),
                ));
            }
            Node::MdxJsxFlowElement(el) => {
                self.lower_jsx(el.name.as_deref(), &el.attributes, &el.children, node, out)?
            }
            Node::MdxJsxTextElement(el) => {
                self.lower_jsx(el.name.as_deref(), &el.attributes, &el.children, node, out)?
            }
            Node::MdxFlowExpression(expr) => out.push(BundleNode::Expression {
                code: expr.value.clone(),
            }),
            Node::MdxTextExpression(expr) => out.push(BundleNode::Expression {
                code: expr.value.clone(),
            }),
            Node::MdxjsEsm(_) => {
                return Err(CompileError::UnsupportedEsm {
                    location: location_of(node),
                })
            }
            #[allow(unreachable_patterns)]
            other => {
                if let Some(children) = other.children() {
                    for child in children {
                        self.lower_into(child, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn lower_code(&mut self, code: &Code, out: &mut Vec<BundleNode>) {
        let (lang, title) = match code.lang.as_deref() {
            Some(lang) if self.config.code_titles => match lang.split_once(':') {
                Some((lang, title)) => (Some(lang), Some(title)),
                None => (Some(lang), None),
            },
            lang => (lang, None),
        };

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            out.push(BundleNode::Element(
                ElementNode::new("div")
                    .prop("className", "remark-code-title")
                    .children(vec![BundleNode::text(title)]),
            ));
        }

        let mut inner = ElementNode::new("code").children(vec![BundleNode::text(code.value.clone())]);
        if let Some(lang) = lang.filter(|l| !l.is_empty()) {
            inner = inner.prop("className", format!("language-{}", lang));
        }
        let mut pre = ElementNode::new("pre").children(vec![BundleNode::Element(inner)]);
        if let Some(meta) = &code.meta {
            pre = pre.prop("metastring", meta.clone());
        }
        out.push(BundleNode::Element(pre));
    }

    fn lower_row(
        &mut self,
        row: &Node,
        align: &[AlignKind],
        cell_tag: &str,
    ) -> Result<BundleNode, CompileError> {
        let mut cells = Vec::new();
        if let Some(children) = row.children() {
            for (i, cell) in children.iter().enumerate() {
                let mut props = Props::new();
                let alignment = match align.get(i) {
                    Some(AlignKind::Left) => Some("left"),
                    Some(AlignKind::Right) => Some("right"),
                    Some(AlignKind::Center) => Some("center"),
                    _ => None,
                };
                if let Some(alignment) = alignment {
                    props.insert("align".to_string(), PropValue::Literal(alignment.to_string()));
                }
                let content = cell.children().map(Vec::as_slice).unwrap_or(&[]);
                cells.push(self.wrap(cell_tag, props, content)?);
            }
        }
        Ok(element("tr", cells))
    }

    /// A tag opener left in MDX text is one the parser gave up on, such as
    /// `<Image` with no closing `>`. Escaped `\<` is fine.
    fn check_unparsed_tag(&self, node: &Node) -> Result<(), CompileError> {
        let (Some(source), Some(position)) = (self.jsx_source, node.position()) else {
            return Ok(());
        };
        let Some(raw) = source.get(position.start.offset..position.end.offset) else {
            return Ok(());
        };

        let bytes = raw.as_bytes();
        for (i, &byte) in bytes.iter().enumerate() {
            if byte != b'<' || (i > 0 && bytes[i - 1] == b'\\') {
                continue;
            }
            let opens = matches!(
                bytes.get(i + 1),
                Some(next) if next.is_ascii_alphabetic() || *next == b'/' || *next == b'>'
            );
            if !opens {
                continue;
            }

            let before = &raw[..i];
            let location = match before.rfind('\n') {
                Some(newline) => SourceLocation::new(
                    position.start.line + before.matches('\n').count(),
                    before[newline + 1..].chars().count() + 1,
                ),
                None => SourceLocation::new(
                    position.start.line,
                    position.start.column + before.chars().count(),
                ),
            };
            let tag: String = raw[i..].chars().take_while(|c| !c.is_whitespace()).collect();
            return Err(CompileError::Syntax {
                reason: format!("unclosed JSX tag `{}` (write `\\<` for a literal `<`)", tag),
                location,
            });
        }
        Ok(())
    }

    fn lower_jsx(
        &mut self,
        name: Option<&str>,
        attributes: &[AttributeContent],
        children: &[Node],
        node: &Node,
        out: &mut Vec<BundleNode>,
    ) -> Result<(), CompileError> {
        let Some(name) = name else {
            let children = self.lower_nodes(children)?;
            out.push(BundleNode::Fragment { children });
            return Ok(());
        };

        let root = root_name(name);
        let intrinsic = is_intrinsic(root);
        if !intrinsic && !self.registry.allows(name) {
            return Err(CompileError::UnknownComponent {
                name: name.to_string(),
                location: location_of(node),
            });
        }

        let mut el = ElementNode::new(name);
        for attribute in attributes {
            match attribute {
                AttributeContent::Property(property) => {
                    let value = match &property.value {
                        None => PropValue::Flag(true),
                        Some(AttributeValue::Literal(literal)) => {
                            PropValue::Literal(literal.clone())
                        }
                        Some(AttributeValue::Expression(expression)) => PropValue::Expression {
                            expression: expression.value.clone(),
                        },
                    };
                    el.props.insert(property.name.clone(), value);
                }
                AttributeContent::Expression(expression) => {
                    el.spread.push(expression.value.clone())
                }
            }
        }
        el.children = self.lower_nodes(children)?;

        if intrinsic {
            out.push(BundleNode::Element(el));
        } else {
            self.components.insert(root.to_string());
            out.push(BundleNode::Component(el));
        }
        Ok(())
    }
}

fn element(tag: &str, children: Vec<BundleNode>) -> BundleNode {
    BundleNode::Element(ElementNode::new(tag).children(children))
}

fn leaf(tag: &str, props: Props) -> BundleNode {
    let mut el = ElementNode::new(tag);
    el.props = props;
    BundleNode::Element(el)
}

fn literal_props<const N: usize>(pairs: [(&str, String); N]) -> Props {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), PropValue::Literal(v)))
        .collect()
}

fn location_of(node: &Node) -> SourceLocation {
    node.position()
        .map(|p| SourceLocation::new(p.start.line, p.start.column))
        .unwrap_or(SourceLocation::new(1, 1))
}

/// Text content of inline nodes, used for heading ids and the TOC
fn plain_text(nodes: &[Node]) -> String {
    let mut text = String::new();
    for node in nodes {
        match node {
            Node::Text(t) => text.push_str(&t.value),
            Node::InlineCode(c) => text.push_str(&c.value),
            Node::InlineMath(m) => text.push_str(&m.value),
            other => {
                if let Some(children) = other.children() {
                    text.push_str(&plain_text(children));
                }
            }
        }
    }
    text
}

fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn collect_definitions(node: &Node, definitions: &mut HashMap<String, (String, Option<String>)>) {
    if let Node::Definition(definition) = node {
        // First definition wins
        definitions
            .entry(normalize_identifier(&definition.identifier))
            .or_insert_with(|| (definition.url.clone(), definition.title.clone()));
    }
    if let Some(children) = node.children() {
        for child in children {
            collect_definitions(child, definitions);
        }
    }
}
