//! MDX compiler
//!
//! Compiles a post body into a [`CompiledBundle`]: a serialized tree that the
//! rendering layer executes. Compilation never renders, and is a pure function
//! of the body, the component vocabulary and the compiler configuration.

pub mod bundle;
pub mod components;
pub mod layout;
mod lower;
mod toc;

pub use bundle::{BundleNode, CompiledBundle, ElementNode, PropValue, Props, TocEntry};
pub use components::{ComponentRegistry, BUILTIN_COMPONENTS};
pub use layout::Layout;
pub use toc::Slugger;

use markdown::message::Place;
use markdown::{Constructs, MdxSignal, ParseOptions};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::{CompilerConfig, SiteConfig};
use crate::content::{PostRecord, SourceMode};
use crate::error::{CompileError, SourceLocation};
use lower::Lowering;

/// What to compile
#[derive(Debug, Clone, Copy)]
pub struct CompileInput<'a> {
    pub body: &'a str,
    pub mode: SourceMode,
    /// Layout name from front matter, `None` for the default
    pub layout: Option<&'a str>,
}

/// Markdown/MDX to bundle compiler
#[derive(Debug, Clone)]
pub struct MdxCompiler {
    registry: ComponentRegistry,
    config: CompilerConfig,
    default_layout: Layout,
}

impl MdxCompiler {
    pub fn new(registry: ComponentRegistry, config: CompilerConfig, default_layout: Layout) -> Self {
        Self {
            registry,
            config,
            default_layout,
        }
    }

    /// Built-in vocabulary plus the components configured in `site.yml`
    pub fn from_config(config: &SiteConfig) -> Self {
        let registry =
            ComponentRegistry::builtin().with_components(config.compiler.components.iter().cloned());
        Self::new(registry, config.compiler.clone(), config.build.default_layout)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn resolve_layout(&self, name: Option<&str>) -> Result<Layout, CompileError> {
        match name {
            Some(name) => name.parse(),
            None => Ok(self.default_layout),
        }
    }

    /// Content address of a compilation
    pub fn digest(&self, input: &CompileInput<'_>) -> String {
        let mut hasher = DefaultHasher::new();
        input.body.hash(&mut hasher);
        input.mode.hash(&mut hasher);
        input.layout.hash(&mut hasher);
        self.default_layout.hash(&mut hasher);
        for name in self.registry.names() {
            name.hash(&mut hasher);
        }
        self.config.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    fn parse_options(&self, mode: SourceMode) -> ParseOptions {
        let mut constructs = match mode {
            SourceMode::Mdx => Constructs::mdx(),
            SourceMode::Markdown => Constructs::default(),
        };
        if self.config.gfm {
            constructs.gfm_autolink_literal = true;
            constructs.gfm_footnote_definition = true;
            constructs.gfm_label_start_footnote = true;
            constructs.gfm_strikethrough = true;
            constructs.gfm_table = true;
            constructs.gfm_task_list_item = true;
        }
        if self.config.math {
            constructs.math_flow = true;
            constructs.math_text = true;
        }
        let mdx_esm_parse = match mode {
            SourceMode::Mdx => Some(Box::new(accept_esm) as Box<markdown::MdxEsmParse>),
            SourceMode::Markdown => None,
        };
        ParseOptions {
            constructs,
            mdx_esm_parse,
            ..ParseOptions::default()
        }
    }

    /// Compile a body. Locations in errors are relative to the body.
    pub fn compile(&self, input: &CompileInput<'_>) -> Result<CompiledBundle, CompileError> {
        let layout = self.resolve_layout(input.layout)?;

        let root = markdown::to_mdast(input.body, &self.parse_options(input.mode)).map_err(
            |message| CompileError::Syntax {
                location: message
                    .place
                    .as_deref()
                    .map(|place| match place {
                        Place::Point(point) => SourceLocation::new(point.line, point.column),
                        Place::Position(position) => {
                            SourceLocation::new(position.start.line, position.start.column)
                        }
                    })
                    .unwrap_or(SourceLocation::new(1, 1)),
                reason: message.reason,
            },
        )?;

        let mut lowering = Lowering::new(&self.registry, &self.config);
        if input.mode == SourceMode::Mdx {
            lowering = lowering.with_jsx_source(input.body);
        }
        let lowered = lowering.lower_root(&root)?;

        Ok(CompiledBundle {
            layout,
            mode: input.mode,
            digest: self.digest(input),
            code: serde_json::to_string(&lowered.tree)?,
            components: lowered.components,
            toc: lowered.toc,
        })
    }

    /// Compile a post, reporting errors in file coordinates
    pub fn compile_post(&self, post: &PostRecord) -> Result<CompiledBundle, CompileError> {
        self.compile(&Self::input_for(post))
            .map_err(|e| e.offset_lines(post.body_line.saturating_sub(1)))
    }

    pub fn input_for(post: &PostRecord) -> CompileInput<'_> {
        CompileInput {
            body: &post.body,
            mode: post.mode,
            layout: post.front_matter.layout.as_deref(),
        }
    }
}

impl Default for MdxCompiler {
    fn default() -> Self {
        Self::new(
            ComponentRegistry::builtin(),
            CompilerConfig::default(),
            Layout::default(),
        )
    }
}

/// ESM is parsed into its own node so lowering can reject it with a location
fn accept_esm(_source: &str) -> MdxSignal {
    MdxSignal::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn mdx(body: &str) -> CompileInput<'_> {
        CompileInput {
            body,
            mode: SourceMode::Mdx,
            layout: None,
        }
    }

    fn first_child(bundle: &CompiledBundle) -> BundleNode {
        bundle.tree().unwrap().children()[0].clone()
    }

    #[test]
    fn test_compile_is_pure() {
        let compiler = MdxCompiler::default();
        let input = mdx("# Title\n\nSome *text* with <Image src=\"/a.png\" />\n");
        let a = compiler.compile(&input).unwrap();
        let b = compiler.compile(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_props().unwrap(), b.to_props().unwrap());
    }

    #[test]
    fn test_digest_tracks_inputs() {
        let compiler = MdxCompiler::default();
        let a = compiler.digest(&mdx("hello"));
        assert_eq!(a, compiler.digest(&mdx("hello")));
        assert_ne!(a, compiler.digest(&mdx("hello!")));

        let extended = MdxCompiler::new(
            ComponentRegistry::builtin().with_components(["Chart"]),
            CompilerConfig::default(),
            Layout::default(),
        );
        assert_ne!(a, extended.digest(&mdx("hello")));
    }

    #[test]
    fn test_registered_component() {
        let compiler = MdxCompiler::default();
        let bundle = compiler
            .compile(&mdx("<TOCInline toc={props.toc} />\n\n<Image src=\"/a.png\" priority />\n"))
            .unwrap();
        assert_eq!(bundle.components, vec!["Image", "TOCInline"]);

        let tree = bundle.tree().unwrap();
        let BundleNode::Component(toc) = &tree.children()[0] else {
            panic!("expected component");
        };
        assert_eq!(toc.name, "TOCInline");
        assert_eq!(
            toc.props["toc"],
            PropValue::Expression {
                expression: "props.toc".to_string()
            }
        );
        let BundleNode::Component(image) = &tree.children()[1] else {
            panic!("expected component");
        };
        assert_eq!(image.props["priority"], PropValue::Flag(true));
    }

    #[test]
    fn test_unknown_component_is_rejected() {
        let compiler = MdxCompiler::default();
        let err = compiler
            .compile(&mdx("Intro\n\n<Chart data={[1, 2]} />\n"))
            .unwrap_err();
        match err {
            CompileError::UnknownComponent { name, location } => {
                assert_eq!(name, "Chart");
                assert_eq!(location, SourceLocation::new(3, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_intrinsic_elements_are_allowed() {
        let compiler = MdxCompiler::new(
            ComponentRegistry::empty(),
            CompilerConfig::default(),
            Layout::default(),
        );
        let bundle = compiler
            .compile(&mdx("<div className=\"note\">\n\nhi\n\n</div>\n"))
            .unwrap();
        assert!(bundle.components.is_empty());
        let BundleNode::Element(div) = first_child(&bundle) else {
            panic!("expected element");
        };
        assert_eq!(div.name, "div");
    }

    #[test]
    fn test_syntax_error_has_location() {
        let compiler = MdxCompiler::default();
        let err = compiler.compile(&mdx("text\n\n<Image\n")).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_unclosed_jsx_tag_is_rejected() {
        let compiler = MdxCompiler::default();
        let err = compiler
            .compile(&mdx("<Image src=\"a\"\n\nmore text\n"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        assert_eq!(err.location().map(|l| l.line), Some(1));

        let err = compiler
            .compile(&mdx("Intro\n\nSee <Image src=\"a\"\n"))
            .unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        assert!(err.location().is_some_and(|l| l.line >= 3));
    }

    #[test]
    fn test_escaped_angle_bracket_is_text() {
        let compiler = MdxCompiler::default();
        let bundle = compiler.compile(&mdx("a \\<Image b\n")).unwrap();
        assert!(bundle.components.is_empty());
        assert!(bundle.code.contains("<Image b"));
    }

    #[test]
    fn test_markdown_mode_keeps_angle_brackets() {
        let compiler = MdxCompiler::default();
        let input = CompileInput {
            body: "text\n\n<Image\n",
            mode: SourceMode::Markdown,
            layout: None,
        };
        assert!(compiler.compile(&input).is_ok());
    }

    #[test]
    fn test_esm_is_rejected() {
        let compiler = MdxCompiler::default();
        let err = compiler
            .compile(&mdx("import Chart from './chart'\n\n# Hi\n"))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedEsm { location } if location.line == 1));

        let err = compiler
            .compile(&mdx("# Hi\n\nexport const meta = { draft: true }\n"))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedEsm { location } if location.line == 3));
    }

    #[test]
    fn test_layout_resolution() {
        let compiler = MdxCompiler::default();
        let mut input = mdx("hi");
        assert_eq!(compiler.compile(&input).unwrap().layout, Layout::PostLayout);

        input.layout = Some("PostSimple");
        assert_eq!(compiler.compile(&input).unwrap().layout, Layout::PostSimple);

        input.layout = Some("Nope");
        assert!(matches!(
            compiler.compile(&input),
            Err(CompileError::UnknownLayout(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_headings_build_toc() {
        let compiler = MdxCompiler::default();
        let bundle = compiler
            .compile(&mdx("## Setup\n\ntext\n\n### Install `cargo`\n\n## Setup\n"))
            .unwrap();
        let urls: Vec<_> = bundle.toc.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["#setup", "#install-cargo", "#setup-1"]);
        assert_eq!(bundle.toc[1].value, "Install cargo");
        assert_eq!(bundle.toc[1].depth, 3);

        let BundleNode::Element(h2) = first_child(&bundle) else {
            panic!("expected heading");
        };
        assert_eq!(h2.name, "h2");
        assert_eq!(h2.props["id"], PropValue::Literal("setup".to_string()));
    }

    #[test]
    fn test_code_title() {
        let compiler = MdxCompiler::default();
        let bundle = compiler
            .compile(&mdx("```rust:main.rs\nfn main() {}\n```\n"))
            .unwrap();
        let tree = bundle.tree().unwrap();
        let BundleNode::Element(title) = &tree.children()[0] else {
            panic!("expected title");
        };
        assert_eq!(
            title.props["className"],
            PropValue::Literal("remark-code-title".to_string())
        );
        assert_eq!(title.children, vec![BundleNode::text("main.rs")]);

        let BundleNode::Element(pre) = &tree.children()[1] else {
            panic!("expected pre");
        };
        let BundleNode::Element(code) = &pre.children[0] else {
            panic!("expected code");
        };
        assert_eq!(
            code.props["className"],
            PropValue::Literal("language-rust".to_string())
        );
    }

    #[test]
    fn test_markdown_mode_keeps_html() {
        let compiler = MdxCompiler::default();
        let input = CompileInput {
            body: "<Chart />\n\nA [link][ref].\n\n[ref]: https://example.com\n",
            mode: SourceMode::Markdown,
            layout: None,
        };
        let bundle = compiler.compile(&input).unwrap();
        assert!(bundle.components.is_empty());
        let tree = bundle.tree().unwrap();
        assert!(matches!(&tree.children()[0], BundleNode::Raw { html } if html == "<Chart />"));

        let BundleNode::Element(p) = &tree.children()[1] else {
            panic!("expected paragraph");
        };
        let BundleNode::Element(a) = &p.children[1] else {
            panic!("expected link");
        };
        assert_eq!(
            a.props["href"],
            PropValue::Literal("https://example.com".to_string())
        );
    }

    #[test]
    fn test_compile_post_reports_file_lines() {
        let source = "---\ntitle: Hi\ndate: 2023-01-01\n---\n\n<Chart />\n";
        let post = PostRecord::from_source(
            source,
            Path::new("/data/blog/hi.mdx"),
            Path::new("hi.mdx"),
            "blog/hi.mdx".to_string(),
            200,
        )
        .unwrap();
        let err = MdxCompiler::default().compile_post(&post).unwrap_err();
        assert_eq!(err.location(), Some(SourceLocation::new(6, 1)));
    }
}
