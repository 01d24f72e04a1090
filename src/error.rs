//! Error types for the content pipeline
//!
//! File-level failures (`ParseError`, `CompileError`) are isolated per file and
//! reported at the end of a build. Structural failures (`IndexError::DuplicateSlug`,
//! `FeedError`) abort the build.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A 1-based position in a content file
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Shift a body-relative location into file coordinates
    pub fn offset_lines(self, lines: usize) -> Self {
        Self {
            line: self.line + lines,
            column: self.column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Malformed or incomplete front matter
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("file does not start with a `---` front-matter block")]
    MissingFrontMatter,

    #[error("front-matter block opened on line {0} is never closed")]
    Unterminated(usize),

    #[error("invalid front matter at line {line}: {message}")]
    Yaml { line: usize, message: String },

    #[error("missing required front-matter field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid date: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("failed to serialize front matter: {0}")]
    Serialize(String),
}

/// Why a single content file was left out of the index
#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),

    #[error("failed to scan content directory: {0}")]
    Scan(#[from] walkdir::Error),
}

/// Fatal failures while building the content index
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error("duplicate slug `{slug}`: {first:?} and {second:?}")]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("content worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A post body that could not be compiled into a bundle
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("syntax error at {location}: {reason}")]
    Syntax {
        reason: String,
        location: SourceLocation,
    },

    #[error("unknown component `<{name}>` at {location}")]
    UnknownComponent {
        name: String,
        location: SourceLocation,
    },

    #[error("import/export statements are not supported (at {location}); register the component instead")]
    UnsupportedEsm { location: SourceLocation },

    #[error("unknown layout `{0}`")]
    UnknownLayout(String),

    #[error("failed to serialize bundle: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CompileError {
    /// Location of the error in the compiled source, if it has one
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::Syntax { location, .. }
            | CompileError::UnknownComponent { location, .. }
            | CompileError::UnsupportedEsm { location } => Some(*location),
            _ => None,
        }
    }

    /// Translate body-relative locations into file coordinates
    pub fn offset_lines(self, lines: usize) -> Self {
        match self {
            CompileError::Syntax { reason, location } => CompileError::Syntax {
                reason,
                location: location.offset_lines(lines),
            },
            CompileError::UnknownComponent { name, location } => CompileError::UnknownComponent {
                name,
                location: location.offset_lines(lines),
            },
            CompileError::UnsupportedEsm { location } => CompileError::UnsupportedEsm {
                location: location.offset_lines(lines),
            },
            other => other,
        }
    }
}

/// I/O failure while persisting a feed
#[derive(thiserror::Error, Debug)]
#[error("failed to write feed {path:?}: {source}")]
pub struct FeedWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("rss validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Write(#[from] FeedWriteError),
}

/// A per-file failure reported at the end of a build
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Failures that abort a whole build
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("{path:?}: {source}")]
    Strict {
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("compile worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
