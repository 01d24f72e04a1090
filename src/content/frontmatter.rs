//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ParseError;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// A post timestamp, always in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostDate(DateTime<Utc>);

impl PostDate {
    pub fn parse(s: &str) -> Option<Self> {
        parse_date_string(s).map(Self)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for PostDate {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.0.time();
        if t.hour() == 0 && t.minute() == 0 && t.second() == 0 && t.nanosecond() == 0 {
            write!(f, "{}", self.0.format("%Y-%m-%d"))
        } else {
            f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
    }
}

impl Serialize for PostDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Front matter exactly as written, before required fields are checked
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFrontMatter {
    title: Option<String>,
    date: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    tags: Vec<String>,
    draft: bool,
    summary: Option<String>,
    #[serde(alias = "lastMod")]
    lastmod: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    images: Vec<String>,
    #[serde(rename = "canonicalUrl")]
    canonical_url: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    authors: Vec<String>,
    layout: Option<String>,
    #[serde(flatten)]
    extra: IndexMap<String, serde_yaml::Value>,
}

/// Front-matter data from a post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    pub title: String,
    pub date: PostDate,
    pub tags: Vec<String>,
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<PostDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Layout name, resolved by the compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// The text following the front-matter block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body<'a> {
    pub text: &'a str,
    /// 1-based line of the file where the body starts
    pub line: usize,
}

impl Body<'_> {
    /// Number of file lines that precede the body
    pub fn line_offset(&self) -> usize {
        self.line - 1
    }
}

impl FrontMatter {
    /// Minimal front matter with the required fields
    pub fn new(title: impl Into<String>, date: PostDate) -> Self {
        Self {
            title: title.into(),
            date,
            tags: Vec::new(),
            draft: false,
            summary: None,
            lastmod: None,
            images: Vec::new(),
            canonical_url: None,
            authors: Vec::new(),
            layout: None,
            extra: IndexMap::new(),
        }
    }

    /// Split a content file into front matter and body
    pub fn parse(content: &str) -> Result<(Self, Body<'_>), ParseError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut lines = content.split_inclusive('\n');
        let mut pos = 0;
        let mut line_no = 0;

        // Opening delimiter, after any blank lines
        let opening = loop {
            let Some(line) = lines.next() else {
                return Err(ParseError::MissingFrontMatter);
            };
            line_no += 1;
            pos += line.len();
            if !line.trim().is_empty() {
                break line;
            }
        };
        if !is_delimiter(opening) {
            return Err(ParseError::MissingFrontMatter);
        }
        let opening_line = line_no;
        let yaml_start = pos;

        let (yaml_end, body_start) = loop {
            let Some(line) = lines.next() else {
                return Err(ParseError::Unterminated(opening_line));
            };
            line_no += 1;
            if is_delimiter(line) {
                break (pos, pos + line.len());
            }
            pos += line.len();
        };

        let yaml = &content[yaml_start..yaml_end];
        let body = Body {
            text: &content[body_start..],
            line: line_no + 1,
        };

        if yaml.trim().is_empty() {
            return Err(ParseError::MissingField("title"));
        }

        let raw: RawFrontMatter = serde_yaml::from_str(yaml).map_err(|e| ParseError::Yaml {
            line: e
                .location()
                .map(|l| opening_line + l.line())
                .unwrap_or(opening_line),
            message: e.to_string(),
        })?;

        Ok((Self::from_raw(raw)?, body))
    }

    fn from_raw(raw: RawFrontMatter) -> Result<Self, ParseError> {
        let title = raw
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(ParseError::MissingField("title"))?;
        let date = raw.date.ok_or(ParseError::MissingField("date"))?;
        let date = PostDate::parse(&date).ok_or(ParseError::InvalidDate {
            field: "date",
            value: date,
        })?;
        let lastmod = match raw.lastmod {
            Some(value) => Some(PostDate::parse(&value).ok_or(ParseError::InvalidDate {
                field: "lastmod",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            title,
            date,
            tags: raw.tags,
            draft: raw.draft,
            summary: raw.summary,
            lastmod,
            images: raw.images,
            canonical_url: raw.canonical_url,
            authors: raw.authors,
            layout: raw.layout,
            extra: raw.extra,
        })
    }

    /// Serialize into a `---` delimited YAML block
    pub fn to_block(&self) -> Result<String, ParseError> {
        let yaml = serde_yaml::to_string(self).map_err(|e| ParseError::Serialize(e.to_string()))?;
        Ok(format!("---\n{}---\n", yaml))
    }

    /// Last modification date, falling back to the publish date
    pub fn modified(&self) -> PostDate {
        self.lastmod.unwrap_or(self.date)
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Parse a date string in various formats, interpreting naive values as UTC
fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - Dev Log
summary: A first post
---

This is the content.
"#;

        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "Hello World");
        assert_eq!(fm.tags, vec!["rust", "Dev Log"]);
        assert_eq!(fm.summary.as_deref(), Some("A first post"));
        assert!(!fm.draft);
        assert_eq!(fm.date.to_string(), "2024-01-15T10:30:00Z");
        assert!(body.text.contains("This is the content."));
        assert_eq!(body.line, 9);
    }

    #[test]
    fn test_defaults_for_absent_fields() {
        let content = "---\ntitle: Hello\ndate: 2023-01-01\n---\nbody";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert!(fm.tags.is_empty());
        assert!(!fm.draft);
        assert!(fm.images.is_empty());
        assert!(fm.authors.is_empty());
        assert_eq!(fm.layout, None);
        assert_eq!(fm.modified(), fm.date);
        assert_eq!(body.text, "body");
    }

    #[test]
    fn test_parse_single_string_lists() {
        let content = r#"---
title: Single Tag Post
date: 2024/01/15
tags: Notes
images: /static/banner.png
authors: default
canonicalUrl: https://elsewhere.example/post
layout: PostSimple
---
"#;

        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.tags, vec!["Notes"]);
        assert_eq!(fm.images, vec!["/static/banner.png"]);
        assert_eq!(fm.authors, vec!["default"]);
        assert_eq!(
            fm.canonical_url.as_deref(),
            Some("https://elsewhere.example/post")
        );
        assert_eq!(fm.layout.as_deref(), Some("PostSimple"));
        assert_eq!(fm.date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_extra_fields_are_kept() {
        let content = "---\ntitle: Hi\ndate: 2023-01-01\nseries: intro\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(
            fm.extra.get("series"),
            Some(&serde_yaml::Value::String("intro".to_string()))
        );
    }

    #[test]
    fn test_missing_title_is_error() {
        let content = "---\ndate: 2023-01-01\n---\nbody";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("title")));
    }

    #[test]
    fn test_missing_date_is_error() {
        let content = "---\ntitle: Hello\n---\nbody";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("date")));
    }

    #[test]
    fn test_invalid_date_is_error() {
        let content = "---\ntitle: Hello\ndate: yesterday\n---\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDate { field: "date", .. }));
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let content = "---\ntitle: Hello\ndate: 2023-01-01\n\nNo closing delimiter.\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::Unterminated(1)));
    }

    #[test]
    fn test_non_scalar_title_is_error() {
        let content = "---\ntitle:\n  - a\n  - b\ndate: 2023-01-01\n---\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::Yaml { .. }));
    }

    #[test]
    fn test_markdown_without_frontmatter() {
        let content = "# Just a heading\n\n---\n\nSome text.\n";
        let err = FrontMatter::parse(content).unwrap_err();
        assert!(matches!(err, ParseError::MissingFrontMatter));
    }

    #[test]
    fn test_leading_blank_lines_and_bom() {
        let content = "\u{feff}\n\n---\ntitle: Hello\ndate: 2023-01-01\n---\nText";
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "Hello");
        assert_eq!(body.line, 7);
        assert_eq!(body.line_offset(), 6);
    }

    #[test]
    fn test_round_trip_through_block() {
        let mut fm = FrontMatter::new("Round Trip", PostDate::parse("2023-05-04").unwrap());
        fm.tags = vec!["Dev Log".to_string(), "rust".to_string()];
        fm.draft = true;
        fm.summary = Some("Summary: with a colon".to_string());
        fm.lastmod = PostDate::parse("2023-06-01T08:15:00Z");
        fm.images = vec!["/static/a.png".to_string()];
        fm.canonical_url = Some("https://example.com/x".to_string());
        fm.authors = vec!["default".to_string()];
        fm.layout = Some("PostSimple".to_string());
        fm.extra
            .insert("series".to_string(), serde_yaml::Value::from("intro"));

        let text = format!("{}\nBody text\n", fm.to_block().unwrap());
        let (parsed, body) = FrontMatter::parse(&text).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(body.text.trim(), "Body text");
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(PostDate::parse("2024-01-15").is_some());
        assert!(PostDate::parse("2024/01/15 09:00").is_some());
        assert!(PostDate::parse("2024-01-15T09:00:00.250").is_some());
        assert_eq!(
            PostDate::parse("2024-01-15T09:00:00+02:00").unwrap().to_string(),
            "2024-01-15T07:00:00Z"
        );
        assert!(PostDate::parse("15.01.2024").is_none());
    }
}
