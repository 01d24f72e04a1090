//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Segment characters plus path separators, for names used as directories
const PATH_SEGMENT: &AsciiSet = &SEGMENT.add(b'/').add(b'\\');

/// Join a site URL and a path into an absolute URL
///
/// # Examples
/// ```ignore
/// full_url("https://example.com/", "/blog/hello") // -> "https://example.com/blog/hello"
/// ```
pub fn full_url(site_url: &str, path: &str) -> String {
    let base = site_url.trim_end_matches('/');
    let path = url_path(path);

    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

/// Encode each segment of a `/` separated path, dropping empty segments
pub fn url_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-encode one path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encode a name so it is exactly one file system path component.
///
/// Separators are escaped and a name made only of dots (`.`, `..`) has every
/// dot escaped, so the result can never walk out of its parent directory.
pub fn encode_path_segment(name: &str) -> String {
    if !name.is_empty() && name.bytes().all(|b| b == b'.') {
        return "%2E".repeat(name.len());
    }
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}
