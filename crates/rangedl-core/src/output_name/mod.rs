//! Default output filename for a URL.
//!
//! The last non-empty path segment of the URL, made safe for a local
//! filesystem; `download.bin` when nothing usable is left.

mod sanitize;

pub use sanitize::sanitize_file_name;

/// Used when the URL path yields nothing usable.
pub const FALLBACK_NAME: &str = "download.bin";

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}

/// Output filename derived from `url`.
///
/// - `https://example.com/pub/archive.tar.gz` → `archive.tar.gz`
/// - `https://example.com/` → `download.bin`
pub fn default_output_name(url: &str) -> String {
    let name = last_path_segment(url)
        .map(|s| sanitize_file_name(&s))
        .unwrap_or_default();
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}
