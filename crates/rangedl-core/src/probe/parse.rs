//! Parse HEAD response header lines.

/// Metadata of the final HEAD response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// Total size in bytes, if a non-negative `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Parse collected header lines (status line included) into `HeadInfo`.
pub(crate) fn parse_headers(lines: &[String]) -> HeadInfo {
    let mut info = HeadInfo::default();
    for line in lines {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            info.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            info.accept_ranges = value.eq_ignore_ascii_case("bytes");
        }
    }
    info
}
