/// Linux NAME_MAX, in bytes.
const NAME_MAX: usize = 255;

fn is_unsafe(c: char) -> bool {
    c == '/' || c == '\\' || c.is_control() || c.is_whitespace()
}

/// Replace separators, control characters and whitespace with a single `_`,
/// trim leading/trailing dots and underscores, and cap the length at NAME_MAX.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_unsafe(c) || c == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
