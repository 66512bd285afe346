//! Identifier sanitization for XML `id` attributes

/// Sanitizes a string for use as an XML id.
///
/// ASCII letters, digits, `-` and `_` are kept, spaces become `_`, and
/// everything else is dropped. An empty result falls back to `"file"`.
pub fn sanitize_id(s: &str) -> String {
    let result: String = s
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();

    if result.is_empty() {
        "file".to_string()
    } else {
        result
    }
}
