//! String literal emission with escaping and size-limited chunking

/// Longest literal emitted in one piece, in characters
pub const MAX_STRING_CHUNK: usize = 16383;

/// Escape `text` for use inside a Rust string literal.
///
/// Backslashes are doubled before quotes, `\n`, `\r` and NUL are escaped.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\0' => escaped.push_str("\\0"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Split `text` into consecutive pieces of at most `max_chars` characters
pub fn chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (index, _) in text.char_indices() {
        if count == max_chars {
            pieces.push(&text[start..index]);
            start = index;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Rust expression evaluating to `text` as a `String`.
///
/// Short text becomes a single `String::from` call. Longer text is appended to
/// a builder chunk by chunk so that no literal exceeds [`MAX_STRING_CHUNK`].
pub fn string_expression(text: &str) -> String {
    if text.chars().count() <= MAX_STRING_CHUNK {
        return format!("::std::string::String::from(\"{}\")", escape(text));
    }

    let mut expression = format!(
        "{{\n    let mut builder = ::std::string::String::with_capacity({});\n",
        text.len()
    );
    for chunk in chunks(text, MAX_STRING_CHUNK) {
        expression.push_str("    builder.push_str(\"");
        expression.push_str(&escape(chunk));
        expression.push_str("\");\n");
    }
    expression.push_str("    builder\n}");
    expression
}
