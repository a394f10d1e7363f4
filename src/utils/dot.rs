//! Helpers for Graphviz DOT output.

/// Escape `s` for use inside a double-quoted DOT label.
///
/// Quotes and backslashes are escaped, line breaks become left-aligned DOT line breaks and
/// carriage returns are dropped. Angle brackets and braces are escaped as well, so generic
/// names such as `List<T>` render literally with record-shaped nodes.
///
/// # Examples
///
/// ```rust,ignore
/// use cilflow::utils::escape_dot;
///
/// assert_eq!(escape_dot("List<T>"), "List\\<T\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '"' | '<' | '>' | '{' | '}' | '|' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\l"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}
