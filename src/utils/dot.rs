//! DOT format utilities for graph visualization.
//!
//! [`crate::ir::Graph::to_dot`] renders each basic block as a box whose label
//! lists the block's nodes, one per line; the helpers here keep those labels
//! valid Graphviz text.

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// This function handles all characters that have special meaning in DOT format,
/// including quotes, backslashes, newlines, braces and angle brackets.
///
/// # Arguments
///
/// * `s` - The string to escape
///
/// # Returns
///
/// A new string with all special characters properly escaped.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::utils::escape_dot;
///
/// let escaped = escape_dot("GetLocal(loc0) -> <phi>");
/// assert_eq!(escaped, "GetLocal(loc0) -\\> \\<phi\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

/// Joins lines into a single left-aligned DOT label.
///
/// Every line is escaped and terminated with `\l`, which Graphviz renders as a
/// left-justified line break.
#[must_use]
pub fn dot_label<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut label = String::new();
    for line in lines {
        label.push_str(&escape_dot(line));
        label.push_str("\\l");
    }
    label
}
