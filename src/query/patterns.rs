//! Pattern classifier: detects regex-shaped patterns.
//!
//! Only drives the fallback pass in the orchestrator — a pattern that looks
//! like a regex is never rejected, it just earns a second search with regex
//! mode on.

/// Heuristic: does this pattern look like it was meant as a regex?
pub fn looks_like_regex(pattern: &str) -> bool {
    if pattern.contains('|') {
        return true;
    }
    if has_bracket_class(pattern) {
        return true;
    }
    if pattern.starts_with('^') || pattern.ends_with('$') {
        return true;
    }
    if has_meta_escape(pattern) {
        return true;
    }
    if pattern.contains(".+") || pattern.contains(".*") || pattern.contains(".?") {
        return true;
    }
    if pattern.contains("(?") {
        return true;
    }
    if has_brace_quantifier(pattern) {
        return true;
    }
    false
}

fn has_bracket_class(pattern: &str) -> bool {
    let open = match pattern.find('[') {
        Some(i) => i,
        None => return false,
    };
    pattern[open + 1..].contains(']')
}

/// A backslash escaping a regex metacharacter, e.g. `\d`, `\w`, `\.`.
fn has_meta_escape(pattern: &str) -> bool {
    let metas = [
        'd', 'D', 'w', 'W', 's', 'S', 'b', 'B', '.', '*', '+', '?', '(', ')', '[', ']', '{', '}',
        '|', '^', '$', '\\',
    ];
    let chars: Vec<char> = pattern.chars().collect();
    chars
        .windows(2)
        .any(|w| w[0] == '\\' && metas.contains(&w[1]))
}

/// `{n}`, `{n,}`, `{n,m}` with a numeric body.
fn has_brace_quantifier(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(close) = pattern[i + 1..].find('}') {
                let body = &pattern[i + 1..i + 1 + close];
                if !body.is_empty()
                    && body
                        .chars()
                        .all(|c| c.is_ascii_digit() || c == ',')
                    && body.chars().next().is_some_and(|c| c.is_ascii_digit())
                {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}
