//! # lci — Lightning Code Index
//!
//! In-memory semantic code search and analysis engine with a native MCP
//! (Model Context Protocol) stdio server for AI assistants.
//!
//! ## Library usage
//!
//! This crate is primarily an MCP server binary, but the pure core helpers
//! (object-ID codec, identifier splitting, tokenization) are exposed as a
//! library for benchmarking and integration testing.

// ─── Object IDs ──────────────────────────────────────────────────────

/// Base-62 alphabet for object IDs: `A..Z`, `a..z`, `0..9`.
const OBJECT_ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Encode a symbol ordinal as a short base-62 object ID.
///
/// IDs expand bijectively: `0 → "A"`, `61 → "9"`, `62 → "AA"`, so the
/// common case stays at one or two characters even for large indexes.
///
/// # Examples
///
/// ```
/// use lci::encode_object_id;
///
/// assert_eq!(encode_object_id(0), "A");
/// assert_eq!(encode_object_id(61), "9");
/// assert_eq!(encode_object_id(62), "AA");
/// ```
pub fn encode_object_id(ordinal: u32) -> String {
    let mut n = ordinal as u64 + 1; // bijective numbering
    let mut buf = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 62) as usize;
        buf.push(OBJECT_ID_ALPHABET[rem]);
        n = (n - 1) / 62;
    }
    buf.reverse();
    // Alphabet is ASCII, so the bytes are valid UTF-8.
    String::from_utf8(buf).unwrap()
}

/// Decode a base-62 object ID back to its symbol ordinal.
/// Returns `None` for empty input or characters outside the alphabet.
pub fn decode_object_id(id: &str) -> Option<u32> {
    if id.is_empty() || id.len() > 6 {
        return None;
    }
    let mut n: u64 = 0;
    for b in id.bytes() {
        let digit = OBJECT_ID_ALPHABET.iter().position(|&c| c == b)? as u64;
        n = n * 62 + digit + 1;
    }
    u32::try_from(n - 1).ok()
}

// ─── Identifier splitting ────────────────────────────────────────────

/// Split an identifier into lowercase words along camelCase, snake_case,
/// kebab-case, and letter/digit boundaries.
///
/// # Examples
///
/// ```
/// use lci::split_identifier;
///
/// assert_eq!(split_identifier("parseHTTPResponse"), vec!["parse", "http", "response"]);
/// assert_eq!(split_identifier("user_handler"), vec!["user", "handler"]);
/// ```
pub fn split_identifier(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = ident.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if !current.is_empty() {
            let prev = chars[i - 1];
            // lower→Upper boundary (camelCase), or the last upper of an
            // acronym run followed by a lowercase tail (HTTPResponse).
            let camel = prev.is_lowercase() && c.is_uppercase();
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let digit_edge = prev.is_ascii_digit() != c.is_ascii_digit();
            if camel || acronym_end || digit_edge {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.into_iter().map(|w| w.to_lowercase()).collect()
}

// ─── Tokenization ────────────────────────────────────────────────────

/// Tokenize a line of text into lowercase tokens.
///
/// Splits on non-alphanumeric characters (except `_`),
/// filters by minimum length, and lowercases all tokens.
///
/// # Examples
///
/// ```
/// use lci::tokenize;
///
/// let tokens = tokenize("pub fn resolve_symbol(&self)", 2);
/// assert!(tokens.contains(&"resolve_symbol".to_string()));
/// assert!(tokens.contains(&"self".to_string()));
/// ```
pub fn tokenize(line: &str, min_len: usize) -> Vec<String> {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| s.len() >= min_len)
        .map(|s| s.to_lowercase())
        .collect()
}

// ─── Edit distance ───────────────────────────────────────────────────

/// Levenshtein edit distance between two strings (char-wise).
/// Used for fuzzy symbol-type resolution and semantic candidate matching.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// ─── Unit tests ──────────────────────────────────────────────────────


// ─── Property-based tests (proptest) ─────────────────────────────────
