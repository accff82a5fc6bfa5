//! Trigram store: lowercased trigram → line postings for substring search.

use std::collections::HashMap;

use super::symbols::FileId;

/// A line location inside the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    pub file_id: FileId,
    /// 1-based line number.
    pub line: u32,
}

/// Generate the lowercased character trigrams of a string.
pub fn generate_trigrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    if chars.len() < 3 {
        return Vec::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Inverted trigram index over indexed file lines. Candidate lookups return
/// a superset of true matches; callers verify against the actual line text.
#[derive(Debug, Default)]
pub struct TrigramStore {
    postings: HashMap<String, Vec<LineRef>>,
    total_lines: u64,
}

impl TrigramStore {
    /// Index one line of a file.
    pub fn add_line(&mut self, file_id: FileId, line: u32, text: &str) {
        self.total_lines += 1;
        let mut seen = std::collections::HashSet::new();
        for tri in generate_trigrams(text) {
            if seen.insert(tri.clone()) {
                let refs = self.postings.entry(tri).or_default();
                // add_line is called in (file, line) order, so postings stay sorted
                refs.push(LineRef { file_id, line });
            }
        }
    }

    /// Candidate lines for a literal pattern: the intersection of the
    /// pattern's trigram posting lists, rarest first. Patterns shorter than
    /// three characters have no trigrams; callers must fall back to a scan.
    pub fn candidates(&self, pattern: &str) -> Option<Vec<LineRef>> {
        let tris = generate_trigrams(pattern);
        if tris.is_empty() {
            return None;
        }

        let mut lists: Vec<&Vec<LineRef>> = Vec::with_capacity(tris.len());
        for tri in &tris {
            match self.postings.get(tri) {
                Some(list) => lists.push(list),
                // A missing trigram means no line can contain the pattern.
                None => return Some(Vec::new()),
            }
        }
        lists.sort_by_key(|l| l.len());

        let mut result: Vec<LineRef> = lists[0].clone();
        for list in &lists[1..] {
            let set: std::collections::HashSet<LineRef> = list.iter().copied().collect();
            result.retain(|r| set.contains(r));
            if result.is_empty() {
                break;
            }
        }
        Some(result)
    }

    pub fn trigram_count(&self) -> usize {
        self.postings.len()
    }

    pub fn line_count(&self) -> u64 {
        self.total_lines
    }
}
