//! File-content store: path table plus full line content for context windows.

use super::symbols::FileId;

/// In-memory file table. Paths are stored with forward slashes relative to
/// the index root.
#[derive(Debug, Default)]
pub struct FileStore {
    paths: Vec<String>,
    lines: Vec<Vec<String>>,
}

impl FileStore {
    pub fn add(&mut self, path: String, content: &str) -> FileId {
        let id = self.paths.len() as FileId;
        self.paths.push(path);
        self.lines
            .push(content.lines().map(|l| l.to_string()).collect());
        id
    }

    pub fn path(&self, id: FileId) -> Option<&str> {
        self.paths.get(id as usize).map(String::as_str)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// All lines of a file, or an empty slice for an unknown id.
    pub fn lines(&self, id: FileId) -> &[String] {
        self.lines
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A single line by 1-based number.
    pub fn line(&self, id: FileId, line: u32) -> Option<&str> {
        self.lines(id)
            .get((line as usize).checked_sub(1)?)
            .map(String::as_str)
    }

    /// Context window around a 1-based line: up to `before` lines above and
    /// `after` lines below, clipped at file boundaries.
    pub fn context(&self, id: FileId, line: u32, before: usize, after: usize) -> Vec<String> {
        let all = self.lines(id);
        if all.is_empty() || line == 0 {
            return Vec::new();
        }
        let idx = (line as usize - 1).min(all.len() - 1);
        let start = idx.saturating_sub(before);
        let end = (idx + after).min(all.len() - 1);
        all[start..=end].to_vec()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
