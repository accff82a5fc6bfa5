//! Directory scanner: builds a full `CodeIndex` generation from source files.
//!
//! Extraction is line-oriented and heuristic on purpose — AST parsing is an
//! external collaborator. The scanner fills the same stores a richer indexer
//! would, so the query engine never knows the difference.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::insight::domain;

use super::annotations::{classify_effects, SemanticLabel};
use super::refs::RefKind;
use super::symbols::{EnhancedSymbol, FileId, SymbolKind};
use super::CodeIndex;

/// Extensions indexed when the caller does not narrow the set.
pub const DEFAULT_EXTENSIONS: &[&str] =
    &["rs", "go", "py", "js", "ts", "tsx", "cs", "java", "kt", "rb"];

/// Files above this size are skipped (generated bundles, vendored blobs).
const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub dir: String,
    /// Lowercased extensions without dots; empty means `DEFAULT_EXTENSIONS`.
    pub extensions: Vec<String>,
    pub include_hidden: bool,
}

impl ScanConfig {
    pub fn new(dir: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions: Vec::new(),
            include_hidden: false,
        }
    }

    fn wants(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.contains(&ext.as_str())
        } else {
            self.extensions.iter().any(|e| *e == ext)
        }
    }
}

// ─── File collection (scanning phase) ────────────────────────────────

/// Enumerate the files a full index build will read, honoring .gitignore.
pub fn collect_files(config: &ScanConfig) -> Result<Vec<PathBuf>, LciError> {
    let root = Path::new(&config.dir);
    if !root.is_dir() {
        return Err(LciError::IndexUnavailable(format!(
            "directory does not exist: {}",
            config.dir
        )));
    }

    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(!config.include_hidden)
        .build();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_some_and(|t| t.is_file()) && config.wants(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

// ─── Symbol extraction patterns ──────────────────────────────────────

struct KindPattern {
    regex: Regex,
    kind: SymbolKind,
}

fn kind_patterns() -> &'static [KindPattern] {
    static PATTERNS: OnceLock<Vec<KindPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: &[(&str, SymbolKind)] = &[
            // Rust / Go / Python style functions
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_]\w*)", SymbolKind::Function),
            (r"^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)", SymbolKind::Function),
            (r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)", SymbolKind::Function),
            (r"^\s*(?:export\s+)?(?:async\s+)?function\s+([A-Za-z_$]\w*)", SymbolKind::Function),
            // Containers
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+([A-Za-z_]\w*)", SymbolKind::Struct),
            (r"^type\s+([A-Za-z_]\w*)\s+struct\b", SymbolKind::Struct),
            (r"^\s*(?:export\s+)?(?:public\s+|internal\s+|abstract\s+|sealed\s+|partial\s+)*class\s+([A-Za-z_]\w*)", SymbolKind::Class),
            (r"^\s*(?:export\s+)?(?:public\s+)?interface\s+([A-Za-z_]\w*)", SymbolKind::Interface),
            (r"^type\s+([A-Za-z_]\w*)\s+interface\b", SymbolKind::Interface),
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+([A-Za-z_]\w*)", SymbolKind::Trait),
            (r"^\s*impl(?:\s*<[^>]*>)?\s+(?:[A-Za-z_][\w:]*\s+for\s+)?([A-Za-z_]\w*)", SymbolKind::Impl),
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:export\s+)?enum\s+([A-Za-z_]\w*)", SymbolKind::Enum),
            (r"^\s*(?:public\s+)?record\s+([A-Za-z_]\w*)", SymbolKind::Record),
            // Modules and namespaces
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)\s*[;{]", SymbolKind::Module),
            (r"^\s*namespace\s+([A-Za-z_][\w.]*)", SymbolKind::Namespace),
            // Values
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+([A-Z_][A-Z0-9_]*)\s*[:=]", SymbolKind::Constant),
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?static\s+([A-Z_][A-Z0-9_]*)\s*:", SymbolKind::Constant),
            (r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$]\w*)\s*=", SymbolKind::Variable),
            // Type aliases
            (r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+([A-Za-z_]\w*)\s*=", SymbolKind::Type),
        ];
        table
            .iter()
            .map(|(pat, kind)| KindPattern {
                regex: Regex::new(pat).expect("static pattern"),
                kind: *kind,
            })
            .collect()
    })
}

/// Branch tokens counted toward cyclomatic complexity.
fn branch_weight(line: &str) -> u16 {
    static BRANCH: OnceLock<Regex> = OnceLock::new();
    let re = BRANCH.get_or_init(|| {
        Regex::new(r"\b(if|else if|elif|for|while|case|when|catch|match)\b|&&|\|\|")
            .expect("static pattern")
    });
    re.find_iter(line).count() as u16
}

fn is_exported(line: &str, name: &str, ext: &str) -> bool {
    let trimmed = line.trim_start();
    match ext {
        "go" => name.chars().next().is_some_and(|c| c.is_uppercase()),
        "py" => !name.starts_with('_'),
        "rs" => trimmed.starts_with("pub"),
        _ => {
            trimmed.starts_with("export")
                || trimmed.starts_with("public")
                || trimmed.starts_with("pub")
        }
    }
}

struct RawSymbol {
    name: String,
    kind: SymbolKind,
    line: u32,
    column: u32,
    signature: String,
    exported: bool,
    complexity: u16,
}

/// Extract symbols from one file's lines.
fn extract_symbols(lines: &[String], ext: &str) -> Vec<RawSymbol> {
    let mut raw: Vec<RawSymbol> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if super::is_comment_line(line) {
            continue;
        }
        for kp in kind_patterns() {
            if let Some(caps) = kp.regex.captures(line) {
                let m = caps.get(1).expect("capture group 1");
                raw.push(RawSymbol {
                    name: m.as_str().to_string(),
                    kind: kp.kind,
                    line: i as u32 + 1,
                    column: m.start() as u32 + 1,
                    signature: line.trim().to_string(),
                    exported: is_exported(line, m.as_str(), ext),
                    complexity: 1,
                });
                break; // first pattern wins per line
            }
        }
    }

    // Attribute branch tokens to the innermost preceding callable.
    for (i, line) in lines.iter().enumerate() {
        let weight = branch_weight(line);
        if weight == 0 {
            continue;
        }
        let line_no = i as u32 + 1;
        if let Some(owner) = raw
            .iter_mut()
            .rev()
            .find(|s| s.kind.is_callable() && s.line <= line_no)
        {
            owner.complexity += weight;
        }
    }

    raw
}

// ─── Index build (indexing phase) ────────────────────────────────────

/// Build a complete index generation from the collected files.
pub fn build_index(
    config: &ScanConfig,
    files: &[PathBuf],
    cancel: &CancelToken,
) -> Result<CodeIndex, LciError> {
    let root = Path::new(&config.dir);
    let mut index = CodeIndex::empty(config.dir.clone());

    // Pass 1: file content, symbols, trigrams.
    for path in files {
        cancel.check()?;

        let meta = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };
        if meta.len() > MAX_FILE_BYTES {
            debug!(path = %path.display(), bytes = meta.len(), "Skipping oversized file");
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes);

        let rel = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let file_id: FileId = index.files.add(rel, &content);
        let lines = index.files.lines(file_id).to_vec();

        for (i, text) in lines.iter().enumerate() {
            index.trigrams.add_line(file_id, i as u32 + 1, text);
        }

        for raw in extract_symbols(&lines, &ext) {
            index.symbols.insert(EnhancedSymbol {
                name: raw.name,
                kind: raw.kind,
                file_id,
                line: raw.line,
                column: raw.column,
                signature: Some(raw.signature),
                exported: raw.exported,
                complexity: raw.complexity,
            });
        }
    }

    // Pass 2: call references. A token that names a known symbol and is
    // followed by `(` on the line becomes a call edge from the enclosing
    // callable.
    link_references(&mut index, cancel)?;

    // Pass 3: semantic labels and purity.
    annotate_symbols(&mut index);

    index.generation = 1;
    Ok(index)
}

fn link_references(index: &mut CodeIndex, cancel: &CancelToken) -> Result<(), LciError> {
    static CALL: OnceLock<Regex> = OnceLock::new();
    let call_re = CALL.get_or_init(|| Regex::new(r"([A-Za-z_]\w*)\s*\(").expect("static pattern"));

    let mut edges: Vec<(u32, u32, RefKind)> = Vec::new();

    for file_id in 0..index.files.len() as FileId {
        cancel.check()?;
        for (i, line) in index.files.lines(file_id).iter().enumerate() {
            if super::is_comment_line(line) {
                continue;
            }
            let line_no = i as u32 + 1;
            let Some(source) = index.symbols.enclosing(file_id, line_no) else {
                continue;
            };
            for caps in call_re.captures_iter(line) {
                let name = &caps[1];
                // Bound fan-out per call site to tame common names.
                for &target in index.symbols.by_name(name).iter().take(4) {
                    let is_self_def = index
                        .symbols
                        .get(target)
                        .is_some_and(|s| s.file_id == file_id && s.line == line_no);
                    if target != source && !is_self_def {
                        edges.push((source, target, RefKind::Call));
                    }
                }
            }
        }
    }

    for (source, target, kind) in edges {
        index.refs.add(source, target, kind);
    }
    Ok(())
}

fn annotate_symbols(index: &mut CodeIndex) {
    let mut labels: Vec<(u32, SemanticLabel)> = Vec::new();
    let mut effects: Vec<(u32, Vec<super::annotations::EffectCategory>)> = Vec::new();

    for (ordinal, symbol) in index.symbols.iter() {
        let words = lci::split_identifier(&symbol.name);

        for hit in domain::classify_words(&words) {
            labels.push((
                ordinal,
                SemanticLabel {
                    label: hit.term,
                    category: hit.domain.to_string(),
                    strength: hit.weight,
                    propagated: false,
                },
            ));
        }

        if symbol.kind.is_callable() {
            let cats = classify_effects(&words, symbol.signature.as_deref());
            if !cats.is_empty() {
                effects.push((ordinal, cats));
            }
        }
    }

    for (ordinal, label) in labels {
        index.annotations.add_label(ordinal, label);
    }
    for (ordinal, cats) in effects {
        index.annotations.set_effects(ordinal, cats);
    }

    index.annotations.propagate_effects(&index.refs);
    index.annotations.propagate_labels(&index.refs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn scan_fixture() -> (tempfile::TempDir, CodeIndex) {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "src/auth.rs",
            "pub struct AuthToken {\n    secret: String,\n}\n\npub fn login_user(name: &str) -> AuthToken {\n    if name.is_empty() {\n        panic!();\n    }\n    hash_password(name);\n    AuthToken { secret: name.to_string() }\n}\n\nfn hash_password(input: &str) {\n    let _ = input;\n}\n",
        );
        write_file(
            tmp.path(),
            "src/report.py",
            "def write_report(data):\n    if data:\n        print(data)\n",
        );
        let config = ScanConfig::new(tmp.path().to_string_lossy().to_string());
        let files = collect_files(&config).unwrap();
        let index = build_index(&config, &files, &CancelToken::new()).unwrap();
        (tmp, index)
    }

    #[test]
    fn test_scan_extracts_symbols() {
        let (_tmp, index) = scan_fixture();
        assert_eq!(index.files.len(), 2);
        assert!(!index.symbols.by_name("login_user").is_empty());
        assert!(!index.symbols.by_name("AuthToken").is_empty());
        assert!(!index.symbols.by_name("write_report").is_empty());
    }

    #[test]
    fn test_scan_marks_generation_ready() {
        let (_tmp, index) = scan_fixture();
        assert!(index.is_ready());
        assert_eq!(index.generation, 1);
    }

    #[test]
    fn test_exported_heuristics() {
        let (_tmp, index) = scan_fixture();
        let login = index.symbols.by_name("login_user")[0];
        let hash = index.symbols.by_name("hash_password")[0];
        assert!(index.symbols.get(login).unwrap().exported);
        assert!(!index.symbols.get(hash).unwrap().exported);
    }

    #[test]
    fn test_complexity_counts_branches() {
        let (_tmp, index) = scan_fixture();
        let login = index.symbols.by_name("login_user")[0];
        // base 1 + the `if` branch
        assert!(index.symbols.get(login).unwrap().complexity >= 2);
    }

    #[test]
    fn test_call_edge_recorded() {
        let (_tmp, index) = scan_fixture();
        let login = index.symbols.by_name("login_user")[0];
        let hash = index.symbols.by_name("hash_password")[0];
        assert!(index
            .refs
            .outgoing(login)
            .any(|e| e.target == hash && e.kind == RefKind::Call));
    }

    #[test]
    fn test_auth_vocabulary_labeled() {
        let (_tmp, index) = scan_fixture();
        let hash = index.symbols.by_name("hash_password")[0];
        let labels = index.annotations.labels(hash);
        assert!(
            labels.iter().any(|l| l.category == "Authentication"),
            "expected Authentication label, got {:?}",
            labels
        );
    }

    #[test]
    fn test_io_effect_detected_and_propagated() {
        let (_tmp, index) = scan_fixture();
        let report = index.symbols.by_name("write_report")[0];
        assert!(!index.annotations.is_pure(report));
    }

    #[test]
    fn test_extension_filter() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(tmp.path(), "a.rs", "fn x() {}\n");
        write_file(tmp.path(), "b.md", "# not code\n");
        let config = ScanConfig::new(tmp.path().to_string_lossy().to_string());
        let files = collect_files(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().ends_with("a.rs"));
    }

    #[test]
    fn test_missing_dir_is_unavailable() {
        let config = ScanConfig::new("/definitely/not/here");
        assert!(matches!(
            collect_files(&config),
            Err(LciError::IndexUnavailable(_))
        ));
    }
}
