//! LCF/1.0 — the line-oriented compact output format for `code_insight`.
//!
//! Layout: a fixed `LCF/1.0` header, a `mode=<m> tier=<n>` line, then
//! sections separated by `---` lines. Each section opens with `== NAME ==`.
//! Empty sections are suppressed entirely.

/// Token-economy limits baked into the format.
pub const MEMORY_SCORES_LIMIT: usize = 5;
pub const HOTSPOTS_LIMIT: usize = 3;

const HEADER: &str = "LCF/1.0";

/// Builder for one LCF payload. Sections are buffered so empty ones can be
/// dropped before assembly.
#[derive(Debug)]
pub struct LcfWriter {
    mode: String,
    tier: u8,
    sections: Vec<(String, Vec<String>)>,
}

impl LcfWriter {
    pub fn new(mode: &str, tier: u8) -> Self {
        Self {
            mode: mode.to_string(),
            tier,
            sections: Vec::new(),
        }
    }

    /// Open a section and return a handle for its lines. If nothing is
    /// written the section never appears in the output.
    pub fn section(&mut self, name: &str) -> SectionWriter<'_> {
        self.sections.push((name.to_uppercase(), Vec::new()));
        SectionWriter { writer: self }
    }

    pub fn finish(self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(&format!("mode={} tier={}\n", self.mode, self.tier));

        let non_empty: Vec<&(String, Vec<String>)> = self
            .sections
            .iter()
            .filter(|(_, lines)| !lines.is_empty())
            .collect();

        for (i, (name, lines)) in non_empty.iter().enumerate() {
            if i > 0 {
                out.push_str("---\n");
            }
            out.push_str(&format!("== {} ==\n", name));
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Writes lines into the most recently opened section.
pub struct SectionWriter<'a> {
    writer: &'a mut LcfWriter,
}

impl SectionWriter<'_> {
    fn lines(&mut self) -> &mut Vec<String> {
        &mut self
            .writer
            .sections
            .last_mut()
            .expect("section opened")
            .1
    }

    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines().push(text.into());
        self
    }

    /// Space-separated `key=value` pairs on one line.
    pub fn kv(&mut self, pairs: &[(&str, String)]) -> &mut Self {
        let line = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        self.lines().push(line);
        self
    }

    /// Enumerated entry: `[severity] type: name (location) oid=<id>`.
    pub fn entry(
        &mut self,
        severity: &str,
        entry_type: &str,
        name: &str,
        location: &str,
        oid: &str,
    ) -> &mut Self {
        self.lines().push(format!(
            "[{}] {}: {} ({}) oid={}",
            severity, entry_type, name, location, oid
        ));
        self
    }
}

/// Format a float the LCF way: two decimals, no trailing zeros beyond that.
pub fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
