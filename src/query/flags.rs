//! Flag validator: normalizes short search flags and autocorrects aliases.

/// Canonical search flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchFlag {
    /// case-insensitive
    Ci,
    /// regex mode
    Rx,
    /// invert match
    Iv,
    /// word boundary
    Wb,
    /// exclude tests
    Nt,
    /// exclude comments
    Nc,
}

impl SearchFlag {
    pub const ALL: [SearchFlag; 6] = [
        Self::Ci,
        Self::Rx,
        Self::Iv,
        Self::Wb,
        Self::Nt,
        Self::Nc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ci => "ci",
            Self::Rx => "rx",
            Self::Iv => "iv",
            Self::Wb => "wb",
            Self::Nt => "nt",
            Self::Nc => "nc",
        }
    }
}

/// Common mistakes → canonical flag.
const FLAG_ALIASES: &[(&str, SearchFlag)] = &[
    ("regex", SearchFlag::Rx),
    ("re", SearchFlag::Rx),
    ("r", SearchFlag::Rx),
    ("i", SearchFlag::Ci),
    ("icase", SearchFlag::Ci),
    ("ignorecase", SearchFlag::Ci),
    ("case", SearchFlag::Ci),
    ("v", SearchFlag::Iv),
    ("invert", SearchFlag::Iv),
    ("w", SearchFlag::Wb),
    ("word", SearchFlag::Wb),
    ("boundary", SearchFlag::Wb),
    ("notests", SearchFlag::Nt),
    ("no-tests", SearchFlag::Nt),
    ("notest", SearchFlag::Nt),
    ("nocomments", SearchFlag::Nc),
    ("no-comments", SearchFlag::Nc),
    ("nocomment", SearchFlag::Nc),
];

#[derive(Debug, Default)]
pub struct FlagParse {
    /// Canonical flags in first-seen order, deduplicated.
    pub flags: Vec<SearchFlag>,
    pub warnings: Vec<String>,
}

impl FlagParse {
    pub fn has(&self, flag: SearchFlag) -> bool {
        self.flags.contains(&flag)
    }
}

fn valid_flags_hint() -> String {
    SearchFlag::ALL
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a comma-separated flag string. Aliases autocorrect with a warning;
/// unknown flags drop with a warning; duplicates deduplicate silently.
pub fn parse_flags(input: &str) -> FlagParse {
    let mut parse = FlagParse::default();

    for part in input.split(',') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            continue;
        }

        let canonical = SearchFlag::ALL.iter().find(|f| f.as_str() == part).copied();
        let flag = match canonical {
            Some(f) => f,
            None => match FLAG_ALIASES.iter().find(|(a, _)| *a == part) {
                Some((_, f)) => {
                    parse.warnings.push(format!(
                        "flag '{}' autocorrected to '{}'",
                        part,
                        f.as_str()
                    ));
                    *f
                }
                None => {
                    parse.warnings.push(format!(
                        "unknown flag '{}' dropped; valid flags: {}",
                        part,
                        valid_flags_hint()
                    ));
                    continue;
                }
            },
        };

        if !parse.flags.contains(&flag) {
            parse.flags.push(flag);
        }
    }
    parse
}
