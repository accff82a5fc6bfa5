//! Symbol store: enhanced symbol records and their lookup maps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lci::encode_object_id;

/// File identifier, stable for the life of one index generation.
pub type FileId = u32;

/// Symbol ordinal inside one index generation. The wire form is the base-62
/// object ID derived from this ordinal.
pub type SymbolOrdinal = u32;

// ─── Symbol Kind ─────────────────────────────────────────────────────

/// Canonical symbol kinds. Declaration order matters: prefix resolution
/// picks the first canonical kind in this order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Variable,
    Constant,
    Interface,
    Type,
    Struct,
    Module,
    Namespace,
    Property,
    Event,
    Delegate,
    Enum,
    Record,
    Operator,
    Indexer,
    Object,
    Companion,
    Extension,
    Annotation,
    Field,
    EnumMember,
    Trait,
    Impl,
    Constructor,
}

impl SymbolKind {
    /// All canonical kinds in declared order.
    pub const ALL: [SymbolKind; 26] = [
        Self::Function,
        Self::Class,
        Self::Method,
        Self::Variable,
        Self::Constant,
        Self::Interface,
        Self::Type,
        Self::Struct,
        Self::Module,
        Self::Namespace,
        Self::Property,
        Self::Event,
        Self::Delegate,
        Self::Enum,
        Self::Record,
        Self::Operator,
        Self::Indexer,
        Self::Object,
        Self::Companion,
        Self::Extension,
        Self::Annotation,
        Self::Field,
        Self::EnumMember,
        Self::Trait,
        Self::Impl,
        Self::Constructor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Struct => "struct",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Property => "property",
            Self::Event => "event",
            Self::Delegate => "delegate",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Operator => "operator",
            Self::Indexer => "indexer",
            Self::Object => "object",
            Self::Companion => "companion",
            Self::Extension => "extension",
            Self::Annotation => "annotation",
            Self::Field => "field",
            Self::EnumMember => "enum_member",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Constructor => "constructor",
        }
    }

    /// Whether this kind carries a body whose complexity is meaningful.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Constructor)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        SymbolKind::ALL
            .iter()
            .find(|k| k.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown symbol kind: '{}'", s))
    }
}

// ─── Enhanced Symbol ─────────────────────────────────────────────────

/// One indexed symbol. Created during indexing, immutable afterwards,
/// destroyed on full re-index.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnhancedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_id: FileId,
    /// 1-based definition line.
    pub line: u32,
    /// 1-based column of the name on the definition line.
    pub column: u32,
    pub signature: Option<String>,
    pub exported: bool,
    /// Approximate cyclomatic complexity; only meaningful for callable kinds.
    pub complexity: u16,
}

// ─── Symbol Store ────────────────────────────────────────────────────

/// In-memory symbol table with name and file lookup maps.
#[derive(Debug, Default)]
pub struct SymbolStore {
    symbols: Vec<EnhancedSymbol>,
    /// name (lowercased) → ordinals
    name_index: HashMap<String, Vec<SymbolOrdinal>>,
    /// file_id → ordinals (in line order)
    file_index: HashMap<FileId, Vec<SymbolOrdinal>>,
}

impl SymbolStore {
    pub fn insert(&mut self, symbol: EnhancedSymbol) -> SymbolOrdinal {
        let ordinal = self.symbols.len() as SymbolOrdinal;
        self.name_index
            .entry(symbol.name.to_lowercase())
            .or_default()
            .push(ordinal);
        self.file_index
            .entry(symbol.file_id)
            .or_default()
            .push(ordinal);
        self.symbols.push(symbol);
        ordinal
    }

    pub fn get(&self, ordinal: SymbolOrdinal) -> Option<&EnhancedSymbol> {
        self.symbols.get(ordinal as usize)
    }

    /// The wire object ID for an ordinal.
    pub fn object_id(&self, ordinal: SymbolOrdinal) -> String {
        encode_object_id(ordinal)
    }

    /// Ordinals of symbols with the given name (case-insensitive).
    pub fn by_name(&self, name: &str) -> &[SymbolOrdinal] {
        self.name_index
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ordinals of symbols defined in the given file, in line order.
    pub fn in_file(&self, file_id: FileId) -> &[SymbolOrdinal] {
        self.file_index
            .get(&file_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The innermost symbol defined at or before `line` in `file_id`.
    /// Used to attribute call sites and complexity to their function.
    pub fn enclosing(&self, file_id: FileId, line: u32) -> Option<SymbolOrdinal> {
        self.in_file(file_id)
            .iter()
            .rev()
            .find(|&&ord| {
                self.symbols[ord as usize].line <= line
                    && self.symbols[ord as usize].kind.is_callable()
            })
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolOrdinal, &EnhancedSymbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (i as SymbolOrdinal, s))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
