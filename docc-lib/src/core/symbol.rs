use std::fmt;

/// The kinds of symbols both tokenizers produce. Not every kind occurs in
/// both languages, e.g. `Label` and `TypeTag` are docasm only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    End,
    Directive,
    Text,
    Literal,
    Label,
    Instruction,
    Punct,
    Timestamp,
    Color,
    Bool,
    Number,
    Signed,
    Float,
    Newline,
    TypeTag,
    FileMark,
    LineMark,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub text: String,
}

impl Symbol {
    pub fn new(kind: SymbolKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn end() -> Self {
        Self::new(SymbolKind::End, "")
    }

    pub fn newline() -> Self {
        Self::new(SymbolKind::Newline, "")
    }

    pub fn punct(c: char) -> Self {
        Self::new(SymbolKind::Punct, c)
    }

    pub fn file_mark(name: &str) -> Self {
        Self::new(SymbolKind::FileMark, name)
    }

    pub fn line_mark(line: usize) -> Self {
        Self::new(SymbolKind::LineMark, line.to_string())
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == SymbolKind::Punct && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SymbolKind::End => write!(f, "end of data"),
            SymbolKind::Newline => write!(f, "line break"),
            SymbolKind::Punct => write!(f, "'{}'", self.text),
            kind => write!(f, "{} '{}'", kind, self.text),
        }
    }
}
