use serde::{Deserialize, Serialize};

/// A half-open character range `[from, to)` in the source text.
///
/// Offsets are character positions, not bytes, because the editor highlights
/// ranges in rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Smallest span covering both inputs.
    pub fn merge(self, other: Span) -> Span {
        Span {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    Dot,
    Semicolon,
    Bang,
    LParen,
    RParen,
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `?=`
    DefaultAssign,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub(super) fn new(kind: TokenKind, from: usize, to: usize) -> Self {
        Self {
            kind,
            span: Span::new(from, to),
        }
    }
}
