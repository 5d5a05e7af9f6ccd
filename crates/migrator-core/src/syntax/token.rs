//! Tokens, trivia and source spans.

use serde::Serialize;
use std::fmt;

/// Byte range of a node or token in the text it was parsed from.
///
/// Spans exclude leading and trailing trivia. Nodes synthesized by edits
/// have no span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: &TextSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn cover(self, other: TextSpan) -> TextSpan {
        TextSpan::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// Formatting metadata attached to a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    Whitespace(String),
    EndOfLine(String),
    Comment(String),
    Directive(String),
}

impl Trivia {
    pub fn space() -> Self {
        Trivia::Whitespace(" ".to_string())
    }

    pub fn whitespace(text: impl Into<String>) -> Self {
        Trivia::Whitespace(text.into())
    }

    pub fn newline() -> Self {
        Trivia::EndOfLine("\n".to_string())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Trivia::Comment(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Trivia::Whitespace(s) | Trivia::EndOfLine(s) | Trivia::Comment(s) | Trivia::Directive(s) => s,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self, Trivia::Whitespace(_))
    }

    pub fn is_end_of_line(&self) -> bool {
        matches!(self, Trivia::EndOfLine(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Trivia::Comment(_) | Trivia::Directive(_))
    }
}

/// Returns the indentation run of a leading trivia list: the whitespace
/// that follows its last end-of-line (or the whole list when it has none).
pub fn indentation(trivia: &[Trivia]) -> Vec<Trivia> {
    let start = trivia
        .iter()
        .rposition(Trivia::is_end_of_line)
        .map(|i| i + 1)
        .unwrap_or(0);
    trivia[start..]
        .iter()
        .filter(|t| t.is_whitespace())
        .cloned()
        .collect()
}

/// Text of the indentation run, for building replacement source.
pub fn indentation_text(trivia: &[Trivia]) -> String {
    indentation(trivia).iter().map(Trivia::text).collect()
}

pub fn ends_with_newline(trivia: &[Trivia]) -> bool {
    trivia.last().is_some_and(Trivia::is_end_of_line)
}

pub fn contains_newline(trivia: &[Trivia]) -> bool {
    trivia.iter().any(Trivia::is_end_of_line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    NumericLiteral,
    StringLiteral,
    InterpolatedString,
    CharLiteral,
    Punctuation,
    EndOfFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    pub kind: TokenKind,
    pub text: String,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
    pub span: Option<TextSpan>,
}

impl SyntaxToken {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            leading: Vec::new(),
            trailing: Vec::new(),
            span: None,
        }
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Keyword, text)
    }

    pub fn punct(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Punctuation, text)
    }

    pub fn with_leading(mut self, trivia: Vec<Trivia>) -> Self {
        self.leading = trivia;
        self
    }

    pub fn with_trailing(mut self, trivia: Vec<Trivia>) -> Self {
        self.trailing = trivia;
        self
    }

    /// True for a word or punctuation token with exactly this text.
    /// Literal tokens never match, so `"async"` the string is not `async`.
    pub fn is(&self, text: &str) -> bool {
        self.text == text
            && matches!(
                self.kind,
                TokenKind::Identifier | TokenKind::Keyword | TokenKind::Punctuation
            )
    }

    pub fn is_word(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::NumericLiteral
                | TokenKind::StringLiteral
                | TokenKind::InterpolatedString
                | TokenKind::CharLiteral
        )
    }

    pub fn full_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + 8);
        self.write_full(&mut out);
        out
    }

    pub(crate) fn write_full(&self, out: &mut String) {
        for t in &self.leading {
            out.push_str(t.text());
        }
        out.push_str(&self.text);
        for t in &self.trailing {
            out.push_str(t.text());
        }
    }
}
