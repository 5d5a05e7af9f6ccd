//! C# lexer built on nom
//!
//! Produces tokens with their formatting attached the way Roslyn does it:
//! a token's trailing trivia runs up to and including the first line break
//! after it; everything else between two tokens is leading trivia of the
//! second one. The final token is an empty `EndOfFile` token that carries
//! whatever trivia ends the file.
//!
//! # Token grammar
//!
//! ```ebnf
//! token       = identifier | number | string | char | punctuation ;
//! identifier  = ["@"], (letter | "_"), {letter | digit | "_"} ;
//! number      = ("0x" | "0b"), hexdigits, suffix
//!             | digits, [".", digits], [exponent], suffix ;
//! string      = ["$"], ["@"], '"', {char}, '"' | '@$"', {char}, '"' ;
//! trivia      = whitespace | newline | "//" comment | "/*" comment "*/" | "#" directive ;
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, line_ending, not_line_ending, one_of, satisfy},
    combinator::{opt, recognize},
    sequence::{pair, tuple},
};

use super::token::{SyntaxToken, TextSpan, TokenKind, Trivia};
use super::ParseError;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

fn whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == ' ' || c == '\t' || c == '\u{feff}' || c == '\u{0c}')(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn directive(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), not_line_ending))(input)
}

fn end_of_line(input: &str) -> IResult<&str, &str> {
    alt((line_ending, tag("\r")))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('@')),
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    )))(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((
            char('0'),
            one_of("xXbB"),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
            take_while(|c: char| c.is_ascii_alphabetic()),
        ))),
        recognize(tuple((
            digit1,
            take_while(|c: char| c.is_ascii_digit() || c == '_'),
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            take_while(|c: char| c.is_ascii_alphabetic()),
        ))),
    ))(input)
}

/// Scans the body of a quoted literal starting right after its opening
/// quote. Returns the number of bytes consumed including the closing quote.
fn scan_quoted(body: &str, verbatim: bool, interpolated: bool, quote: char) -> Option<usize> {
    let mut chars = body.char_indices().peekable();
    let mut depth = 0usize;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if !verbatim && depth == 0 => {
                chars.next();
            }
            '{' if interpolated => {
                if depth == 0 && chars.peek().is_some_and(|&(_, n)| n == '{') {
                    chars.next();
                } else {
                    depth += 1;
                }
            }
            '}' if interpolated && depth > 0 => depth -= 1,
            '"' if depth > 0 => {
                // nested string inside an interpolation hole
                let rest = &body[i + 1..];
                let len = scan_quoted(rest, false, false, '"')?;
                for _ in 0..rest[..len].chars().count() {
                    chars.next();
                }
            }
            c if c == quote && depth == 0 => {
                if verbatim && chars.peek().is_some_and(|&(_, n)| n == quote) {
                    chars.next();
                } else {
                    return Some(i + c.len_utf8());
                }
            }
            '\n' if !verbatim && depth == 0 => return None,
            _ => {}
        }
    }
    None
}

fn quoted_literal(input: &str) -> IResult<&str, (TokenKind, &str)> {
    let (prefix_len, verbatim, interpolated) = if input.starts_with("$@\"") || input.starts_with("@$\"") {
        (3, true, true)
    } else if input.starts_with("$\"") {
        (2, false, true)
    } else if input.starts_with("@\"") {
        (2, true, false)
    } else if input.starts_with('"') {
        (1, false, false)
    } else {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    };
    let len = scan_quoted(&input[prefix_len..], verbatim, interpolated, '"').ok_or_else(|| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))
    })?;
    let total = prefix_len + len;
    let kind = if interpolated {
        TokenKind::InterpolatedString
    } else {
        TokenKind::StringLiteral
    };
    Ok((&input[total..], (kind, &input[..total])))
}

fn char_literal(input: &str) -> IResult<&str, &str> {
    let body = input.strip_prefix('\'').ok_or_else(|| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))
    })?;
    let len = scan_quoted(body, false, false, '\'').ok_or_else(|| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char))
    })?;
    Ok((&input[1 + len..], &input[..1 + len]))
}

fn punctuation(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("??="),
            tag("<<="),
            tag("=>"),
            tag("=="),
            tag("!="),
            tag("<="),
            tag(">="),
            tag("&&"),
            tag("||"),
            tag("??"),
            tag("?."),
            tag("++"),
            tag("--"),
            tag("+="),
            tag("-="),
            tag("*="),
            tag("/="),
            tag("%="),
            tag("&="),
            tag("|="),
        )),
        alt((tag("^="), tag("::"), tag("->"), tag("<<"), tag(".."))),
        recognize(one_of("{}()[];,.:?+-*/%&|^!~=<>")),
    ))(input)
}

fn token(input: &str) -> IResult<&str, (TokenKind, &str)> {
    if let Ok((rest, text)) = char_literal(input) {
        return Ok((rest, (TokenKind::CharLiteral, text)));
    }
    if input.starts_with('"') || input.starts_with("$\"") || input.starts_with("@\"")
        || input.starts_with("$@\"") || input.starts_with("@$\"")
    {
        return quoted_literal(input);
    }
    if let Ok((rest, text)) = number(input) {
        return Ok((rest, (TokenKind::NumericLiteral, text)));
    }
    if let Ok((rest, text)) = identifier(input) {
        let kind = if is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        return Ok((rest, (kind, text)));
    }
    let (rest, text) = punctuation(input)?;
    Ok((rest, (TokenKind::Punctuation, text)))
}

/// Trivia after a token: same-line whitespace and comments plus the line break.
fn trailing_trivia(mut input: &str) -> (&str, Vec<Trivia>) {
    let mut trivia = Vec::new();
    loop {
        if let Ok((rest, text)) = whitespace(input) {
            trivia.push(Trivia::Whitespace(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = line_comment(input) {
            trivia.push(Trivia::Comment(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = block_comment(input) {
            trivia.push(Trivia::Comment(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = end_of_line(input) {
            trivia.push(Trivia::EndOfLine(text.to_string()));
            return (rest, trivia);
        } else {
            return (input, trivia);
        }
    }
}

fn leading_trivia(mut input: &str) -> (&str, Vec<Trivia>) {
    let mut trivia = Vec::new();
    loop {
        if let Ok((rest, text)) = whitespace(input) {
            trivia.push(Trivia::Whitespace(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = end_of_line(input) {
            trivia.push(Trivia::EndOfLine(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = line_comment(input) {
            trivia.push(Trivia::Comment(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = block_comment(input) {
            trivia.push(Trivia::Comment(text.to_string()));
            input = rest;
        } else if let Ok((rest, text)) = directive(input) {
            trivia.push(Trivia::Directive(text.to_string()));
            input = rest;
        } else {
            return (input, trivia);
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<SyntaxToken>, ParseError> {
    let offset = |rest: &str| source.len() - rest.len();
    let mut tokens = Vec::new();
    let (mut rest, mut leading) = leading_trivia(source);

    while !rest.is_empty() {
        let start = offset(rest);
        let (after, (kind, text)) = token(rest).map_err(|_| ParseError::UnexpectedCharacter {
            offset: start,
            found: rest.chars().next().unwrap_or_default(),
        })?;
        let end = start + text.len();
        let (after, trailing) = trailing_trivia(after);
        tokens.push(SyntaxToken {
            kind,
            text: text.to_string(),
            leading: std::mem::take(&mut leading),
            trailing,
            span: Some(TextSpan::new(start, end)),
        });
        let (after, next_leading) = leading_trivia(after);
        leading = next_leading;
        rest = after;
    }

    let end = source.len();
    tokens.push(SyntaxToken {
        kind: TokenKind::EndOfFile,
        text: String::new(),
        leading,
        trailing: Vec::new(),
        span: Some(TextSpan::new(end, end)),
    });
    Ok(tokens)
}
