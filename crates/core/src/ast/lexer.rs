//! Tokenizer for PHP source.
//!
//! Inline HTML outside `<?php ... ?>` is split off by hand; the code between
//! tags is tokenized with a logos-generated lexer and converted into the
//! parser-facing `Token` enum. A closing tag acts as a statement terminator.

use logos::Logos;

use crate::ast::error::{SyntaxError, SyntaxResult};
use crate::ast::token::{Spanned, Token};

#[derive(Debug, Clone, PartialEq, Default)]
enum LexFault {
    #[default]
    Unrecognized,
    Unterminated(&'static str),
}

/// A quoted string after escape processing.
#[derive(Debug, Clone, PartialEq)]
struct Quoted {
    text: Vec<u8>,
    interpolated: bool,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexFault)]
enum RawToken {
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    #[regex(r"//|#", lex_line_comment)]
    LineComment,

    #[token("/*", lex_block_comment)]
    BlockComment,

    #[token("?>")]
    CloseTag,

    #[regex(r"\\?[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*(\\[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*)*", |lex| lex.slice().to_owned())]
    Name(String),

    #[regex(r"\$[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*", |lex| lex.slice()[1..].to_owned())]
    Variable(String),

    #[regex(r"0[xX][0-9a-fA-F]+(_[0-9a-fA-F]+)*", |lex| lex.slice().to_owned())]
    #[regex(r"0[bB][01]+(_[01]+)*", |lex| lex.slice().to_owned())]
    #[regex(r"0[oO][0-7]+(_[0-7]+)*", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9]+(_[0-9]+)*", |lex| lex.slice().to_owned())]
    Integer(String),

    #[regex(r"[0-9]+(_[0-9]+)*\.([0-9]+(_[0-9]+)*)?([eE][+-]?[0-9]+(_[0-9]+)*)?", |lex| lex.slice().to_owned())]
    #[regex(r"\.[0-9]+(_[0-9]+)*([eE][+-]?[0-9]+(_[0-9]+)*)?", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9]+(_[0-9]+)*[eE][+-]?[0-9]+(_[0-9]+)*", |lex| lex.slice().to_owned())]
    Float(String),

    #[token("'", lex_single_quoted)]
    SingleQuoted(String),

    #[token("\"", lex_double_quoted)]
    DoubleQuoted(Quoted),

    #[token("`", lex_backtick)]
    Backtick(Quoted),

    #[token("<<<", lex_heredoc)]
    Heredoc(Quoted),

    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("::")]
    DoubleColon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("??")]
    QuestionQuestion,
    #[token("->")]
    Arrow,
    #[token("?->")]
    NullsafeArrow,
    #[token("=>")]
    DoubleArrow,
    #[token("...")]
    Ellipsis,
    #[token("\\")]
    Backslash,
    #[token("$")]
    Dollar,
    #[token("@")]
    At,
    #[token("#[")]
    AttributeStart,

    #[token("=")]
    Assign,
    #[token("+=", assign_op)]
    #[token("-=", assign_op)]
    #[token("*=", assign_op)]
    #[token("/=", assign_op)]
    #[token(".=", assign_op)]
    #[token("%=", assign_op)]
    #[token("**=", assign_op)]
    #[token("&=", assign_op)]
    #[token("|=", assign_op)]
    #[token("^=", assign_op)]
    #[token("<<=", assign_op)]
    #[token(">>=", assign_op)]
    #[token("??=", assign_op)]
    AssignOp(&'static str),
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    Pow,
    #[token(".")]
    Dot,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Equal,
    #[token("!=")]
    #[token("<>")]
    NotEqual,
    #[token("===")]
    Identical,
    #[token("!==")]
    NotIdentical,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<=>")]
    Spaceship,
}

fn lex_line_comment(lex: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let remainder = lex.remainder();
    let newline = remainder.find('\n').unwrap_or(remainder.len());
    // A closing tag ends a line comment.
    let end = match remainder[..newline].find("?>") {
        Some(tag) => tag,
        None => newline,
    };
    lex.bump(end);
    logos::Skip
}

fn lex_block_comment(lex: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => lex.bump(end + 2),
        None => lex.bump(remainder.len()),
    }
    logos::Skip
}

fn lex_single_quoted(lex: &mut logos::Lexer<RawToken>) -> Result<String, LexFault> {
    let remainder = lex.remainder();
    let mut text = String::new();
    let mut chars = remainder.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\'' => {
                lex.bump(idx + 1);
                return Ok(text);
            }
            '\\' => match chars.next() {
                Some((_, next @ ('\'' | '\\'))) => text.push(next),
                Some((_, next)) => {
                    text.push('\\');
                    text.push(next);
                }
                None => break,
            },
            _ => text.push(c),
        }
    }
    Err(LexFault::Unterminated("single-quoted string"))
}

fn assign_op(lex: &mut logos::Lexer<RawToken>) -> &'static str {
    match lex.slice() {
        "+=" => "+=",
        "-=" => "-=",
        "*=" => "*=",
        "/=" => "/=",
        ".=" => ".=",
        "%=" => "%=",
        "**=" => "**=",
        "&=" => "&=",
        "|=" => "|=",
        "^=" => "^=",
        "<<=" => "<<=",
        ">>=" => ">>=",
        _ => "??=",
    }
}

fn lex_double_quoted(lex: &mut logos::Lexer<RawToken>) -> Result<Quoted, LexFault> {
    lex_delimited(lex, '"', "double-quoted string")
}

fn lex_backtick(lex: &mut logos::Lexer<RawToken>) -> Result<Quoted, LexFault> {
    lex_delimited(lex, '`', "backtick string").map(|quoted| Quoted { interpolated: true, ..quoted })
}

fn lex_delimited(
    lex: &mut logos::Lexer<RawToken>,
    delimiter: char,
    what: &'static str,
) -> Result<Quoted, LexFault> {
    let remainder = lex.remainder();
    let mut escaped = false;
    for (idx, c) in remainder.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            let raw = &remainder[..idx];
            lex.bump(idx + 1);
            return Ok(Quoted {
                text: unescape(raw, Some(delimiter)),
                interpolated: has_interpolation(raw),
            });
        }
    }
    Err(LexFault::Unterminated(what))
}

fn is_label_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || c as u32 >= 0x80
}

fn is_label_char(c: char) -> bool {
    is_label_start(c) || c.is_ascii_digit()
}

fn lex_heredoc(lex: &mut logos::Lexer<RawToken>) -> Result<Quoted, LexFault> {
    let remainder = lex.remainder();
    let header = remainder.trim_start_matches([' ', '\t']);
    let mut consumed = remainder.len() - header.len();

    let (nowdoc, quote) = match header.chars().next() {
        Some('\'') => (true, Some('\'')),
        Some('"') => (false, Some('"')),
        _ => (false, None),
    };
    let label_start = if quote.is_some() { 1 } else { 0 };
    let label_len = header[label_start..]
        .char_indices()
        .find(|&(_, c)| !is_label_char(c))
        .map(|(idx, _)| idx)
        .unwrap_or(header.len() - label_start);
    let label = &header[label_start..label_start + label_len];
    if label.is_empty() || !label.chars().next().is_some_and(is_label_start) {
        return Err(LexFault::Unrecognized);
    }
    let mut after_label = label_start + label_len;
    if let Some(q) = quote {
        if !header[after_label..].starts_with(q) {
            return Err(LexFault::Unrecognized);
        }
        after_label += 1;
    }
    let rest = &header[after_label..];
    let newline_len = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') {
        1
    } else {
        return Err(LexFault::Unrecognized);
    };
    consumed += after_label + newline_len;

    let body_start = consumed;
    let mut lines: Vec<&str> = Vec::new();
    let mut cursor = body_start;
    loop {
        if cursor > remainder.len() {
            return Err(LexFault::Unterminated("heredoc"));
        }
        let line_end = remainder[cursor..].find('\n').map(|i| cursor + i);
        let line = &remainder[cursor..line_end.unwrap_or(remainder.len())];
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(after) = trimmed.strip_prefix(label) {
            if !after.chars().next().is_some_and(is_label_char) {
                let indent = line.len() - trimmed.len();
                let body = lines
                    .iter()
                    .map(|l| {
                        let l = l.strip_suffix('\r').unwrap_or(l);
                        let strip = l.len() - l.trim_start_matches([' ', '\t']).len();
                        &l[strip.min(indent)..]
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                lex.bump(cursor + indent + label.len());
                return Ok(if nowdoc {
                    Quoted { text: body.into_bytes(), interpolated: false }
                } else {
                    Quoted { text: unescape(&body, None), interpolated: has_interpolation(&body) }
                });
            }
        }
        match line_end {
            Some(end) => {
                lines.push(line);
                cursor = end + 1;
            }
            None => return Err(LexFault::Unterminated("heredoc")),
        }
    }
}

/// True when the raw (still escaped) text interpolates a variable.
fn has_interpolation(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => {
                if let Some(&next) = bytes.get(i + 1) {
                    if next == b'{' || next == b'_' || next.is_ascii_alphabetic() || next >= 0x80 {
                        return true;
                    }
                }
                i += 1;
            }
            b'{' if bytes.get(i + 1) == Some(&b'$') => return true,
            _ => i += 1,
        }
    }
    false
}

/// Decode double-quoted escape sequences into the bytes the host stores;
/// `\xFF` and `\377` are single bytes, `\u{..}` is UTF-8.
fn unescape(raw: &str, delimiter: Option<char>) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('v') => out.push(0x0B),
            Some('e') => out.push(0x1B),
            Some('f') => out.push(0x0C),
            Some('\\') => out.push(b'\\'),
            Some('$') => out.push(b'$'),
            Some(d) if Some(d) == delimiter => push_char(&mut out, d),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            Some('x') if chars.peek().is_some_and(|c| c.is_ascii_hexdigit()) => {
                let mut value = 0;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(value as u8);
            }
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let mut hex = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    hex.push(c);
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => push_char(&mut out, decoded),
                    None => {
                        out.extend_from_slice(b"\\u{");
                        out.extend_from_slice(hex.as_bytes());
                        out.push(b'}');
                    }
                }
            }
            Some(other) => {
                out.push(b'\\');
                push_char(&mut out, other);
            }
            None => out.push(b'\\'),
        }
    }
    out
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn parse_integer(literal: &str) -> Option<Token> {
    let digits = literal.replace('_', "");
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or(digits.strip_prefix("0X")) {
        (16, hex.to_string())
    } else if let Some(bin) = digits.strip_prefix("0b").or(digits.strip_prefix("0B")) {
        (2, bin.to_string())
    } else if let Some(oct) = digits.strip_prefix("0o").or(digits.strip_prefix("0O")) {
        (8, oct.to_string())
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, digits[1..].to_string())
    } else {
        (10, digits)
    };

    match i64::from_str_radix(&body, radix) {
        Ok(value) => Some(Token::Int(value)),
        // Out-of-range integer literals become floats.
        Err(_) if !body.is_empty() && body.chars().all(|c| c.is_digit(radix)) => {
            let value = body
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0f64, |acc, d| acc * f64::from(radix) + f64::from(d));
            Some(Token::Float(value))
        }
        Err(_) => None,
    }
}

/// Maps byte offsets to 1-based line/column pairs.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        ((line + 1) as u32, (offset - self.starts[line] + 1) as u32)
    }
}

/// Find the next `<?php` or `<?=` tag; returns (start, length including the
/// single whitespace character that follows `<?php`).
fn find_open_tag(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(idx) = text[from..].find("<?") {
        let start = from + idx;
        let after = &text[start + 2..];
        if after.starts_with('=') {
            return Some((start, 3));
        }
        if after.len() >= 3 && after[..3].eq_ignore_ascii_case("php") {
            let tail = &after[3..];
            if tail.is_empty() {
                return Some((start, 5));
            }
            if tail.starts_with("\r\n") {
                return Some((start, 7));
            }
            if tail.starts_with([' ', '\t', '\n', '\r']) {
                return Some((start, 6));
            }
        }
        from = start + 2;
    }
    None
}

/// Tokenize a whole source file.
pub fn tokenize(source: &str) -> SyntaxResult<Vec<Spanned>> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut offset = 0;

    let spanned = |token: Token, at: usize| {
        let (line, column) = index.position(at);
        Spanned { token, offset: at, line, column }
    };

    while offset < source.len() {
        let html = &source[offset..];
        let Some((tag_start, tag_len)) = find_open_tag(html) else {
            tokens.push(spanned(Token::InlineHtml(html.to_string()), offset));
            break;
        };
        if tag_start > 0 {
            tokens.push(spanned(Token::InlineHtml(html[..tag_start].to_string()), offset));
        }
        tokens.push(spanned(Token::OpenTag, offset + tag_start));
        offset += tag_start + tag_len;

        let code = &source[offset..];
        let mut lexer = RawToken::lexer(code);
        let mut closed_at = None;
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let at = offset + span.start;
            let raw = match result {
                Ok(raw) => raw,
                Err(fault) => {
                    let (line, _) = index.position(at);
                    return Err(match fault {
                        LexFault::Unterminated(what) => SyntaxError::Unterminated { what, line },
                        LexFault::Unrecognized => SyntaxError::UnexpectedCharacter {
                            found: code[span.clone()].to_string(),
                            line,
                        },
                    });
                }
            };
            if raw == RawToken::CloseTag {
                tokens.push(spanned(Token::Semicolon, at));
                closed_at = Some(offset + span.end);
                break;
            }
            let token = convert(raw).ok_or_else(|| SyntaxError::InvalidNumber {
                literal: code[span.clone()].to_string(),
                line: index.position(at).0,
            })?;
            tokens.push(spanned(token, at));
        }

        match closed_at {
            Some(end) => {
                offset = end;
                // A single newline directly after `?>` belongs to the tag.
                if source[offset..].starts_with("\r\n") {
                    offset += 2;
                } else if source[offset..].starts_with('\n') {
                    offset += 1;
                }
            }
            None => {
                offset = source.len();
            }
        }
    }

    tokens.push(spanned(Token::Eof, source.len()));
    Ok(tokens)
}

fn convert(raw: RawToken) -> Option<Token> {
    Some(match raw {
        RawToken::Whitespace | RawToken::LineComment | RawToken::BlockComment => return None,
        RawToken::CloseTag => Token::Semicolon,
        RawToken::Name(name) => Token::Name(name),
        RawToken::Variable(name) => Token::Variable(name),
        RawToken::Integer(literal) => return parse_integer(&literal),
        RawToken::Float(literal) => Token::Float(literal.replace('_', "").parse().ok()?),
        RawToken::SingleQuoted(text) => Token::String(text.into_bytes()),
        RawToken::DoubleQuoted(quoted) | RawToken::Backtick(quoted) | RawToken::Heredoc(quoted) => {
            if quoted.interpolated {
                Token::Template(String::from_utf8_lossy(&quoted.text).into_owned())
            } else {
                Token::String(quoted.text)
            }
        }
        RawToken::Semicolon => Token::Semicolon,
        RawToken::Comma => Token::Comma,
        RawToken::LeftParen => Token::LeftParen,
        RawToken::RightParen => Token::RightParen,
        RawToken::LeftBracket => Token::LeftBracket,
        RawToken::RightBracket => Token::RightBracket,
        RawToken::LeftBrace => Token::LeftBrace,
        RawToken::RightBrace => Token::RightBrace,
        RawToken::DoubleColon => Token::DoubleColon,
        RawToken::Colon => Token::Colon,
        RawToken::Question => Token::Question,
        RawToken::QuestionQuestion => Token::QuestionQuestion,
        RawToken::Arrow => Token::Arrow,
        RawToken::NullsafeArrow => Token::NullsafeArrow,
        RawToken::DoubleArrow => Token::DoubleArrow,
        RawToken::Ellipsis => Token::Ellipsis,
        RawToken::Backslash => Token::Backslash,
        RawToken::Dollar => Token::Dollar,
        RawToken::At => Token::At,
        RawToken::AttributeStart => Token::AttributeStart,
        RawToken::Assign => Token::Assign,
        RawToken::AssignOp(op) => Token::AssignOp(op),
        RawToken::Increment => Token::Increment,
        RawToken::Decrement => Token::Decrement,
        RawToken::Plus => Token::Plus,
        RawToken::Minus => Token::Minus,
        RawToken::Star => Token::Star,
        RawToken::Slash => Token::Slash,
        RawToken::Percent => Token::Percent,
        RawToken::Pow => Token::Pow,
        RawToken::Dot => Token::Dot,
        RawToken::Amp => Token::Amp,
        RawToken::Pipe => Token::Pipe,
        RawToken::Caret => Token::Caret,
        RawToken::Tilde => Token::Tilde,
        RawToken::Bang => Token::Bang,
        RawToken::ShiftLeft => Token::ShiftLeft,
        RawToken::ShiftRight => Token::ShiftRight,
        RawToken::AmpAmp => Token::AmpAmp,
        RawToken::PipePipe => Token::PipePipe,
        RawToken::Equal => Token::Equal,
        RawToken::NotEqual => Token::NotEqual,
        RawToken::Identical => Token::Identical,
        RawToken::NotIdentical => Token::NotIdentical,
        RawToken::Less => Token::Less,
        RawToken::LessEqual => Token::LessEqual,
        RawToken::Greater => Token::Greater,
        RawToken::GreaterEqual => Token::GreaterEqual,
        RawToken::Spaceship => Token::Spaceship,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).expect("tokenize").into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn inline_html_and_tags_are_split() {
        let tokens = kinds("<p>hi</p><?php echo 1; ?>\n<b>");
        assert_eq!(
            tokens,
            vec![
                Token::InlineHtml("<p>hi</p>".into()),
                Token::OpenTag,
                Token::Name("echo".into()),
                Token::Int(1),
                Token::Semicolon,
                Token::Semicolon,
                Token::InlineHtml("<b>".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn qualified_names_and_variables() {
        let tokens = kinds("<?php \\Foo\\Bar $baz Qux\\{");
        assert_eq!(
            tokens[1..5],
            [
                Token::Name("\\Foo\\Bar".into()),
                Token::Variable("baz".into()),
                Token::Name("Qux".into()),
                Token::Backslash,
            ]
        );
    }

    #[test]
    fn numbers_follow_host_rules() {
        let tokens = kinds("<?php 0x1F 0b11 017 0o17 1_000 1.5 .5 1e3 9223372036854775808");
        assert_eq!(
            tokens[1..10],
            [
                Token::Int(31),
                Token::Int(3),
                Token::Int(15),
                Token::Int(15),
                Token::Int(1000),
                Token::Float(1.5),
                Token::Float(0.5),
                Token::Float(1000.0),
                Token::Float(9223372036854775808.0),
            ]
        );
    }

    #[test]
    fn strings_are_decoded_and_interpolation_detected() {
        let tokens = kinds(r#"<?php 'it\'s' "a\tb" "hi $name" "\$x""#);
        assert_eq!(
            tokens[1..5],
            [
                Token::String("it's".into()),
                Token::String("a\tb".into()),
                Token::Template("hi $name".into()),
                Token::String("$x".into()),
            ]
        );
    }

    #[test]
    fn compound_assignments_keep_their_operator() {
        let tokens = kinds("<?php $a .= 1; $b **= 2; $c ??= 3; $d <<= 4;");
        let ops: Vec<&str> = tokens
            .iter()
            .filter_map(|token| match token {
                Token::AssignOp(op) => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec![".=", "**=", "??=", "<<="]);
    }

    #[test]
    fn byte_escapes_stay_single_bytes() {
        let tokens = kinds(r#"<?php "\xFF\377\u{e9}" 'é'"#);
        assert_eq!(
            tokens[1..3],
            [Token::String(vec![0xFF, 0xFF, 0xC3, 0xA9]), Token::String(vec![0xC3, 0xA9])]
        );
    }

    #[test]
    fn heredoc_and_nowdoc_strip_closing_indentation() {
        let source = "<?php\n$a = <<<EOT\n    one\n      two\n    EOT;\n$b = <<<'RAW'\n$x\nRAW;\n";
        let tokens = kinds(source);
        assert!(tokens.contains(&Token::String("one\n  two".into())));
        assert!(tokens.contains(&Token::String("$x".into())));
    }

    #[test]
    fn comments_are_skipped_and_attributes_kept() {
        let tokens = kinds("<?php # note\n// other\n/* block */ #[Attr] x");
        assert_eq!(
            tokens[1..5],
            [
                Token::AttributeStart,
                Token::Name("Attr".into()),
                Token::RightBracket,
                Token::Name("x".into()),
            ]
        );
    }

    #[test]
    fn unterminated_strings_report_their_line() {
        let err = tokenize("<?php\n\n'oops").expect_err("unterminated");
        assert_eq!(err, SyntaxError::Unterminated { what: "single-quoted string", line: 3 });
    }

    #[test]
    fn line_numbers_track_newlines() {
        let tokens = tokenize("<?php\nclass\n  A").expect("tokenize");
        assert_eq!((tokens[1].line, tokens[1].column), (2, 1));
        assert_eq!((tokens[2].line, tokens[2].column), (3, 3));
    }
}
