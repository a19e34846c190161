use std::fmt;

/// Token produced by the lexer.
///
/// Keywords are not distinguished from names: the language treats most of
/// them as case-insensitive and many as contextual, so the parser checks
/// `Token::Name` text with `is_keyword`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    OpenTag,
    InlineHtml(String),
    /// Identifier or qualified name, e.g. `Foo`, `Foo\Bar`, `\Foo`.
    Name(String),
    /// `$name`, without the sigil.
    Variable(String),
    Int(i64),
    Float(f64),
    /// Fully decoded string literal, as bytes.
    String(Vec<u8>),
    /// Double-quoted or heredoc string containing interpolation.
    Template(String),

    Semicolon,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    DoubleColon,
    Colon,
    Question,
    QuestionQuestion,
    Arrow,
    NullsafeArrow,
    DoubleArrow,
    Ellipsis,
    Backslash,
    Dollar,
    At,
    AttributeStart,

    Assign,
    /// Compound assignment such as `+=` or `??=`; text kept for messages.
    AssignOp(&'static str),
    Increment,
    Decrement,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Dot,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    ShiftLeft,
    ShiftRight,
    AmpAmp,
    PipePipe,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Spaceship,

    Eof,
}

impl Token {
    /// Case-insensitive keyword test for name tokens.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Name(name) if name.eq_ignore_ascii_case(keyword))
    }

    /// Simple (unqualified) name text, if this is one.
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            Token::Name(name) if !name.contains('\\') => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::OpenTag => "open tag",
            Token::InlineHtml(_) => "inline HTML",
            Token::Name(name) => return write!(f, "`{name}`"),
            Token::Variable(name) => return write!(f, "`${name}`"),
            Token::Int(value) => return write!(f, "integer {value}"),
            Token::Float(value) => return write!(f, "float {value}"),
            Token::String(_) | Token::Template(_) => "string literal",
            Token::Semicolon => "`;`",
            Token::Comma => "`,`",
            Token::LeftParen => "`(`",
            Token::RightParen => "`)`",
            Token::LeftBracket => "`[`",
            Token::RightBracket => "`]`",
            Token::LeftBrace => "`{`",
            Token::RightBrace => "`}`",
            Token::DoubleColon => "`::`",
            Token::Colon => "`:`",
            Token::Question => "`?`",
            Token::QuestionQuestion => "`??`",
            Token::Arrow => "`->`",
            Token::NullsafeArrow => "`?->`",
            Token::DoubleArrow => "`=>`",
            Token::Ellipsis => "`...`",
            Token::Backslash => "`\\`",
            Token::Dollar => "`$`",
            Token::At => "`@`",
            Token::AttributeStart => "`#[`",
            Token::Assign => "`=`",
            Token::AssignOp(op) => return write!(f, "`{op}`"),
            Token::Increment => "`++`",
            Token::Decrement => "`--`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Star => "`*`",
            Token::Slash => "`/`",
            Token::Percent => "`%`",
            Token::Pow => "`**`",
            Token::Dot => "`.`",
            Token::Amp => "`&`",
            Token::Pipe => "`|`",
            Token::Caret => "`^`",
            Token::Tilde => "`~`",
            Token::Bang => "`!`",
            Token::ShiftLeft => "`<<`",
            Token::ShiftRight => "`>>`",
            Token::AmpAmp => "`&&`",
            Token::PipePipe => "`||`",
            Token::Equal => "`==`",
            Token::NotEqual => "`!=`",
            Token::Identical => "`===`",
            Token::NotIdentical => "`!==`",
            Token::Less => "`<`",
            Token::LessEqual => "`<=`",
            Token::Greater => "`>`",
            Token::GreaterEqual => "`>=`",
            Token::Spaceship => "`<=>`",
            Token::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// A token with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// Byte offset of the first character.
    pub offset: usize,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, in bytes.
    pub column: u32,
}
