use std::fmt;

/// A single lexeme of a Mython program.
///
/// Layout tokens (`Newline`, `Indent`, `Dedent`, `Eof`) are synthesized by the
/// lexer; everything else maps one-to-one onto source text. Two tokens are
/// equal when their variants match and, for the value-carrying variants, their
/// payloads are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(i32),
    Id(String),
    String(String),
    /// A single punctuation character that has no dedicated token.
    Char(char),

    // Keywords
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Two-character operators
    Eq,          // ==
    NotEq,       // !=
    LessOrEq,    // <=
    GreaterOrEq, // >=

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "Number{{{value}}}"),
            Token::Id(name) => write!(f, "Id{{{name}}}"),
            Token::String(value) => write!(f, "String{{{value}}}"),
            Token::Char(character) => write!(f, "Char{{{character}}}"),
            Token::Class => f.write_str("class"),
            Token::Return => f.write_str("return"),
            Token::If => f.write_str("if"),
            Token::Else => f.write_str("else"),
            Token::Def => f.write_str("def"),
            Token::Print => f.write_str("print"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::None => f.write_str("None"),
            Token::True => f.write_str("True"),
            Token::False => f.write_str("False"),
            Token::Eq => f.write_str("=="),
            Token::NotEq => f.write_str("!="),
            Token::LessOrEq => f.write_str("<="),
            Token::GreaterOrEq => f.write_str(">="),
            Token::Newline => f.write_str("Newline"),
            Token::Indent => f.write_str("Indent"),
            Token::Dedent => f.write_str("Dedent"),
            Token::Eof => f.write_str("Eof"),
        }
    }
}
