use thiserror::Error;

use crate::token::Token;

/// Spaces per one indentation level.
const SPACES_PER_INDENT: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Unterminated string literal at position {position}")]
    UnterminatedString { position: usize },
    #[error("Unknown escape sequence '\\{sequence}' at position {position}")]
    UnknownEscapeSequence { sequence: char, position: usize },
    #[error("Line break inside a string literal at position {position}")]
    LineBreakInString { position: usize },
    #[error("Invalid integer literal '{literal}' at position {position}")]
    InvalidIntegerLiteral { literal: String, position: usize },
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
}

pub type LexResult<T> = Result<T, LexerError>;

/// Indentation-aware tokenizer with buffered random-access lookahead.
///
/// The whole input is tokenized eagerly on construction; `current`/`advance`
/// then walk the buffered sequence. `advance` clamps at the trailing `Eof`
/// token, so repeated calls at the end keep returning `Eof`.
pub struct Lexer {
    tokens: Vec<Token>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> LexResult<Self> {
        let tokens = Tokenizer::new(input).run()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub fn advance(&mut self) -> &Token {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Checks that the current token equals `expected`, payload included.
    pub fn expect(&self, expected: &Token) -> LexResult<&Token> {
        let current = self.current();
        if current == expected {
            Ok(current)
        } else {
            Err(LexerError::UnexpectedToken {
                expected: expected.to_string(),
                found: current.to_string(),
            })
        }
    }

    /// Checks that the current token is an identifier and returns its name.
    pub fn expect_id(&self) -> LexResult<&str> {
        match self.current() {
            Token::Id(name) => Ok(name),
            other => Err(LexerError::UnexpectedToken {
                expected: "an identifier".to_string(),
                found: other.to_string(),
            }),
        }
    }

    pub fn expect_next(&mut self, expected: &Token) -> LexResult<&Token> {
        self.advance();
        self.expect(expected)
    }

    pub fn expect_next_id(&mut self) -> LexResult<&str> {
        self.advance();
        self.expect_id()
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    indent_level: usize,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            indent_level: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> LexResult<Vec<Token>> {
        // Leading spaces on the first line never produce an Indent.
        self.trim_spaces();
        while let Some(character) = self.peek() {
            match character {
                '\'' | '"' => self.scan_string()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
                c if c.is_ascii_punctuation() => self.scan_punctuation(),
                c if c.is_ascii_digit() => self.scan_number()?,
                ' ' => self.trim_spaces(),
                '\n' => self.scan_newline(),
                other => {
                    return Err(LexerError::UnexpectedCharacter {
                        character: other,
                        position: self.pos,
                    });
                }
            }
        }

        if !self.tokens.is_empty() && self.tokens.last() != Some(&Token::Newline) {
            self.tokens.push(Token::Newline);
        }
        while self.indent_level > 0 {
            self.tokens.push(Token::Dedent);
            self.indent_level -= 1;
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_newline(&mut self) {
        self.consume();
        // Consecutive newlines collapse into one, and no Newline may precede
        // the first real token.
        if !self.tokens.is_empty() && self.tokens.last() != Some(&Token::Newline) {
            self.tokens.push(Token::Newline);
        }
        self.handle_indentation();
    }

    fn handle_indentation(&mut self) {
        let mut spaces = 0;
        while self.peek() == Some(' ') {
            self.consume();
            spaces += 1;
        }
        // Blank lines, comment-only lines, and trailing spaces at the end of
        // input leave the indentation level untouched.
        match self.peek() {
            Some('\n') | Some('#') | None => return,
            _ => {}
        }

        if spaces > self.indent_level * SPACES_PER_INDENT {
            let mut excess = spaces - self.indent_level * SPACES_PER_INDENT;
            while excess > 0 {
                excess = excess.saturating_sub(SPACES_PER_INDENT);
                self.tokens.push(Token::Indent);
                self.indent_level += 1;
            }
        } else if spaces < self.indent_level * SPACES_PER_INDENT {
            let mut shortfall = self.indent_level * SPACES_PER_INDENT - spaces;
            while shortfall > 0 {
                shortfall = shortfall.saturating_sub(SPACES_PER_INDENT);
                self.tokens.push(Token::Dedent);
                self.indent_level -= 1;
            }
        }
    }

    fn scan_string(&mut self) -> LexResult<()> {
        let start = self.pos;
        let quote = self.consume().unwrap_or('\'');
        let mut result = String::new();
        loop {
            let Some(character) = self.consume() else {
                return Err(LexerError::UnterminatedString { position: start });
            };
            if character == quote {
                break;
            }
            match character {
                '\\' => {
                    let Some(escaped) = self.consume() else {
                        return Err(LexerError::UnterminatedString { position: start });
                    };
                    match escaped {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        'r' => result.push('\r'),
                        '"' => result.push('"'),
                        '\'' => result.push('\''),
                        '\\' => result.push('\\'),
                        other => {
                            return Err(LexerError::UnknownEscapeSequence {
                                sequence: other,
                                position: self.pos - other.len_utf8(),
                            });
                        }
                    }
                }
                '\n' | '\r' => {
                    return Err(LexerError::LineBreakInString { position: start });
                }
                other => result.push(other),
            }
        }
        self.tokens.push(Token::String(result));
        Ok(())
    }

    fn scan_word(&mut self) {
        let start = self.pos;
        while let Some(character) = self.peek() {
            if character.is_ascii_alphanumeric() || character == '_' {
                self.consume();
            } else {
                break;
            }
        }
        let word = &self.input[start..self.pos];
        let token = match word {
            "class" => Token::Class,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "def" => Token::Def,
            "print" => Token::Print,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "None" => Token::None,
            "True" => Token::True,
            "False" => Token::False,
            _ => Token::Id(word.to_string()),
        };
        self.tokens.push(token);
    }

    fn scan_punctuation(&mut self) {
        let character = self.consume().unwrap_or('#');
        if character == '#' {
            // Comment runs to the end of the line; the newline stays for the
            // layout pass.
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.consume();
            }
            return;
        }
        let token = match (character, self.peek()) {
            ('=', Some('=')) => {
                self.consume();
                Token::Eq
            }
            ('!', Some('=')) => {
                self.consume();
                Token::NotEq
            }
            ('<', Some('=')) => {
                self.consume();
                Token::LessOrEq
            }
            ('>', Some('=')) => {
                self.consume();
                Token::GreaterOrEq
            }
            _ => Token::Char(character),
        };
        self.tokens.push(token);
    }

    fn scan_number(&mut self) -> LexResult<()> {
        let start = self.pos;
        while let Some(character) = self.peek() {
            if character.is_ascii_digit() {
                self.consume();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.pos];
        let number = literal
            .parse::<i32>()
            .map_err(|_| LexerError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                position: start,
            })?;
        self.tokens.push(Token::Number(number));
        Ok(())
    }

    fn trim_spaces(&mut self) {
        while self.peek() == Some(' ') {
            self.consume();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume(&mut self) -> Option<char> {
        let character = self.peek()?;
        self.pos += character.len_utf8();
        Some(character)
    }
}
