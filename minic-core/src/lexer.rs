//! Lexer for minic.
//!
//! One left-to-right pass over the source. Whitespace and comments are
//! dropped, everything else either becomes a token or is reported as a
//! lexical diagnostic. The stream always ends with a single `Eof` token.

use serde::{Serialize, Serializer};

use crate::diagnostic::{Code, Diagnostic, Phase};
use crate::span::{Position, Span};

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    Number,  // 42
    FNumber, // 3.14
    Str,     // "text"

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Semicolon, // ;

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Equal,        // =
    EqualEqual,   // ==
    Bang,         // !
    BangEqual,    // !=
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    AndAnd,       // &&
    OrOr,         // ||

    // Keywords
    Let,
    Func,
    If,
    Else,
    While,
    Return,
    Print,
    Break,
    Continue,
    True,
    False,
    Nil,
    Int,
    Float,
    Bool,
    String,
}

impl TokenKind {
    /// Name used on the wire (`LET`, `IDENT`, `EQUAL`, ...).
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "EOF",
            Ident => "IDENT",
            Number => "NUMBER",
            FNumber => "FNUMBER",
            Str => "STR",
            LParen => "LPAREN",
            RParen => "RPAREN",
            LBrace => "LBRACE",
            RBrace => "RBRACE",
            Comma => "COMMA",
            Semicolon => "SEMICOLON",
            Plus => "PLUS",
            Minus => "MINUS",
            Star => "STAR",
            Slash => "SLASH",
            Percent => "PERCENT",
            Equal => "EQUAL",
            EqualEqual => "EQUAL_EQUAL",
            Bang => "BANG",
            BangEqual => "BANG_EQUAL",
            Less => "LESS",
            LessEqual => "LESS_EQUAL",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            AndAnd => "AND_AND",
            OrOr => "OR_OR",
            Let => "LET",
            Func => "FUNC",
            If => "IF",
            Else => "ELSE",
            While => "WHILE",
            Return => "RETURN",
            Print => "PRINT",
            Break => "BREAK",
            Continue => "CONTINUE",
            True => "TRUE",
            False => "FALSE",
            Nil => "NIL",
            Int => "INT",
            Float => "FLOAT",
            Bool => "BOOL",
            String => "STRING",
        }
    }

    /// Keywords that may begin a statement; the parser resynchronizes on them.
    pub fn starts_statement(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Let | Func | If | While | Return | Print | Break | Continue | Int | Float | Bool
                | String
        )
    }

    pub fn is_type_name(self) -> bool {
        matches!(
            self,
            TokenKind::Int | TokenKind::Float | TokenKind::Bool | TokenKind::String
        )
    }
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for TokenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "let" => TokenKind::Let,
        "func" => TokenKind::Func,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "print" => TokenKind::Print,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "nil" => TokenKind::Nil,
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "bool" => TokenKind::Bool,
        "string" => TokenKind::String,
        _ => return None,
    };
    Some(kind)
}

/// A single token. `lexeme` is the exact source slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Token", 5)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("lexeme", &self.lexeme)?;
        state.serialize_field("line", &self.span.start.line)?;
        state.serialize_field("column", &self.span.start.column)?;
        state.serialize_field("offset", &self.span.start.offset)?;
        state.end()
    }
}

/// Result of lexing a source string.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a source string into tokens.
pub fn tokenize(source: &str) -> LexResult {
    let mut lexer = Lexer {
        source,
        index: 0,
        line: 1,
        column: 1,
        diagnostics: Vec::new(),
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    index: usize,
    line: u32,
    column: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.consume_char();
                continue;
            }

            let start = self.position();
            let token = match ch {
                '/' if self.peek_next() == Some('/') => {
                    self.skip_line_comment();
                    None
                }
                '/' if self.peek_next() == Some('*') => {
                    self.skip_block_comment(start);
                    None
                }
                '(' => self.single(TokenKind::LParen, start),
                ')' => self.single(TokenKind::RParen, start),
                '{' => self.single(TokenKind::LBrace, start),
                '}' => self.single(TokenKind::RBrace, start),
                ',' => self.single(TokenKind::Comma, start),
                ';' => self.single(TokenKind::Semicolon, start),
                '+' => self.single(TokenKind::Plus, start),
                '-' => self.single(TokenKind::Minus, start),
                '*' => self.single(TokenKind::Star, start),
                '/' => self.single(TokenKind::Slash, start),
                '%' => self.single(TokenKind::Percent, start),
                '=' => self.one_or_two('=', TokenKind::Equal, TokenKind::EqualEqual, start),
                '!' => self.one_or_two('=', TokenKind::Bang, TokenKind::BangEqual, start),
                '<' => self.one_or_two('=', TokenKind::Less, TokenKind::LessEqual, start),
                '>' => self.one_or_two('=', TokenKind::Greater, TokenKind::GreaterEqual, start),
                '&' if self.peek_next() == Some('&') => {
                    self.consume_char();
                    self.consume_char();
                    self.token(TokenKind::AndAnd, start)
                }
                '|' if self.peek_next() == Some('|') => {
                    self.consume_char();
                    self.consume_char();
                    self.token(TokenKind::OrOr, start)
                }
                '"' => self.lex_string(start),
                '0'..='9' => self.lex_number(start),
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(start),
                _ => {
                    self.consume_char();
                    self.error(
                        Code::InvalidCharacter,
                        format!("invalid character '{}'", ch.escape_default()),
                        start,
                    );
                    None
                }
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }
        }

        let end = self.position();
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: Span::point(end),
        });

        LexResult {
            tokens,
            diagnostics: core::mem::take(&mut self.diagnostics),
        }
    }

    fn single(&mut self, kind: TokenKind, start: Position) -> Option<Token> {
        self.consume_char();
        self.token(kind, start)
    }

    /// Maximal munch for `=`, `!`, `<`, `>` followed by `second`.
    fn one_or_two(
        &mut self,
        second: char,
        short: TokenKind,
        long: TokenKind,
        start: Position,
    ) -> Option<Token> {
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            self.token(long, start)
        } else {
            self.token(short, start)
        }
    }

    fn token(&self, kind: TokenKind, start: Position) -> Option<Token> {
        let end = self.index;
        Some(Token {
            kind,
            lexeme: self.source[start.offset as usize..end].to_string(),
            span: Span::new(start, end as u32),
        })
    }

    fn error(&mut self, code: Code, message: String, start: Position) {
        let span = Span::new(start, self.index as u32);
        self.diagnostics
            .push(Diagnostic::error(Phase::Lexical, code, message, span));
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn skip_block_comment(&mut self, start: Position) {
        self.consume_char(); // '/'
        self.consume_char(); // '*'
        while let Some(ch) = self.peek_char() {
            if ch == '*' && self.peek_next() == Some('/') {
                self.consume_char();
                self.consume_char();
                return;
            }
            self.consume_char();
        }
        self.error(
            Code::UnterminatedComment,
            "unterminated block comment".to_string(),
            start,
        );
    }

    fn lex_string(&mut self, start: Position) -> Option<Token> {
        self.consume_char(); // opening quote

        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.consume_char();
                    return self.token(TokenKind::Str, start);
                }
                // Strings end on their own line; resume lexing at the newline.
                '\n' => break,
                '\\' => {
                    let escape_start = self.position();
                    self.consume_char();
                    match self.peek_char() {
                        Some(next) if is_escape(next) => self.consume_char(),
                        Some('\n') | None => {}
                        Some(other) => {
                            self.consume_char();
                            self.error(
                                Code::InvalidEscape,
                                format!("invalid escape sequence '\\{}'", other.escape_default()),
                                escape_start,
                            );
                        }
                    }
                }
                _ => self.consume_char(),
            }
        }

        self.error(
            Code::UnterminatedString,
            "unterminated string literal".to_string(),
            start,
        );
        None
    }

    fn lex_number(&mut self, start: Position) -> Option<Token> {
        self.consume_digits();

        let mut kind = TokenKind::Number;
        if self.peek_char() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FNumber;
            self.consume_char(); // '.'
            self.consume_digits();
        }

        let token = self.token(kind, start)?;
        let valid = match kind {
            TokenKind::Number => token.lexeme.parse::<i64>().is_ok(),
            _ => token.lexeme.parse::<f64>().is_ok_and(f64::is_finite),
        };
        if !valid {
            self.error(
                Code::InvalidNumber,
                format!("number literal '{}' is out of range", token.lexeme),
                start,
            );
        }
        Some(token)
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
    }

    fn lex_ident_or_keyword(&mut self, start: Position) -> Option<Token> {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }

        let text = &self.source[start.offset as usize..self.index];
        let kind = keyword(text).unwrap_or(TokenKind::Ident);
        self.token(kind, start)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column, self.index as u32)
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.index..].chars();
        chars.next();
        chars.next()
    }

    fn consume_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.index += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

fn is_escape(ch: char) -> bool {
    matches!(ch, 'n' | 't' | 'r' | '\\' | '"' | '0')
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

/// Decode the escapes of a `Str` lexeme (quotes included).
///
/// Unknown escapes were already reported by the lexer; they decode to the
/// escaped character itself.
pub fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
