//! Tokenizer for the protobuf text format.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// A syntax error in protobuf text, with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Field names, enum values and `true`/`false`.
    Ident(String),
    /// Numeric literal, kept verbatim.
    Number(String),
    /// Decoded string literal.
    Str(String),
    LeftBrace,
    RightBrace,
    LeftAngle,
    RightAngle,
    LeftBracket,
    RightBracket,
    Colon,
    Semicolon,
    Comma,
    Eof,
}

impl TokenKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier \"{}\"", s),
            TokenKind::Number(s) => format!("number {}", s),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::LeftBrace => "'{'".to_string(),
            TokenKind::RightBrace => "'}'".to_string(),
            TokenKind::LeftAngle => "'<'".to_string(),
            TokenKind::RightAngle => "'>'".to_string(),
            TokenKind::LeftBracket => "'['".to_string(),
            TokenKind::RightBracket => "']'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let Some(&ch) = self.chars.peek() else {
            return Ok(token(TokenKind::Eof));
        };

        let punct = match ch {
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            '<' => Some(TokenKind::LeftAngle),
            '>' => Some(TokenKind::RightAngle),
            '[' => Some(TokenKind::LeftBracket),
            ']' => Some(TokenKind::RightBracket),
            ':' => Some(TokenKind::Colon),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = punct {
            self.bump();
            return Ok(token(kind));
        }

        if ch == '"' || ch == '\'' {
            let s = self.read_string(line, column)?;
            return Ok(token(TokenKind::Str(s)));
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let ident = self.read_ident();
            return Ok(token(TokenKind::Ident(ident)));
        }

        if ch == '-' || ch == '.' || ch.is_ascii_digit() {
            let number = self.read_number(line, column)?;
            return Ok(token(TokenKind::Number(number)));
        }

        Err(ParseError::new(
            line,
            column,
            format!("unexpected character '{}'", ch),
        ))
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<String, ParseError> {
        let mut text = String::new();
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.bump();

            // -inf / -nan
            if matches!(self.chars.peek(), Some(c) if c.is_ascii_alphabetic()) {
                let ident = self.read_ident();
                let lower = ident.to_ascii_lowercase();
                if matches!(lower.as_str(), "inf" | "infinity" | "nan") {
                    text.push_str(&ident);
                    return Ok(text);
                }
                return Err(ParseError::new(
                    line,
                    column,
                    format!("expected number after '-', found \"{}\"", ident),
                ));
            }
        }

        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '.' {
                text.push(ch);
                self.bump();
            } else if (ch == '+' || ch == '-') && exponent_pending(&text) {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        if is_number_literal(&text) {
            Ok(text)
        } else {
            Err(ParseError::new(
                line,
                column,
                format!("invalid number \"{}\"", text),
            ))
        }
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<String, ParseError> {
        let unterminated = || ParseError::new(line, column, "unterminated string");

        let quote = self.bump().ok_or_else(unterminated)?;
        let mut bytes: Vec<u8> = Vec::new();

        loop {
            let ch = match self.bump() {
                None | Some('\n') => return Err(unterminated()),
                Some(c) => c,
            };

            if ch == quote {
                break;
            }

            if ch != '\\' {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                continue;
            }

            let (esc_line, esc_column) = (self.line, self.column);
            let escaped = self.bump().ok_or_else(unterminated)?;
            match escaped {
                'n' => bytes.push(b'\n'),
                'r' => bytes.push(b'\r'),
                't' => bytes.push(b'\t'),
                'a' => bytes.push(0x07),
                'b' => bytes.push(0x08),
                'f' => bytes.push(0x0c),
                'v' => bytes.push(0x0b),
                '\\' => bytes.push(b'\\'),
                '\'' => bytes.push(b'\''),
                '"' => bytes.push(b'"'),
                '?' => bytes.push(b'?'),
                'x' | 'X' => {
                    match self.read_radix_digits(16, 2) {
                        Some((v, _)) => bytes.push(v as u8),
                        None => {
                            return Err(ParseError::new(
                                esc_line,
                                esc_column,
                                "expected hex digits after \\x",
                            ));
                        }
                    }
                }
                '0'..='7' => {
                    let mut value = escaped.to_digit(8).unwrap_or(0);
                    if let Some((rest, count)) = self.read_radix_digits(8, 2) {
                        value = value * 8u32.pow(count as u32) + rest;
                    }
                    if value > 0xff {
                        return Err(ParseError::new(
                            esc_line,
                            esc_column,
                            "octal escape out of range",
                        ));
                    }
                    bytes.push(value as u8);
                }
                other => {
                    return Err(ParseError::new(
                        esc_line,
                        esc_column,
                        format!("invalid escape sequence \\{}", other),
                    ));
                }
            }
        }

        String::from_utf8(bytes)
            .map_err(|_| ParseError::new(line, column, "string is not valid UTF-8"))
    }

    /// Consume up to `max` digits in `radix`, returning the value and the
    /// number of digits read, or `None` if no digit follows.
    fn read_radix_digits(&mut self, radix: u32, max: usize) -> Option<(u32, usize)> {
        let mut value = 0u32;
        let mut count = 0;
        while count < max {
            let Some(digit) = self.chars.peek().and_then(|c| c.to_digit(radix)) else {
                break;
            };
            value = value * radix + digit;
            count += 1;
            self.bump();
        }
        (count > 0).then_some((value, count))
    }
}

/// True when `text` ends in a decimal exponent marker awaiting its sign.
fn exponent_pending(text: &str) -> bool {
    let digits = text.trim_start_matches('-');
    let is_hex = digits.starts_with("0x") || digits.starts_with("0X");
    !is_hex && (text.ends_with('e') || text.ends_with('E'))
}

/// Check that a lexed run of characters is a valid integer or float literal.
pub fn is_number_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() {
        return false;
    }

    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let body = digits
        .strip_suffix('f')
        .or_else(|| digits.strip_suffix('F'))
        .unwrap_or(digits);

    // Rust's float parser accepts words like "inf"; require a digit.
    body.chars().any(|c| c.is_ascii_digit())
        && body.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && body.parse::<f64>().is_ok()
}
