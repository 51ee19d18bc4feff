//! Recursive-descent parser for protobuf text.

use super::lexer::{Lexer, ParseError, Token, TokenKind};
use super::message::{Message, Value};

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum nesting depth of messages.
    pub max_depth: usize,
    /// Keep fields the network schema does not know instead of failing.
    pub allow_unknown_fields: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            allow_unknown_fields: false,
        }
    }
}

/// Parses protobuf text into a [`Message`] tree.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a complete document.
    pub fn parse(&self, text: &str) -> Result<Message, ParseError> {
        let tokens = Lexer::new(text).tokenize()?;
        let mut state = ParseState {
            tokens,
            pos: 0,
            max_depth: self.config.max_depth,
        };
        state.parse_message(0, None)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

struct ParseState {
    tokens: Vec<Token>,
    pos: usize,
    max_depth: usize,
}

impl ParseState {
    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never passes it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error_at(token: &Token, message: impl Into<String>) -> ParseError {
        ParseError::new(token.line, token.column, message)
    }

    fn unexpected(token: &Token, expected: &str) -> ParseError {
        Self::error_at(
            token,
            format!("expected {}, found {}", expected, token.kind.describe()),
        )
    }

    /// Parse fields until `close` (or end of input for the root message).
    fn parse_message(
        &mut self,
        depth: usize,
        close: Option<TokenKind>,
    ) -> Result<Message, ParseError> {
        let mut message = Message::new();

        loop {
            let token = self.peek().clone();

            if Some(&token.kind) == close.as_ref() {
                self.advance();
                return Ok(message);
            }

            match &token.kind {
                TokenKind::Eof => {
                    return match close {
                        None => Ok(message),
                        Some(kind) => Err(Self::unexpected(&token, &kind.describe())),
                    };
                }
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.advance();
                    self.parse_field(&mut message, name, depth)?;
                }
                _ => return Err(Self::unexpected(&token, "field name")),
            }

            // Optional separator between fields.
            if matches!(self.peek().kind, TokenKind::Semicolon | TokenKind::Comma) {
                self.advance();
            }
        }
    }

    fn parse_field(
        &mut self,
        message: &mut Message,
        name: String,
        depth: usize,
    ) -> Result<(), ParseError> {
        let has_colon = self.peek().kind == TokenKind::Colon;
        if has_colon {
            self.advance();
        }

        let token = self.peek().clone();
        match token.kind {
            TokenKind::LeftBrace | TokenKind::LeftAngle => {
                let nested = self.parse_nested(depth)?;
                message.push(name, Value::Message(nested));
            }
            TokenKind::LeftBracket if has_colon => {
                self.advance();
                if self.peek().kind == TokenKind::RightBracket {
                    self.advance();
                    return Ok(());
                }
                loop {
                    let value = self.parse_value(depth)?;
                    message.push(name.clone(), value);

                    let next = self.advance();
                    match next.kind {
                        TokenKind::Comma => continue,
                        TokenKind::RightBracket => break,
                        _ => return Err(Self::unexpected(&next, "',' or ']'")),
                    }
                }
            }
            _ if has_colon => {
                let value = self.parse_scalar()?;
                message.push(name, value);
            }
            _ => {
                return Err(Self::error_at(
                    &token,
                    format!("expected ':' or '{{' after field \"{}\"", name),
                ));
            }
        }

        Ok(())
    }

    fn parse_nested(&mut self, depth: usize) -> Result<Message, ParseError> {
        let open = self.advance();
        if depth + 1 > self.max_depth {
            return Err(Self::error_at(
                &open,
                format!("message nesting exceeds {} levels", self.max_depth),
            ));
        }
        let close = match open.kind {
            TokenKind::LeftAngle => TokenKind::RightAngle,
            _ => TokenKind::RightBrace,
        };
        self.parse_message(depth + 1, Some(close))
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ParseError> {
        match self.peek().kind {
            TokenKind::LeftBrace | TokenKind::LeftAngle => {
                Ok(Value::Message(self.parse_nested(depth)?))
            }
            _ => self.parse_scalar(),
        }
    }

    fn parse_scalar(&mut self) -> Result<Value, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(first) => {
                // Adjacent literals concatenate: "a" "b" == "ab"
                let mut s = first;
                while let TokenKind::Str(next) = &self.peek().kind {
                    s.push_str(next);
                    self.advance();
                }
                Ok(Value::String(s))
            }
            TokenKind::Number(n) => Ok(Value::Number(n)),
            TokenKind::Ident(i) => Ok(Value::Ident(i)),
            _ => Err(Self::unexpected(&token, "value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Message, ParseError> {
        Parser::new().parse(text)
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  # only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_layer() {
        let msg = parse(
            r#"
            name: "LeNet"
            layer {
              name: "mnist"
              type: "Data"
              top: "data"
              top: "label"
              include { phase: TRAIN }
              data_param { source: "examples/mnist/mnist_train_lmdb" batch_size: 64 }
            }
            "#,
        )
        .unwrap();

        assert_eq!(msg.get_str("name"), Some("LeNet"));
        let layer = msg.get_message("layer").unwrap();
        assert_eq!(layer.get_all("top").count(), 2);
        let include = layer.get_message("include").unwrap();
        assert_eq!(include.get("phase").and_then(Value::as_ident), Some("TRAIN"));
        let param = layer.get_message("data_param").unwrap();
        assert_eq!(param.get("batch_size"), Some(&Value::Number("64".to_string())));
    }

    #[test]
    fn test_separators_and_angle_brackets() {
        let msg = parse("layer <name: 'data'; type: 'Data', top: 'data'>").unwrap();
        let layer = msg.get_message("layer").unwrap();
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.get_str("type"), Some("Data"));
    }

    #[test]
    fn test_colon_before_message() {
        let msg = parse("layer: { name: \"a\" }").unwrap();
        assert_eq!(
            msg.get_message("layer").and_then(|l| l.get_str("name")),
            Some("a")
        );
    }

    #[test]
    fn test_list_syntax_expands_to_repeated_fields() {
        let msg = parse("top: [\"a\", \"b\"] dim: []").unwrap();
        let tops: Vec<_> = msg.get_all("top").filter_map(Value::as_str).collect();
        assert_eq!(tops, vec!["a", "b"]);
        assert!(!msg.contains("dim"));
    }

    #[test]
    fn test_string_concatenation() {
        let msg = parse("source: \"/data/\" 'train_lmdb'").unwrap();
        assert_eq!(msg.get_str("source"), Some("/data/train_lmdb"));
    }

    #[test]
    fn test_not_prototxt() {
        let err = parse("this-is-not-prototxt").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_missing_close_brace() {
        let err = parse("layer {\n name: \"a\"\n").unwrap_err();
        assert!(err.message.contains("'}'"), "{}", err);
    }

    #[test]
    fn test_mismatched_close() {
        assert!(parse("layer { name: \"a\" >").is_err());
    }

    #[test]
    fn test_scalar_without_colon() {
        let err = parse("name \"a\"").unwrap_err();
        assert!(err.message.contains("after field \"name\""));
    }

    #[test]
    fn test_max_depth() {
        let parser = Parser::with_config(ParserConfig {
            max_depth: 2,
            ..ParserConfig::default()
        });
        assert!(parser.parse("a { b { c: 1 } }").is_ok());
        let err = parser.parse("a { b { c { d: 1 } } }").unwrap_err();
        assert!(err.message.contains("nesting"));
    }
}
