use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Scanner for SysY source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Line where the current token starts
    start_line: usize,
    /// Column where the current token starts
    start_column: usize,
}

impl Scanner {
    /// Creates a new scanner over source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.column = 1;
            }

            '/' => {
                if self.match_char('/') {
                    self.skip_line_comment();
                } else if self.match_char('*') {
                    self.skip_block_comment()?;
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ';' => self.add_token(TokenKind::Semicolon),
            ',' => self.add_token(TokenKind::Comma),

            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '*' => self.add_token(TokenKind::Star),
            '%' => self.add_token(TokenKind::Percent),

            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::EqEq);
                } else {
                    self.add_token(TokenKind::Assign);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::NotEq);
                } else {
                    self.add_token(TokenKind::Bang);
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq);
                } else {
                    self.add_token(TokenKind::Lt);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq);
                } else {
                    self.add_token(TokenKind::Gt);
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.add_token(TokenKind::AndAnd);
                } else {
                    return Err(self.error("expected '&&'"));
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.add_token(TokenKind::OrOr);
                } else {
                    return Err(self.error("expected '||'"));
                }
            }

            c if c.is_ascii_digit() => self.scan_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),

            other => {
                return Err(self.error(format!("unexpected character '{}'", other)));
            }
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            if self.is_at_end() {
                return Err(self.error("unterminated block comment"));
            }
            let c = self.advance();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else if c == '*' && self.match_char('/') {
                return Ok(());
            }
        }
    }

    /// Decimal, octal (`0` prefix) or hexadecimal (`0x` prefix) literal
    fn scan_number(&mut self) -> Result<()> {
        let first = self.source[self.start];
        let (radix, digits_start) = if first == '0' && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            (16, self.current)
        } else if first == '0' {
            (8, self.start)
        } else {
            (10, self.start)
        };

        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let digits: String = self.source[digits_start..self.current].iter().collect();
        if digits.is_empty() {
            return Err(self.error(format!("invalid integer literal '{}'", text)));
        }

        let value = i64::from_str_radix(&digits, radix)
            .map_err(|_| self.error(format!("invalid integer literal '{}'", text)))?;
        let value = i32::try_from(value)
            .map_err(|_| self.error(format!("integer literal '{}' out of range", text)))?;

        self.add_token(TokenKind::Integer(value));
        Ok(())
    }

    fn scan_identifier_or_keyword(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text));
        self.add_token(kind);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(
            kind,
            lexeme,
            self.start_line,
            self.start_column,
        ));
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::SyntaxError {
            line: self.start_line,
            col: self.start_column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_function() {
        let tokens = kinds("int main() { return 0; }");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Int,
                TokenKind::Identifier("main".to_string()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::Return,
                TokenKind::Integer(0),
                TokenKind::Semicolon,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        let tokens = kinds("<= >= == != && || < > ! =");
        assert_eq!(
            &tokens[..10],
            &[
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Bang,
                TokenKind::Assign,
            ]
        );
    }

    #[test]
    fn test_literal_radixes() {
        let tokens = kinds("10 010 0x1F 0 2147483647");
        assert_eq!(
            &tokens[..5],
            &[
                TokenKind::Integer(10),
                TokenKind::Integer(8),
                TokenKind::Integer(31),
                TokenKind::Integer(0),
                TokenKind::Integer(i32::MAX),
            ]
        );
    }

    #[test]
    fn test_literal_out_of_range() {
        let err = Scanner::new("return 2147483648;").scan_tokens().unwrap_err();
        assert!(matches!(err, Error::SyntaxError { line: 1, col: 8, .. }));
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = Scanner::new("// header\n/* a\n b */ int x")
            .scan_tokens()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!((tokens[0].line, tokens[0].column), (3, 7));
        assert_eq!((tokens[1].line, tokens[1].column), (3, 11));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Scanner::new("int /* never closed").scan_tokens().unwrap_err();
        assert!(err.to_string().contains("unterminated block comment"));
    }

    #[test]
    fn test_stray_character() {
        let err = Scanner::new("return 1 $ 2;").scan_tokens().unwrap_err();
        assert_eq!(
            err,
            Error::SyntaxError {
                line: 1,
                col: 10,
                message: "unexpected character '$'".to_string(),
            }
        );
    }
}
