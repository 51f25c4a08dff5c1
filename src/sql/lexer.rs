//! SQL Lexer (Tokenizer)
//!
//! This module converts statement text into a stream of tokens. Every token
//! carries the byte offset where it started so later stages can point
//! errors at the exact spot in the input.

use super::token::{Keyword, Token, TokenKind};
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Input characters with their byte offsets
    input: Vec<(usize, char)>,
    /// Current position in input
    position: usize,
    /// Total byte length of the input
    len: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.char_indices().collect(),
            position: 0,
            len: input.len(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments()?;

        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, self.len));
        }

        let (offset, ch) = self.input[self.position];

        match ch {
            '(' => {
                self.advance();
                Ok(Token::new(TokenKind::LParen, offset))
            }
            ')' => {
                self.advance();
                Ok(Token::new(TokenKind::RParen, offset))
            }
            ',' => {
                self.advance();
                Ok(Token::new(TokenKind::Comma, offset))
            }
            ';' => {
                self.advance();
                Ok(Token::new(TokenKind::Semicolon, offset))
            }
            '.' => {
                self.advance();
                Ok(Token::new(TokenKind::Dot, offset))
            }
            '*' => {
                self.advance();
                Ok(Token::new(TokenKind::Star, offset))
            }
            '=' => {
                self.advance();
                Ok(Token::new(TokenKind::Eq, offset))
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Lte, offset))
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Neq, offset))
                    }
                    _ => Ok(Token::new(TokenKind::Lt, offset)),
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Gte, offset))
                } else {
                    Ok(Token::new(TokenKind::Gt, offset))
                }
            }
            '!' => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Neq, offset))
                } else {
                    Err(Error::syntax("unexpected character '!'", offset))
                }
            }
            '\'' => self.read_string(),
            '"' => Err(Error::syntax(
                "double-quoted strings are not allowed; use single quotes",
                offset,
            )),
            _ if ch.is_ascii_digit() => self.read_number(),
            _ if ch.is_ascii_alphabetic() || ch == '_' => Ok(self.read_word()),
            _ => Err(Error::syntax(
                format!("unexpected character '{}'", ch),
                offset,
            )),
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// The character at the current position, if any
    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|&(_, ch)| ch)
    }

    /// The character after the current position, if any
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).map(|&(_, ch)| ch)
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Skip whitespace and SQL comments (`--` and `/* */`)
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('-') if self.peek_char() == Some('-') => {
                    while !self.is_at_end() && self.current_char() != Some('\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_char() == Some('*') => {
                    let (start, _) = self.input[self.position];
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(Error::syntax("unterminated comment", start));
                        }
                        if self.current_char() == Some('*') && self.peek_char() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Read a string literal. `''` inside the string is an escaped quote.
    fn read_string(&mut self) -> Result<Token> {
        let (start, _) = self.input[self.position];
        self.advance(); // skip opening quote

        let mut value = String::new();

        while let Some(ch) = self.current_char() {
            if ch == '\'' {
                if self.peek_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::new(TokenKind::String(value), start));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::syntax(
            "unterminated string literal (missing closing ')",
            start,
        ))
    }

    /// Read a number: a non-negative decimal integer or decimal. Sign is
    /// never part of the token.
    fn read_number(&mut self) -> Result<Token> {
        let (start, _) = self.input[self.position];
        let mut value = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !value.contains('.') {
                // A dot is part of the number only when digits follow,
                // otherwise it is the qualification dot.
                match self.peek_char() {
                    Some(next) if next.is_ascii_digit() => {
                        value.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }

        value
            .parse::<f64>()
            .map(|n| Token::new(TokenKind::Number(n), start))
            .map_err(|_| Error::InvalidLiteral {
                message: format!("'{}' is not a valid number", value),
                offset: Some(start),
            })
    }

    /// Read an identifier or keyword
    fn read_word(&mut self) -> Token {
        let (start, _) = self.input[self.position];
        let mut value = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match Keyword::from_word(&value) {
            Some(keyword) => Token::new(TokenKind::Keyword(keyword), start),
            None => Token::new(TokenKind::Ident(value), start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        Lexer::new(sql)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            kinds("SELECT * FROM students"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Star,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Ident("students".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_offsets_are_bytes() {
        let tokens = Lexer::new("SELECT surname FROM students").tokenize().unwrap();
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 7);
        assert_eq!(tokens[2].offset, 15);
        assert_eq!(tokens[3].offset, 20);
        assert_eq!(tokens[4].offset, 28); // Eof sits at the end of input
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("select From wHeRe"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_keep_their_case() {
        assert_eq!(
            kinds("Students _tmp x2"),
            vec![
                TokenKind::Ident("Students".to_string()),
                TokenKind::Ident("_tmp".to_string()),
                TokenKind::Ident("x2".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal_with_escape() {
        assert_eq!(
            kinds("SELECT 'it''s a test'"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::String("it's a test".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_points_at_opening_quote() {
        let err = Lexer::new("SELECT 'oops").tokenize().unwrap_err();
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn test_double_quotes_rejected() {
        let err = Lexer::new("SELECT \"name\"").tokenize().unwrap_err();
        assert!(err.to_string().contains("single quotes"));
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("LIMIT 10 2.5"),
            vec![
                TokenKind::Keyword(Keyword::Limit),
                TokenKind::Number(10.0),
                TokenKind::Number(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_qualified_reference_is_not_a_decimal() {
        assert_eq!(
            kinds("students.surname"),
            vec![
                TokenKind::Ident("students".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("surname".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("= != <> < <= > >="),
            vec![
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Neq,
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("SELECT -- everything\n* /* really\neverything */ FROM students"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Star,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Ident("students".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("SELECT #name").tokenize().unwrap_err();
        assert!(err.to_string().contains("unexpected character '#'"));
        assert_eq!(err.offset(), Some(7));

        let err = Lexer::new("WHERE a ! b").tokenize().unwrap_err();
        assert_eq!(err.offset(), Some(8));
    }
}
