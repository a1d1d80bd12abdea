//! Tokenizer for matcher expressions

use super::error::{MatcherError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A token and the char offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    /// Split the whole source into tokens
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }

            let position = self.pos;
            let token = match c {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                ',' => self.single(Token::Comma),
                '.' => self.single(Token::Dot),
                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Star),
                '/' => self.single(Token::Slash),
                '%' => self.single(Token::Percent),
                '!' => self.pair('=', Token::Ne, Token::Not),
                '<' => self.pair('=', Token::Le, Token::Lt),
                '>' => self.pair('=', Token::Ge, Token::Gt),
                '=' => self.double('=', Token::Eq)?,
                '&' => self.double('&', Token::And)?,
                '|' => self.double('|', Token::Or)?,
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.ident(),
                other => {
                    return Err(MatcherError::parse(
                        position,
                        format!("unexpected character `{}` in `{}`", other, self.source),
                    ))
                }
            };
            tokens.push(Spanned { token, position });
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn pair(&mut self, next: char, matched: Token, alone: Token) -> Token {
        if self.peek_next() == Some(next) {
            self.pos += 2;
            matched
        } else {
            self.pos += 1;
            alone
        }
    }

    fn double(&mut self, next: char, token: Token) -> Result<Token> {
        if self.peek_next() == Some(next) {
            self.pos += 2;
            Ok(token)
        } else {
            Err(MatcherError::parse(
                self.pos,
                format!("expected `{}` after `{}`", next, self.chars[self.pos]),
            ))
        }
    }

    fn string(&mut self, quote: char) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(MatcherError::parse(start, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Token::Str(out));
                }
                Some('\\') => {
                    let escaped = match self.peek_next() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c) => c,
                        None => {
                            return Err(MatcherError::parse(start, "unterminated string literal"))
                        }
                    };
                    out.push(escaped);
                    self.pos += 2;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let is_float = self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|e| MatcherError::parse(start, e.to_string()))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|e| MatcherError::parse(start, e.to_string()))
        }
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "in" => Token::In,
            _ => Token::Ident(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("a == b && !c || d != 1.5"),
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::Ident("b".into()),
                Token::And,
                Token::Not,
                Token::Ident("c".into()),
                Token::Or,
                Token::Ident("d".into()),
                Token::Ne,
                Token::Float(1.5),
            ]
        );
    }

    #[test]
    fn test_strings_and_indexing() {
        assert_eq!(
            tokens(r#"r_obj["Owner"] == 'bob'"#),
            vec![
                Token::Ident("r_obj".into()),
                Token::LBracket,
                Token::Str("Owner".into()),
                Token::RBracket,
                Token::Eq,
                Token::Str("bob".into()),
            ]
        );
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(
            tokens("r_attr[\"Идентификатор1\"]"),
            vec![
                Token::Ident("r_attr".into()),
                Token::LBracket,
                Token::Str("Идентификатор1".into()),
                Token::RBracket,
            ]
        );
        assert_eq!(tokens("Идентификатор"), vec![Token::Ident("Идентификатор".into())]);
    }

    #[test]
    fn test_single_ampersand_is_error() {
        assert!(Lexer::new("a & b").tokenize().is_err());
        assert!(Lexer::new("'open").tokenize().is_err());
    }
}
