use thiserror::Error;

use crate::ast::{Token, TokenKind};

const OPERATOR_CHARS: &str = "+-*/=<>!;";
const IDENTIFIER_EXTRA_CHARS: &str = "_-%.*?";

/// Errors raised while scanning source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("rewind called twice without reading a token in between")]
    RewindUnavailable,
}

/// Splits rule source into tokens, with one token of rewind.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    last: Option<Token>,
    token_start: usize,
    rewound: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            last: None,
            token_start: 0,
            rewound: false,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if accept(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_identifier(&mut self) -> String {
        self.read_while(|ch| ch.is_alphanumeric() || IDENTIFIER_EXTRA_CHARS.contains(ch))
    }

    fn read_number(&mut self) -> String {
        self.read_while(|ch| ch.is_ascii_digit() || ch == '.')
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.position;
        self.advance(); // opening quote

        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '"' {
                return Ok(result);
            }
            result.push(ch);
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_operator(&mut self) -> String {
        let mut op = String::new();
        if let Some(ch) = self.current_char() {
            op.push(ch);
            self.advance();
            if "<>=!".contains(ch) && self.current_char() == Some('=') {
                op.push('=');
                self.advance();
            }
        }
        op
    }

    /// Returns the next token, or the previous one again after a
    /// [`rewind`](Lexer::rewind).
    pub fn next(&mut self) -> Result<Token, LexError> {
        if self.rewound
            && let Some(token) = &self.last
        {
            self.rewound = false;
            return Ok(token.clone());
        }

        let token = self.scan()?;
        self.last = Some(token.clone());
        Ok(token)
    }

    /// Un-reads the last token. Only one token can be un-read.
    pub fn rewind(&mut self) -> Result<(), LexError> {
        if self.rewound || self.last.is_none() {
            return Err(LexError::RewindUnavailable);
        }
        self.rewound = true;
        Ok(())
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::eof());
        };

        let token = match ch {
            '(' => self.single(TokenKind::OpenParen),
            ')' => self.single(TokenKind::CloseParen),
            '{' => self.single(TokenKind::OpenCurly),
            '}' => self.single(TokenKind::CloseCurly),
            ',' => self.single(TokenKind::Comma),
            '"' => Token::new(self.read_string()?, TokenKind::String),
            c if c.is_ascii_digit() => Token::new(self.read_number(), TokenKind::Number),
            c if c.is_alphabetic() || c == '_' || c == '%' || c == '.' => {
                Token::new(self.read_identifier(), TokenKind::Var)
            }
            c if OPERATOR_CHARS.contains(c) => Token::new(self.read_operator(), TokenKind::Op),
            c => {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    position: self.position,
                });
            }
        };

        Ok(reclassify(token))
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let ch = self.current_char().map(String::from).unwrap_or_default();
        self.advance();
        Token::new(ch, kind)
    }

    /// Renders the source with the most recent token underlined.
    ///
    /// ```text
    /// a > = 3
    ///     ^
    /// ```
    pub fn position_to_string(&self) -> String {
        let source: String = self.input.iter().collect();
        let width = if self.position > self.token_start {
            self.position - self.token_start
        } else {
            1
        };
        format!(
            "{}\n{}{}",
            source,
            " ".repeat(self.token_start),
            "^".repeat(width)
        )
    }

    /// Character offset of the most recent token.
    pub fn token_position(&self) -> usize {
        self.token_start
    }
}

/// Keywords and word operators are scanned as variables first, then mapped
/// to their own kinds here.
fn reclassify(token: Token) -> Token {
    let kind = match (token.kind, token.lexeme.as_str()) {
        (TokenKind::Var, "if") => TokenKind::If,
        (TokenKind::Var, "then") => TokenKind::Then,
        (TokenKind::Var, "else") => TokenKind::Else,
        (TokenKind::Var, "edge_if") => TokenKind::EdgeIf,
        (TokenKind::Var, "at") => TokenKind::At,
        (TokenKind::Var, "do") => TokenKind::Do,
        (TokenKind::Var, "and" | "or") => TokenKind::Op,
        (TokenKind::Op, "!") => TokenKind::Invalid,
        (kind, _) => kind,
    };
    Token { kind, ..token }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("if then else edge_if at do and or");
    assert_eq!(lexer.next().unwrap().kind, TokenKind::If);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Then);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Else);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::EdgeIf);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::At);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Do);
    assert_eq!(lexer.next().unwrap(), Token::new("and", TokenKind::Op));
    assert_eq!(lexer.next().unwrap(), Token::new("or", TokenKind::Op));
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_rule_body() {
    let mut lexer = Lexer::new("total = sum(cpu.*) / 4");
    assert_eq!(lexer.next().unwrap(), Token::new("total", TokenKind::Var));
    assert_eq!(lexer.next().unwrap(), Token::new("=", TokenKind::Op));
    assert_eq!(lexer.next().unwrap(), Token::new("sum", TokenKind::Var));
    assert_eq!(lexer.next().unwrap().kind, TokenKind::OpenParen);
    assert_eq!(lexer.next().unwrap(), Token::new("cpu.*", TokenKind::Var));
    assert_eq!(lexer.next().unwrap().kind, TokenKind::CloseParen);
    assert_eq!(lexer.next().unwrap(), Token::new("/", TokenKind::Op));
    assert_eq!(lexer.next().unwrap(), Token::new("4", TokenKind::Number));
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}
