use std::fmt;

/// Lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input
    Eof,

    /// Variable, glob or function name
    ///
    /// Starts with a letter, `_`, `%` or `.`, followed by letters, digits or
    /// any of `_ - % . * ?`. A `*` or `?` anywhere makes it a glob reference.
    ///
    /// # Examples
    /// ```text
    /// cpu.0
    /// disk-free
    /// %
    /// cpu.*
    /// ```
    Var,

    /// Operator
    ///
    /// # Examples
    /// ```text
    /// + - * / = ; < > <= >= == != and or
    /// ```
    Op,

    /// String literal enclosed in double quotes, no escapes
    ///
    /// # Examples
    /// ```text
    /// "high load"
    /// ```
    String,

    /// Digit-leading run of digits and `.`
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// ```
    Number,

    /// Left parenthesis for grouping or function calls
    OpenParen,

    /// Right parenthesis
    CloseParen,

    /// Left brace opening a block
    OpenCurly,

    /// Right brace
    CloseCurly,

    /// Comma separating function arguments
    Comma,

    /// `if` keyword
    If,

    /// `edge_if` keyword
    ///
    /// # Examples
    /// ```text
    /// edge_if load > 2 then alarm = 1 else alarm = 0
    /// ```
    EdgeIf,

    /// `then` keyword
    Then,

    /// `else` keyword
    Else,

    /// `at` keyword
    ///
    /// # Examples
    /// ```text
    /// at hour do print("cpu.*")
    /// ```
    At,

    /// `do` keyword
    Do,

    /// A lone operator character that has no meaning on its own (`!`)
    Invalid,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "end of input",
            TokenKind::Var => "variable",
            TokenKind::Op => "operator",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenCurly => "'{'",
            TokenKind::CloseCurly => "'}'",
            TokenKind::Comma => "','",
            TokenKind::If => "'if'",
            TokenKind::EdgeIf => "'edge_if'",
            TokenKind::Then => "'then'",
            TokenKind::Else => "'else'",
            TokenKind::At => "'at'",
            TokenKind::Do => "'do'",
            TokenKind::Invalid => "invalid token",
        };
        f.write_str(name)
    }
}

/// A lexeme together with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, kind: TokenKind) -> Self {
        Token {
            lexeme: lexeme.into(),
            kind,
        }
    }

    pub fn eof() -> Self {
        Token::new("", TokenKind::Eof)
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.lexeme == op
    }

    /// True for variables that contain a glob marker (`*` or `?`).
    pub fn is_glob(&self) -> bool {
        self.kind == TokenKind::Var && self.lexeme.contains(['*', '?'])
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "{}", self.kind),
            _ => write!(f, "{} '{}'", self.kind, self.lexeme),
        }
    }
}
