use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Token, TokenKind},
    lexer::{LexError, Lexer},
    value::Value,
};

/// Errors raised while compiling rule source.
///
/// `context` fields hold the source with the offending token underlined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected {found}, expected {expected}\n{context}")]
    UnexpectedToken {
        found: String,
        expected: String,
        context: String,
    },

    #[error("invalid number '{lexeme}'\n{context}")]
    InvalidNumber { lexeme: String, context: String },

    #[error("malformed call to '{name}': {reason}\n{context}")]
    MalformedCall {
        name: String,
        reason: String,
        context: String,
    },

    /// Well-formed syntax with no meaning, such as assigning to a glob.
    #[error("{message}\n{context}")]
    Semantic { message: String, context: String },
}

/// Recursive-descent parser for rule bodies.
///
/// ```text
/// program   := statement (';' statement)* EOF
/// statement := '{' '}' | '{' statement (';' statement)* '}' | expr
/// expr      := or ('=' expr)?
/// or        := and ('or' and)*
/// and       := cmp ('and' cmp)*
/// cmp       := add (('<'|'>'|'<='|'>='|'=='|'!=') add)*
/// add       := mul (('+'|'-') mul)*
/// mul       := term (('*'|'/') term)*
/// term      := '(' expr ')' | NUMBER | STRING | VAR | VAR '(' args ')'
///            | '*' | '-' term
///            | 'if' expr 'then' statement ('else' statement)?
///            | 'edge_if' expr 'then' statement 'else' statement
///            | 'at' expr 'do' statement
/// ```
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser { lexer }
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.next()?)
    }

    fn peek(&mut self) -> Result<Token, ParseError> {
        let token = self.lexer.next()?;
        self.lexer.rewind()?;
        Ok(token)
    }

    fn check(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        Ok(self.peek()?.kind == kind)
    }

    fn check_op(&mut self, op: &str) -> Result<bool, ParseError> {
        Ok(self.peek()?.is_op(op))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.advance()?;
        if token.kind != kind {
            return Err(self.unexpected(&token, &kind.to_string()));
        }
        Ok(token)
    }

    fn unexpected(&self, found: &Token, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            found: found.to_string(),
            expected: expected.to_string(),
            context: self.lexer.position_to_string(),
        }
    }

    fn semantic(&self, message: String) -> ParseError {
        ParseError::Semantic {
            message,
            context: self.lexer.position_to_string(),
        }
    }

    /// Parse a complete rule body.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_sequence()?;
        self.expect(TokenKind::Eof)?;
        Ok(expr)
    }

    fn parse_sequence(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_statement()?;

        if self.check_op(";")? {
            self.advance()?;
            // Tolerate a trailing ';'
            if self.check(TokenKind::Eof)? {
                return Ok(first);
            }
            let rest = self.parse_sequence()?;
            return Ok(Expr::Sequence(Box::new(first), Box::new(rest)));
        }
        Ok(first)
    }

    fn parse_statement(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::OpenCurly)? {
            self.parse_block()
        } else {
            self.parse_expression()
        }
    }

    fn parse_block(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::OpenCurly)?;

        let mut stmts = vec![];
        if self.check(TokenKind::CloseCurly)? {
            self.advance()?;
            return Ok(Expr::Block(stmts));
        }

        loop {
            stmts.push(self.parse_statement()?);

            let token = self.advance()?;
            if token.is_op(";") {
                if self.check(TokenKind::CloseCurly)? {
                    self.advance()?;
                    break;
                }
            } else if token.kind == TokenKind::CloseCurly {
                break;
            } else {
                return Err(self.unexpected(&token, "';' or '}'"));
            }
        }
        Ok(Expr::Block(stmts))
    }

    /// Parse an expression, including a trailing assignment.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;

        if !self.check_op("=")? {
            return Ok(left);
        }
        self.advance()?;

        match left {
            Expr::Var(target) => {
                let value = self.parse_expression()?;
                Ok(Expr::Assign {
                    target,
                    value: Box::new(value),
                })
            }
            Expr::Glob(pattern) => Err(self.semantic(format!(
                "cannot assign to glob reference '{}'",
                pattern
            ))),
            other => Err(self.semantic(format!(
                "invalid assignment target {}; only variables can be assigned",
                other.describe()
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check_op("or")? {
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.check_op("and")? {
            self.advance()?;
            let right = self.parse_comparison()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let token = self.peek()?;
            let op = match (token.kind, token.lexeme.as_str()) {
                (TokenKind::Op, "==") => BinOp::Equal,
                (TokenKind::Op, "!=") => BinOp::NotEqual,
                (TokenKind::Op, "<") => BinOp::LessThan,
                (TokenKind::Op, ">") => BinOp::GreaterThan,
                (TokenKind::Op, "<=") => BinOp::LessEqual,
                (TokenKind::Op, ">=") => BinOp::GreaterEqual,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let token = self.peek()?;
            let op = match (token.kind, token.lexeme.as_str()) {
                (TokenKind::Op, "+") => BinOp::Add,
                (TokenKind::Op, "-") => BinOp::Subtract,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;

        loop {
            let token = self.peek()?;
            let op = match (token.kind, token.lexeme.as_str()) {
                (TokenKind::Op, "*") => BinOp::Multiply,
                (TokenKind::Op, "/") => BinOp::Divide,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// Parse atoms and the keyword forms.
    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::OpenParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::Number => match Value::parse_number(&token.lexeme) {
                Some(value) => Ok(Expr::Const(value)),
                None => Err(ParseError::InvalidNumber {
                    lexeme: token.lexeme,
                    context: self.lexer.position_to_string(),
                }),
            },
            TokenKind::String => Ok(Expr::Const(Value::String(token.lexeme))),
            TokenKind::Var => {
                let is_call = self.check(TokenKind::OpenParen)?;
                if token.is_glob() {
                    if is_call {
                        return Err(self.semantic(format!(
                            "'{}' is a glob reference and cannot be called",
                            token.lexeme
                        )));
                    }
                    Ok(Expr::Glob(token.lexeme))
                } else if is_call {
                    self.advance()?;
                    self.parse_call(token.lexeme)
                } else {
                    Ok(Expr::Var(token.lexeme))
                }
            }
            TokenKind::If => self.parse_if(),
            TokenKind::EdgeIf => self.parse_edge_if(),
            TokenKind::At => self.parse_at(),
            // A bare `*` reads every symbol.
            TokenKind::Op if token.lexeme == "*" => Ok(Expr::Glob(token.lexeme)),
            TokenKind::Op if token.lexeme == "-" => {
                let operand = self.parse_term()?;
                Ok(Expr::Negate(Box::new(operand)))
            }
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    /// Arguments after the opening parenthesis.
    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        let mut args = vec![];

        if self.check(TokenKind::CloseParen)? {
            self.advance()?;
            return Ok(Expr::Call { name, args });
        }

        loop {
            args.push(self.parse_expression()?);

            let token = self.advance()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::CloseParen => break,
                _ => {
                    return Err(ParseError::MalformedCall {
                        name,
                        reason: format!("expected ',' or ')', got {}", token),
                        context: self.lexer.position_to_string(),
                    });
                }
            }
        }
        Ok(Expr::Call { name, args })
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Then)?;
        let then_branch = self.parse_statement()?;

        let else_branch = if self.check(TokenKind::Else)? {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_edge_if(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Then)?;
        let on_true = self.parse_statement()?;
        self.expect(TokenKind::Else)?;
        let on_false = self.parse_statement()?;
        Ok(Expr::edge_if(cond, on_true, on_false))
    }

    fn parse_at(&mut self) -> Result<Expr, ParseError> {
        let watch = self.parse_expression()?;
        self.expect(TokenKind::Do)?;
        let action = self.parse_statement()?;
        Ok(Expr::at(watch, action))
    }
}

/// Compile rule source into an expression tree.
pub fn parse_program(source: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(source)).parse()
}
