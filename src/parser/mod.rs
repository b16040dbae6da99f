use crate::ast::*;
use crate::lexer::Token;

/// Deepest AST the parser will build. Parens, unary operators, blocks and each
/// operator in a binary chain all add a level; the compiler recurses over the
/// same tree, so this bounds both.
pub const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    depth: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Span of the current token, or of the last token once input is exhausted.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or(Span::UNKNOWN)
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].1
        } else {
            Span::UNKNOWN
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Describe the current token for messages.
    fn found(&self) -> String {
        match self.peek() {
            Some(tok) => tok.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn error(&self, code: &'static str, message: String) -> ParseError {
        ParseError {
            code,
            position: self.pos,
            span: self.peek_span(),
            message,
        }
    }

    fn expect(&mut self, expected: &Token, code: &'static str, what: &str) -> Result<Span> {
        match self.peek() {
            Some(tok) if tok == expected => {
                let span = self.peek_span();
                self.advance();
                Ok(span)
            }
            _ => Err(self.error(code, format!("expected {}, found {}", what, self.found()))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("ARC-P002", format!("expected identifier, found {}", self.found()))),
        }
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(
                "ARC-P009",
                format!("expression nested too deeply (more than {} levels)", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    fn ascend(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn skip_separators(&mut self) {
        while self.peek() == Some(&Token::Semi) {
            self.advance();
        }
    }

    // ---- Program & blocks ----

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut body = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => break,
                Some(Token::RBrace) => {
                    return Err(self.error("ARC-P006", "unmatched '}' with no open block".into()));
                }
                Some(_) => body.push(self.parse_stmt()?),
            }
        }
        Ok(Program { body, source: None })
    }

    /// `{ stmt* }`, possibly empty
    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&Token::LBrace, "ARC-P004", "'{' to open block")?;
        let open = self.prev_span();
        self.descend()?;
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    self.ascend(1);
                    return Ok(stmts);
                }
                None => {
                    let mut err = self.error(
                        "ARC-P005",
                        "expected '}' to close block, found end of input".into(),
                    );
                    err.span = open;
                    return Err(err);
                }
                Some(_) => stmts.push(self.parse_stmt()?),
            }
        }
    }

    // ---- Statements ----

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Token::Let) => self.parse_let(),
            Some(Token::Ident(_)) => self.parse_assign(),
            Some(Token::If) => {
                self.advance();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::If { condition, body })
            }
            Some(Token::While) => {
                self.advance();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While { condition, body })
            }
            Some(Token::Break) => {
                let span = self.peek_span();
                self.advance();
                Ok(Stmt::Break { span })
            }
            Some(Token::Return) => {
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::Return { value })
            }
            _ => Err(self.error("ARC-P001", format!("expected statement, found {}", self.found()))),
        }
    }

    /// `let name = expr`
    fn parse_let(&mut self) -> Result<Stmt> {
        let start = self.peek_span();
        self.advance();
        let name = self.expect_ident()?;
        self.expect(&Token::Assign, "ARC-P003", "'=' after variable name")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Let { name, value, span: start.merge(self.prev_span()) })
    }

    /// `name = expr`
    fn parse_assign(&mut self) -> Result<Stmt> {
        let start = self.peek_span();
        let name = self.expect_ident()?;
        self.expect(&Token::Assign, "ARC-P003", "'=' after variable name")?;
        let value = self.parse_expr()?;
        Ok(Stmt::Assign { name, value, span: start.merge(self.prev_span()) })
    }

    // ---- Expressions, lowest precedence first ----

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_equality()
    }

    /// One left-associative precedence level. Each operator in the chain
    /// deepens the left spine of the tree by one.
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr>,
        operator: fn(&Token) -> Option<BinOp>,
    ) -> Result<Expr> {
        let mut left = operand(self)?;
        let mut chained = 0;
        while let Some(op) = self.peek().and_then(operator) {
            self.advance();
            self.descend()?;
            chained += 1;
            let right = operand(self)?;
            left = Expr::binary(op, left, right);
        }
        self.ascend(chained);
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_relational, |tok| match tok {
            Token::EqEq => Some(BinOp::Equals),
            Token::NotEq => Some(BinOp::NotEquals),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_additive, |tok| match tok {
            Token::Less => Some(BinOp::LessThan),
            Token::Greater => Some(BinOp::GreaterThan),
            Token::LessEq => Some(BinOp::LessOrEqual),
            Token::GreaterEq => Some(BinOp::GreaterOrEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_multiplicative, |tok| match tok {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_unary, |tok| match tok {
            Token::Star => Some(BinOp::Multiply),
            Token::Slash => Some(BinOp::Divide),
            Token::Percent => Some(BinOp::Modulo),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            _ => return self.parse_primary(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_unary()?;
        self.ascend(1);
        Ok(Expr::unary(op, operand))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.peek_span();
        match self.peek().cloned() {
            Some(Token::Int(n)) => {
                self.advance();
                Ok(Expr::int(n))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::bool(true))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::bool(false))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Expr::Ref { name, span })
            }
            Some(Token::LParen) => {
                self.advance();
                self.descend()?;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "ARC-P008", "')' to close parenthesized expression")?;
                self.ascend(1);
                Ok(inner)
            }
            _ => {
                let prev = self.pos.checked_sub(1).map(|i| &self.tokens[i].0);
                let message = match prev {
                    Some(op) if is_operator(op) => {
                        format!("expected expression after {}, found {}", op, self.found())
                    }
                    _ => format!("expected expression, found {}", self.found()),
                };
                Err(self.error("ARC-P007", message))
            }
        }
    }
}

fn is_operator(tok: &Token) -> bool {
    matches!(
        tok,
        Token::Plus
            | Token::Minus
            | Token::Star
            | Token::Slash
            | Token::Percent
            | Token::EqEq
            | Token::NotEq
            | Token::Less
            | Token::Greater
            | Token::LessEq
            | Token::GreaterEq
            | Token::Bang
            | Token::Assign
    )
}

/// Parse a token stream into a program, stopping at the first syntax error.
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    debug_assert!(parser.at_end());
    tracing::debug!(statements = program.body.len(), "parsed program");
    Ok(program)
}
