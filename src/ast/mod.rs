use serde::{Deserialize, Serialize};

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---- Core AST types ----

/// Statements. Blocks are plain `Vec<Stmt>`; there is one flat variable scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `let name = expr`
    Let {
        name: String,
        value: Expr,
        #[serde(skip)]
        span: Span,
    },

    /// `name = expr`; creates the variable if it was never bound
    Assign {
        name: String,
        value: Expr,
        #[serde(skip)]
        span: Span,
    },

    /// `if cond { body }`
    If { condition: Expr, body: Vec<Stmt> },

    /// `while cond { body }`
    While { condition: Expr, body: Vec<Stmt> },

    /// `break`
    Break {
        #[serde(skip)]
        span: Span,
    },

    /// `return expr`, halts the whole program
    Return { value: Expr },
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Variable reference
    Ref {
        name: String,
        #[serde(skip)]
        span: Span,
    },

    /// `!expr` (logical) or `-expr` (numeric)
    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    /// Infix binary op: `a + b`, `a == b`
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n))
    }

    pub fn bool(b: bool) -> Expr {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Ref { name: name.into(), span: Span::UNKNOWN }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::BinOp { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::UnaryOp { op, operand: Box::new(operand) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// A complete program is the top-level block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    #[serde(skip)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_unknown_is_zero() {
        assert_eq!(Span::UNKNOWN, Span { start: 0, end: 0 });
    }

    #[test]
    fn span_merge_takes_extremes() {
        let a = Span { start: 5, end: 10 };
        let b = Span { start: 2, end: 15 };
        assert_eq!(a.merge(b), Span { start: 2, end: 15 });
    }

    #[test]
    fn span_merge_non_overlapping() {
        let a = Span { start: 0, end: 5 };
        let b = Span { start: 10, end: 20 };
        assert_eq!(a.merge(b), Span { start: 0, end: 20 });
    }

    #[test]
    fn stmt_span_not_serialized() {
        let stmt = Stmt::Let {
            name: "a".to_string(),
            value: Expr::int(5),
            span: Span { start: 0, end: 9 },
        };
        let json = serde_json::to_string(&stmt).unwrap();
        assert!(!json.contains("span"));
        assert!(json.contains("Let"));
    }

    #[test]
    fn program_source_not_serialized() {
        let prog = Program {
            body: vec![Stmt::Return { value: Expr::int(1) }],
            source: Some("return 1".to_string()),
        };
        let json = serde_json::to_string(&prog).unwrap();
        assert!(!json.contains("source"));
        assert!(!json.contains("return 1"));
    }

    #[test]
    fn program_json_round_trip() {
        let prog = Program {
            body: vec![
                Stmt::Let { name: "x".to_string(), value: Expr::int(9), span: Span { start: 0, end: 9 } },
                Stmt::While {
                    condition: Expr::binary(BinOp::LessThan, Expr::var("x"), Expr::int(10)),
                    body: vec![Stmt::Break { span: Span { start: 20, end: 25 } }],
                },
                Stmt::Return { value: Expr::unary(UnaryOp::Negate, Expr::var("x")) },
            ],
            source: Some("...".to_string()),
        };
        let json = serde_json::to_string_pretty(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        // Spans and source are dropped, structure survives
        assert_eq!(back.body.len(), 3);
        assert!(back.source.is_none());
        assert!(matches!(back.body[1], Stmt::While { .. }));
        assert!(matches!(back.body[2], Stmt::Return { value: Expr::UnaryOp { op: UnaryOp::Negate, .. } }));
    }
}
