pub mod ansi;
pub mod json;

use crate::ast::Span;
use crate::bytecode::format::ArtifactError;
use crate::compiler::CompileError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::vm::{Fault, VmError};

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// A renderable error report. Built from any stage's error type, then handed to
/// [`ansi::AnsiRenderer`] or [`json::render`].
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into() });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the source text so renderers can show the offending line.
    /// Only meaningful for diagnostics whose labels point into that source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for each stage's error type ----

impl From<&LexError> for Diagnostic {
    fn from(e: &LexError) -> Self {
        let span = Span { start: e.position, end: e.position + e.snippet.len().max(1) };
        let mut d = Diagnostic::error(format!("illegal character '{}'", e.snippet))
            .with_code("ARC-L001")
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_span(e.span, "here")
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        match e {
            CompileError::UndefinedVariable { name, span } => Diagnostic::error(e.to_string())
                .with_code("ARC-C001")
                .with_span(*span, "not bound by any earlier assignment")
                .with_suggestion(format!("bind it first, e.g. 'let {name} = 0'")),
            CompileError::IllegalBreak { span } => Diagnostic::error(e.to_string())
                .with_code("ARC-C002")
                .with_span(*span, "not inside a loop body")
                .with_note("'break' exits the innermost enclosing 'while'"),
            CompileError::TooLarge { .. } => Diagnostic::error(e.to_string()).with_code("ARC-C003"),
        }
    }
}

impl From<&ArtifactError> for Diagnostic {
    fn from(e: &ArtifactError) -> Self {
        Diagnostic::error(e.to_string())
            .with_code("ARC-A001")
            .with_note("rebuild the artifact with 'arc build'")
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        let code = match e.fault {
            Fault::TypeMismatch { .. } => "ARC-R001",
            Fault::DivisionByZero => "ARC-R002",
            Fault::ArithmeticOverflow { .. } => "ARC-R003",
            Fault::UnboundVariable { .. } => "ARC-R004",
            Fault::NoReturnValue => "ARC-R005",
            Fault::CorruptArtifact(_) => "ARC-A001",
        };
        let d = Diagnostic::error(e.fault.to_string())
            .with_code(code)
            .with_note(format!("at instruction {}", e.pc));
        match e.fault {
            Fault::NoReturnValue => d.with_suggestion("end the program with 'return <expr>'"),
            _ => d,
        }
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Lex(e) => e.into(),
            crate::Error::Parse(e) => e.into(),
            crate::Error::Compile(e) => e.into(),
            crate::Error::Artifact(e) => e.into(),
            crate::Error::Vm(e) => e.into(),
            crate::Error::Io { .. } => Diagnostic::error(e.to_string()).with_code("ARC-IO01"),
        }
    }
}
