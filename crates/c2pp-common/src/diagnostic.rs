//! Diagnostics for constructs the translator left alone or resolved by a tie-break.
//!
//! Translation never fails. A diagnostic records where the output is a
//! verbatim copy of the input (or a guess) so callers can surface it. The
//! `miette` derive makes each one renderable against the original text.

use crate::source::SourceFile;
use crate::span::Span;
use miette::{Diagnostic as MietteDiagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Info,
}

/// The construct a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnterminatedLiteral,
    FunctionLikeMacro,
    NonLiteralMacro,
    DuplicateStruct,
    AmbiguousCall,
    UnrecognizedAllocation,
    UnmatchedFree,
    NonLiteralFormat,
    FormatMismatch,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnterminatedLiteral => "unterminated-literal",
            DiagnosticKind::FunctionLikeMacro => "function-like-macro",
            DiagnosticKind::NonLiteralMacro => "non-literal-macro",
            DiagnosticKind::DuplicateStruct => "duplicate-struct",
            DiagnosticKind::AmbiguousCall => "ambiguous-call",
            DiagnosticKind::UnrecognizedAllocation => "unrecognized-allocation",
            DiagnosticKind::UnmatchedFree => "unmatched-free",
            DiagnosticKind::NonLiteralFormat => "non-literal-format",
            DiagnosticKind::FormatMismatch => "format-mismatch",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("{message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub level: DiagnosticLevel,
    pub message: String,
    #[label("{label}")]
    pub span: Option<SourceSpan>,
    pub label: String,
    #[help]
    pub help: Option<String>,
    /// 1-based line and column, filled in by [`Diagnostic::locate`].
    pub location: Option<(u32, u32)>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_level(kind, DiagnosticLevel::Warning, message)
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_level(kind, DiagnosticLevel::Info, message)
    }

    fn with_level(kind: DiagnosticKind, level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            kind,
            level,
            message: message.into(),
            span: None,
            label: String::new(),
            help: None,
            location: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(SourceSpan::new((span.start as usize).into(), span.len() as usize));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Resolve the span offset to a line and column in `source`.
    pub fn locate(mut self, source: &SourceFile) -> Self {
        if let Some(span) = self.span {
            let (line, col) = source.line_col(span.offset() as u32);
            self.location = Some((line + 1, col + 1));
        }
        self
    }

    pub fn offset(&self) -> Option<usize> {
        self.span.map(|s| s.offset())
    }
}
