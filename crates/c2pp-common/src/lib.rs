//! Shared types for the translator: source spans, line lookup and diagnostics.

mod span;
mod source;
mod diagnostic;

pub use span::Span;
pub use source::SourceFile;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticLevel};
