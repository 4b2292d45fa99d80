//! Object-like macros with a single literal value become typed constants.

use crate::lexer::tokenize;
use crate::token::{significant, TokenKind};
use crate::unit::{remove_line, Unit};
use c2pp_common::{Diagnostic, DiagnosticKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Define {
    /// `#define NAME literal`
    Constant { name: String, ty: &'static str, value: String },
    /// `#define NAME(args) ...`
    FunctionLike { name: String },
    /// `#define NAME` or `#define NAME expr`
    Other { name: String },
}

impl Define {
    pub fn declaration(&self) -> Option<String> {
        match self {
            Define::Constant { name, ty, value } => Some(format!("const {} {} = {};", ty, name, value)),
            _ => None,
        }
    }
}

/// Classify a `#define` directive. Returns `None` for other directives.
pub fn parse_define(directive: &str) -> Option<Define> {
    let rest = directive.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("define")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| c != '_' && !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let name = rest[..name_len].to_string();
    let value = &rest[name_len..];
    if value.starts_with('(') {
        return Some(Define::FunctionLike { name });
    }

    let value = value.replace("\\\r\n", " ").replace("\\\n", " ");
    let tokens = tokenize(&value);
    let sig = significant(&tokens);
    let literal = match sig.as_slice() {
        [lit] if lit.is_literal() => Some((lit.kind, lit.text.to_string())),
        [minus, lit] if minus.is_punct("-") && lit.kind == TokenKind::Number => {
            Some((lit.kind, format!("-{}", lit.text)))
        }
        _ => None,
    };
    Some(match literal {
        Some((kind, value)) => Define::Constant {
            ty: constant_type(kind, &value),
            name,
            value,
        },
        None => Define::Other { name },
    })
}

fn constant_type(kind: TokenKind, literal: &str) -> &'static str {
    match kind {
        TokenKind::Str => "string",
        TokenKind::Char => "char",
        _ if is_floating(literal) => "double",
        _ => "int",
    }
}

fn is_floating(literal: &str) -> bool {
    let digits = literal.trim_start_matches('-');
    if digits.starts_with("0x") || digits.starts_with("0X") {
        return digits.contains(['p', 'P']);
    }
    digits.contains(['.', 'e', 'E']) || digits.ends_with(['f', 'F'])
}

pub fn run(unit: &mut Unit) {
    let mut i = 0;
    while i < unit.body.len() {
        let tok = &unit.body[i];
        if tok.kind != TokenKind::Directive {
            i += 1;
            continue;
        }
        let span = tok.span;
        match parse_define(&tok.text) {
            Some(define @ Define::Constant { .. }) => {
                tracing::trace!(?define, "macro to constant");
                unit.constants.extend(define.declaration());
                remove_line(&mut unit.body, i);
                continue;
            }
            Some(Define::FunctionLike { name }) => unit.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::FunctionLikeMacro,
                    format!("function-like macro `{}` left as a macro", name),
                )
                .with_span(span)
                .with_label("kept verbatim")
                .with_help("consider an inline function"),
            ),
            Some(Define::Other { name }) => unit.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::NonLiteralMacro,
                    format!("macro `{}` is not a single literal and was left as a macro", name),
                )
                .with_span(span)
                .with_label("kept verbatim"),
            ),
            None => {}
        }
        i += 1;
    }
    tracing::debug!(constants = unit.constants.len(), "macro pass complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::render;

    fn constant(directive: &str) -> Option<String> {
        parse_define(directive).and_then(|d| d.declaration())
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(constant("#define MAX_SIZE 100").as_deref(), Some("const int MAX_SIZE = 100;"));
        assert_eq!(constant("#define PI 3.14159").as_deref(), Some("const double PI = 3.14159;"));
        assert_eq!(constant("#define EPS 1e-9").as_deref(), Some("const double EPS = 1e-9;"));
        assert_eq!(constant("#define NAME \"c2pp\"").as_deref(), Some("const string NAME = \"c2pp\";"));
        assert_eq!(constant("#define SEP ','").as_deref(), Some("const char SEP = ',';"));
        assert_eq!(constant("#define MASK 0xFF").as_deref(), Some("const int MASK = 0xFF;"));
        assert_eq!(constant("#define LOW -40").as_deref(), Some("const int LOW = -40;"));
    }

    #[test]
    fn test_trailing_comment_ignored() {
        assert_eq!(
            constant("#define LIMIT 10 /* items */").as_deref(),
            Some("const int LIMIT = 10;")
        );
    }

    #[test]
    fn test_non_literals_are_not_constants() {
        assert!(matches!(parse_define("#define SQ(x) ((x)*(x))"), Some(Define::FunctionLike { .. })));
        assert!(matches!(parse_define("#define DEBUG"), Some(Define::Other { .. })));
        assert!(matches!(parse_define("#define TWICE (2 * N)"), Some(Define::Other { .. })));
        assert_eq!(parse_define("#include <stdio.h>"), None);
        assert_eq!(parse_define("#defined X"), None);
    }

    #[test]
    fn test_space_before_paren_is_object_like() {
        assert!(matches!(parse_define("#define NEG (-1)"), Some(Define::Other { .. })));
    }

    #[test]
    fn test_run_moves_constants_in_order() {
        let mut unit = Unit::new(tokenize(
            "#define B 2\n#define SQ(x) ((x)*(x))\n#define A 1\nint main() {}\n",
        ));
        run(&mut unit);
        assert_eq!(unit.constants, vec!["const int B = 2;", "const int A = 1;"]);
        assert_eq!(render(&unit.body), "#define SQ(x) ((x)*(x))\nint main() {}\n");
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::FunctionLikeMacro);
    }

    #[test]
    fn test_define_inside_string_is_untouched() {
        let source = "const char *s = \"#define X 1\";\n";
        let mut unit = Unit::new(tokenize(source));
        run(&mut unit);
        assert!(unit.constants.is_empty());
        assert_eq!(render(&unit.body), source);
    }
}
