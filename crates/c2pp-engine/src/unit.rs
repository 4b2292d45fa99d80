//! The translation unit as it moves through the passes.

use crate::token::{Token, TokenKind};
use c2pp_common::{Diagnostic, Span};
use indexmap::IndexMap;
use smol_str::SmolStr;

/// One member of a struct, as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub ty: String,
    pub name: SmolStr,
    /// Array extents and bit widths, e.g. `[50]`.
    pub suffix: String,
    /// The declaration as written, without the semicolon.
    pub text: String,
}

impl Field {
    pub fn declaration(&self) -> String {
        format!("{};", self.text)
    }
}

/// How a method's former first parameter referred to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Pointer,
    Reference,
}

impl Receiver {
    /// Member-call operator for a call site whose object has this shape.
    pub fn call_operator(self) -> &'static str {
        match self {
            Receiver::Pointer => "->",
            Receiver::Reference => ".",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub owner: SmolStr,
    pub return_type: String,
    pub name: SmolStr,
    /// Parameter list with the receiver removed.
    pub params: String,
    pub receiver: Receiver,
    pub self_name: SmolStr,
    /// Tokens between the braces of the definition.
    pub body: Vec<Token>,
    pub is_const: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructRecord {
    pub name: SmolStr,
    pub fields: Vec<Field>,
    pub methods: Vec<MethodRecord>,
    pub span: Span,
}

impl StructRecord {
    pub fn new(name: SmolStr, fields: Vec<Field>, span: Span) -> Self {
        Self {
            name,
            fields,
            methods: Vec::new(),
            span,
        }
    }
}

/// Structs discovered in the unit, in first-definition order.
pub type StructCatalog = IndexMap<SmolStr, StructRecord>;

/// Everything the passes produce before rendering.
#[derive(Debug, Default)]
pub struct Unit {
    pub includes: Vec<String>,
    pub constants: Vec<String>,
    pub structs: StructCatalog,
    /// Code that is not moved into a dedicated section.
    pub body: Vec<Token>,
    pub needs_iomanip: bool,
    pub needs_functional: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Unit {
    pub fn new(body: Vec<Token>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Every token sequence that still holds code: method bodies, then the body.
    pub fn sequences(&self) -> impl Iterator<Item = &[Token]> {
        self.structs
            .values()
            .flat_map(|s| s.methods.iter().map(|m| m.body.as_slice()))
            .chain(std::iter::once(self.body.as_slice()))
    }

    /// Apply `f` to every code sequence, in the same order as [`Unit::sequences`].
    pub fn rewrite_sequences(&mut self, mut f: impl FnMut(&mut Vec<Token>, &mut Vec<Diagnostic>)) {
        for record in self.structs.values_mut() {
            for method in &mut record.methods {
                f(&mut method.body, &mut self.diagnostics);
            }
        }
        f(&mut self.body, &mut self.diagnostics);
    }
}

/// Remove the token at `idx` along with the line break that ends its line.
pub fn remove_line(tokens: &mut Vec<Token>, idx: usize) {
    remove_range(tokens, idx, idx);
}

/// Remove `tokens[start..=end]` and the line break after it. Blank lines
/// left around the hole collapse to at most one.
pub fn remove_range(tokens: &mut Vec<Token>, start: usize, end: usize) {
    tokens.drain(start..=end);
    if tokens.get(start).map_or(false, |t| t.text == "\r") {
        tokens.remove(start);
    }
    let rest = match tokens.get(start) {
        Some(next) if next.kind == TokenKind::Whitespace => next
            .text
            .strip_prefix("\r\n")
            .or_else(|| next.text.strip_prefix('\n'))
            .map(SmolStr::new),
        _ => None,
    };
    if let Some(rest) = rest {
        if rest.is_empty() {
            tokens.remove(start);
        } else {
            tokens[start].text = rest;
        }
    }

    let prev_ws = start > 0 && tokens[start - 1].kind == TokenKind::Whitespace;
    let next_ws = tokens.get(start).map_or(false, |t| t.kind == TokenKind::Whitespace);
    if prev_ws && next_ws {
        let merged = format!("{}{}", tokens[start - 1].text, tokens[start].text);
        tokens[start - 1].text = SmolStr::new(cap_blank_lines(&merged));
        tokens[start - 1].span = tokens[start - 1].span.merge(tokens[start].span);
        tokens.remove(start);
    }
}

fn cap_blank_lines(ws: &str) -> String {
    if ws.matches('\n').count() <= 2 {
        return ws.to_string();
    }
    let indent = ws.rsplit('\n').next().unwrap_or("");
    format!("\n\n{}", indent)
}
