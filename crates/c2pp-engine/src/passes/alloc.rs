//! `malloc`/`calloc`/`free` to `new`/`delete`.

use crate::lexer::synthesize;
use crate::token::{
    compact, matching_close, matching_open, next_significant, prev_significant, significant, span_of,
    split_top_level, Token,
};
use crate::unit::Unit;
use c2pp_common::{Diagnostic, DiagnosticKind};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocShape {
    Single,
    Array,
}

/// A recognized allocation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub ty: String,
    pub count: Option<String>,
    pub zeroed: bool,
}

impl Allocation {
    pub fn shape(&self) -> AllocShape {
        if self.count.is_some() {
            AllocShape::Array
        } else {
            AllocShape::Single
        }
    }

    pub fn expression(&self) -> String {
        match (&self.count, self.zeroed) {
            (Some(n), true) => format!("new {}[{}]()", self.ty, n),
            (Some(n), false) => format!("new {}[{}]", self.ty, n),
            (None, _) => format!("new {}", self.ty),
        }
    }
}

pub fn run(unit: &mut Unit) {
    let types = known_types(unit);
    let mut targets: FxHashMap<String, AllocShape> = FxHashMap::default();
    unit.rewrite_sequences(|tokens, diagnostics| rewrite_allocations(tokens, &types, &mut targets, diagnostics));
    let mut frees = 0usize;
    unit.rewrite_sequences(|tokens, diagnostics| frees += rewrite_frees(tokens, &targets, diagnostics));
    tracing::debug!(allocations = targets.len(), frees, "allocation pass complete");
}

/// Words that may spell a type without being declared in the unit.
const BUILTIN_TYPE_WORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "bool", "_Bool", "size_t",
    "ssize_t", "ptrdiff_t", "intptr_t", "uintptr_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t",
    "uint16_t", "uint32_t", "uint64_t", "FILE",
];

/// Struct names plus every top-level `typedef ... Name;` in the body.
fn known_types(unit: &Unit) -> FxHashSet<SmolStr> {
    let mut types: FxHashSet<SmolStr> = unit.structs.keys().cloned().collect();
    let tokens = &unit.body;
    let mut i = 0;
    while i < tokens.len() {
        if !tokens[i].is_word("typedef") {
            i += 1;
            continue;
        }
        let mut depth = 0i32;
        let mut end = i + 1;
        while end < tokens.len() {
            match tokens[end].text.as_str() {
                _ if tokens[end].is_trivia() || tokens[end].is_literal() => {}
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                ";" if depth == 0 => break,
                _ => {}
            }
            end += 1;
        }
        if let Some(name) = prev_significant(tokens, end).filter(|&n| n > i && tokens[n].is_ident()) {
            types.insert(tokens[name].text.clone());
        }
        i = end + 1;
    }
    types
}

/// Type named by a `sizeof` operand, with `struct` dropped. Only operands
/// spelling a known type are accepted, never an expression.
fn sizeof_type(tokens: &[&Token], types: &FxHashSet<SmolStr>) -> Option<String> {
    let [kw, open, inner @ .., close] = tokens else { return None };
    if !kw.is_word("sizeof") || !open.is_punct("(") || !close.is_punct(")") {
        return None;
    }
    let (tagged, inner) = match inner {
        [s, rest @ ..] if s.is_word("struct") => (true, rest),
        _ => (false, inner),
    };
    // Words first, then only pointer stars.
    let words = inner.iter().take_while(|t| t.is_ident()).count();
    if words == 0 || inner[words..].iter().any(|t| !t.is_punct("*")) {
        return None;
    }
    let named = if tagged {
        words == 1
    } else {
        inner[..words]
            .iter()
            .all(|t| BUILTIN_TYPE_WORDS.contains(&t.text.as_str()) || types.contains(&t.text))
    };
    named.then(|| join_type(inner))
}

fn join_type(tokens: &[&Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        if !out.is_empty() && !tok.is_punct("*") {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

/// Index of the top-level `*` splitting `sizeof(T) * n` or `n * sizeof(T)`.
fn product_split(tokens: &[&Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, tok) in tokens.iter().enumerate() {
        match tok.text.as_str() {
            "(" | "[" => depth += 1,
            ")" | "]" => depth -= 1,
            "*" if depth == 0 && i > 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn text_of(tokens: &[&Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && tok.is_ident() && tokens[i - 1].is_ident() {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

/// Compact text of the significant tokens `sig[from..]`, spacing as written.
fn operand_text(arg: &[Token], sig: &[usize], from: usize, to: usize) -> String {
    compact(&arg[sig[from]..=sig[to - 1]])
}

/// Classify the argument list of a `malloc` or `calloc` call. `types` holds
/// the type names declared in the unit.
pub fn classify(function: &str, args: &[&[Token]], types: &FxHashSet<SmolStr>) -> Option<Allocation> {
    let positions: Vec<Vec<usize>> = args
        .iter()
        .map(|a| (0..a.len()).filter(|&i| !a[i].is_trivia()).collect())
        .collect();
    let sig: Vec<Vec<&Token>> = args
        .iter()
        .zip(&positions)
        .map(|(a, idx)| idx.iter().map(|&i| &a[i]).collect())
        .collect();
    match (function, sig.as_slice()) {
        ("malloc", [arg]) => {
            if let Some(ty) = sizeof_type(arg, types) {
                return Some(Allocation { ty, count: None, zeroed: false });
            }
            let split = product_split(arg)?;
            let (ty, from, to) = match (sizeof_type(&arg[..split], types), sizeof_type(&arg[split + 1..], types)) {
                (Some(ty), _) => (ty, split + 1, arg.len()),
                (None, Some(ty)) => (ty, 0, split),
                (None, None) => return None,
            };
            (from < to).then(|| Allocation {
                ty,
                count: Some(operand_text(args[0], &positions[0], from, to)),
                zeroed: false,
            })
        }
        ("calloc", [count, size]) if !count.is_empty() => {
            let ty = sizeof_type(size, types)?;
            Some(Allocation {
                ty,
                count: Some(operand_text(args[0], &positions[0], 0, count.len())),
                zeroed: true,
            })
        }
        _ => None,
    }
}

/// Start of a `(T *)` cast ending right before `idx`, if any.
fn cast_before(tokens: &[Token], idx: usize) -> Option<usize> {
    let close = prev_significant(tokens, idx).filter(|&c| tokens[c].is_punct(")"))?;
    let open = (0..close).rev().find(|&o| tokens[o].is_punct("("))?;
    let inner: Vec<&Token> = tokens[open + 1..close].iter().filter(|t| !t.is_trivia()).collect();
    let is_type = inner.last().map_or(false, |t| t.is_punct("*"))
        && inner.iter().all(|t| t.is_ident() || t.is_punct("*"));
    is_type.then_some(open)
}

/// The assignment target left of an `=` that ends right before `idx`:
/// identifiers joined by `.` or `->`, each optionally subscripted.
fn assignment_target(tokens: &[Token], idx: usize) -> Option<String> {
    let eq = prev_significant(tokens, idx).filter(|&e| tokens[e].is_punct("="))?;
    let mut start = None;
    let mut j = eq;
    let mut want_object = true;
    while let Some(p) = prev_significant(tokens, j) {
        let tok = &tokens[p];
        if want_object {
            if tok.is_punct("]") {
                j = matching_open(tokens, p)?;
                continue;
            }
            if !tok.is_ident() {
                return None;
            }
            start = Some(p);
            want_object = false;
        } else if !(tok.is_punct(".") || tok.is_punct("->")) {
            break;
        } else {
            want_object = true;
        }
        j = p;
    }
    // An operator or subscript with no object in front of it.
    if want_object {
        return None;
    }
    Some(text_of(&significant(&tokens[start?..eq])))
}

fn rewrite_allocations(
    tokens: &mut Vec<Token>,
    types: &FxHashSet<SmolStr>,
    targets: &mut FxHashMap<String, AllocShape>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut i = 0;
    while i < tokens.len() {
        let function = tokens[i].text.clone();
        if !(tokens[i].is_word("malloc") || tokens[i].is_word("calloc")) {
            i += 1;
            continue;
        }
        let Some(open) = next_significant(tokens, i + 1).filter(|&o| tokens[o].is_punct("(")) else {
            i += 1;
            continue;
        };
        let Some(close) = matching_close(tokens, open) else {
            i += 1;
            continue;
        };
        let args = split_top_level(&tokens[open + 1..close], ",");
        let Some(allocation) = classify(&function, &args, types) else {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnrecognizedAllocation,
                    format!("`{}` call does not have a recognized size shape", function),
                )
                .with_span(span_of(&tokens[i..=close]))
                .with_label("left as is")
                .with_help("use `sizeof(T)` or `n * sizeof(T)` as the size"),
            );
            i = close + 1;
            continue;
        };

        let start = cast_before(tokens, i).unwrap_or(i);
        // Without a target the matching `free` cannot become `delete`.
        let Some(target) = assignment_target(tokens, start) else {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnrecognizedAllocation,
                    format!("`{}` result is not assigned to a trackable variable", function),
                )
                .with_span(span_of(&tokens[i..=close]))
                .with_label("left as is")
                .with_help("assign the allocation to a variable, member or array element"),
            );
            i = close + 1;
            continue;
        };
        tracing::trace!(%target, ty = %allocation.ty, "tracked allocation");
        targets.insert(target, allocation.shape());
        let span = span_of(&tokens[start..=close]);
        let replacement = synthesize(&allocation.expression(), span);
        let len = replacement.len();
        tokens.splice(start..=close, replacement);
        i = start + len;
    }
}

fn rewrite_frees(
    tokens: &mut Vec<Token>,
    targets: &FxHashMap<String, AllocShape>,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    let mut rewritten = 0;
    let mut i = 0;
    while i < tokens.len() {
        let member_access = prev_significant(tokens, i)
            .map_or(false, |p| matches!(tokens[p].text.as_str(), "." | "->" | "::"));
        if !tokens[i].is_word("free") || member_access {
            i += 1;
            continue;
        }
        let Some(open) = next_significant(tokens, i + 1).filter(|&o| tokens[o].is_punct("(")) else {
            i += 1;
            continue;
        };
        let Some(close) = matching_close(tokens, open) else {
            i += 1;
            continue;
        };
        let arg: Vec<&Token> = tokens[open + 1..close].iter().filter(|t| !t.is_trivia()).collect();
        let key = text_of(&arg);
        let Some(shape) = targets.get(&key) else {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnmatchedFree,
                    format!("`free({})` has no matching recognized allocation", compact(&tokens[open + 1..close])),
                )
                .with_span(span_of(&tokens[i..=close]))
                .with_label("left as is"),
            );
            i = close + 1;
            continue;
        };
        let text = match shape {
            AllocShape::Single => format!("delete {}", key),
            AllocShape::Array => format!("delete[] {}", key),
        };
        let span = span_of(&tokens[i..=close]);
        let replacement = synthesize(&text, span);
        let len = replacement.len();
        tokens.splice(i..=close, replacement);
        rewritten += 1;
        i += len;
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::render;

    fn run_on(source: &str) -> Unit {
        let mut unit = Unit::new(tokenize(source));
        run(&mut unit);
        unit
    }

    #[test]
    fn test_single_allocation_with_cast() {
        let unit = run_on("struct Point *p = (struct Point *)malloc(sizeof(struct Point));\nfree(p);\n");
        assert_eq!(render(&unit.body), "struct Point *p = new Point;\ndelete p;\n");
        assert!(unit.diagnostics.is_empty());
    }

    #[test]
    fn test_array_allocation_both_orders() {
        let unit = run_on(
            "int *a = (int*)malloc(sizeof(int) * n);\nint *b = malloc(n * sizeof(int));\nfree(a);\nfree(b);\n",
        );
        assert_eq!(
            render(&unit.body),
            "int *a = new int[n];\nint *b = new int[n];\ndelete[] a;\ndelete[] b;\n"
        );
    }

    #[test]
    fn test_calloc_zero_initializes() {
        let unit = run_on("buf = calloc(len + 1, sizeof(char));\nfree(buf);\n");
        assert_eq!(render(&unit.body), "buf = new char[len + 1]();\ndelete[] buf;\n");
    }

    #[test]
    fn test_member_target() {
        let unit = run_on("list->items = malloc(sizeof(int) * cap);\nfree(list->items);\n");
        assert_eq!(render(&unit.body), "list->items = new int[cap];\ndelete[] list->items;\n");
    }

    #[test]
    fn test_subscripted_target() {
        let unit = run_on("arr[i] = malloc(sizeof(int));\ngrid[r][c + 1] = calloc(n, sizeof(double));\nfree(arr[i]);\nfree(grid[r][c+1]);\n");
        assert_eq!(
            render(&unit.body),
            "arr[i] = new int;\ngrid[r][c + 1] = new double[n]();\ndelete arr[i];\ndelete[] grid[r][c+1];\n"
        );
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
    }

    #[test]
    fn test_untracked_allocation_is_kept() {
        let source = "return malloc(sizeof(int));\n*slot() = malloc(sizeof(int));\n";
        let unit = run_on(source);
        assert_eq!(render(&unit.body), source);
        let kinds: Vec<DiagnosticKind> = unit.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::UnrecognizedAllocation, DiagnosticKind::UnrecognizedAllocation]
        );
    }

    #[test]
    fn test_sizeof_expression_is_not_a_type() {
        let source = "struct Point *p = malloc(sizeof(*p));\nfree(p);\nint *q = malloc(sizeof(x) * n);\n";
        let unit = run_on(source);
        assert_eq!(render(&unit.body), source);
        let kinds: Vec<DiagnosticKind> = unit.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnrecognizedAllocation,
                DiagnosticKind::UnrecognizedAllocation,
                DiagnosticKind::UnmatchedFree
            ]
        );
    }

    #[test]
    fn test_typedef_names_are_types() {
        let unit = run_on("typedef unsigned long Word;\nWord *w = malloc(sizeof(Word) * 4);\nfree(w);\n");
        assert_eq!(
            render(&unit.body),
            "typedef unsigned long Word;\nWord *w = new Word[4];\ndelete[] w;\n"
        );
    }

    #[test]
    fn test_unrecognized_and_unmatched_are_kept() {
        let source = "char *s = malloc(100);\nfree(s);\nfree(other);\n";
        let unit = run_on(source);
        assert_eq!(render(&unit.body), source);
        let kinds: Vec<DiagnosticKind> = unit.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::UnrecognizedAllocation,
                DiagnosticKind::UnmatchedFree,
                DiagnosticKind::UnmatchedFree
            ]
        );
    }

    #[test]
    fn test_classify_rejects_expression_sizes() {
        let types = FxHashSet::default();
        let tokens = tokenize("strlen(s) + 1");
        assert_eq!(classify("malloc", &[&tokens[..]], &types), None);
        let tokens = tokenize("sizeof(*p)");
        assert_eq!(classify("malloc", &[&tokens[..]], &types), None);
        let tokens = tokenize("sizeof(unsigned char *)");
        assert_eq!(
            classify("malloc", &[&tokens[..]], &types).map(|a| a.ty),
            Some("unsigned char*".to_string())
        );
    }
}
