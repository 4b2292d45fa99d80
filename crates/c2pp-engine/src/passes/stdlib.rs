//! Standard-library idioms: function pointers become `std::function`, and math
//! calls are qualified with `std::` once `<cmath>` is included.

use crate::lexer::synthesize;
use crate::passes::headers::include_target;
use crate::token::{compact, matching_close, next_significant, prev_significant, span_of, Token, TokenKind};
use crate::unit::Unit;

pub const FUNCTIONAL_INCLUDE: &str = "#include <functional>";

pub static MATH_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh", "exp", "log", "log10", "pow",
    "sqrt", "ceil", "floor", "fabs", "fmod",
];

/// Storage classes that stay in front of the rewritten declaration.
const STORAGE_WORDS: &[&str] = &["static", "extern"];

/// Words that start a statement which is not a declaration.
const STATEMENT_WORDS: &[&str] = &["return", "typedef", "else", "case", "goto", "sizeof", "do"];

pub fn run(unit: &mut Unit) {
    let qualify = unit
        .includes
        .iter()
        .filter_map(|line| include_target(line))
        .any(|header| header == "cmath");

    let mut declarations = 0usize;
    let mut calls = 0usize;
    unit.rewrite_sequences(|tokens, _| {
        declarations += rewrite_function_pointers(tokens);
        if qualify {
            calls += qualify_math_calls(tokens);
        }
    });
    if declarations > 0 {
        unit.needs_functional = true;
    }
    tracing::debug!(declarations, calls, "standard library pass complete");
}

/// True for the first token of a statement.
fn at_statement_start(tokens: &[Token], idx: usize) -> bool {
    match prev_significant(tokens, idx) {
        None => true,
        Some(p) => tokens[p].kind == TokenKind::Directive || matches!(tokens[p].text.as_str(), ";" | "{" | "}"),
    }
}

/// Rewrite `R (*name)(params) = init;` and `R (*name)(params);` at statement
/// position to `std::function<R(params)> name`. Parameter lists and multiple
/// declarators are left alone.
pub fn rewrite_function_pointers(tokens: &mut Vec<Token>) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < tokens.len() {
        match function_pointer_at(tokens, i) {
            Some((start, end, text)) => {
                let span = span_of(&tokens[start..=end]);
                tracing::trace!(offset = span.start, %text, "function pointer declaration");
                let replacement = synthesize(&text, span);
                let len = replacement.len();
                tokens.splice(start..=end, replacement);
                count += 1;
                i = start + len;
            }
            None => i += 1,
        }
    }
    count
}

/// For a `(` opening `(*name)`, the replaced range and its new text.
fn function_pointer_at(tokens: &[Token], open: usize) -> Option<(usize, usize, String)> {
    if !tokens[open].is_punct("(") {
        return None;
    }
    let star = next_significant(tokens, open + 1).filter(|&s| tokens[s].is_punct("*"))?;
    let name = next_significant(tokens, star + 1).filter(|&n| tokens[n].is_ident())?;
    let close = next_significant(tokens, name + 1).filter(|&c| tokens[c].is_punct(")"))?;
    let params_open = next_significant(tokens, close + 1).filter(|&p| tokens[p].is_punct("("))?;
    let params_close = matching_close(tokens, params_open)?;
    next_significant(tokens, params_close + 1).filter(|&t| tokens[t].is_punct("=") || tokens[t].is_punct(";"))?;

    // The return type: words and stars back to the start of the statement.
    let mut start = open;
    while let Some(p) = prev_significant(tokens, start) {
        if !(tokens[p].is_ident() || tokens[p].is_punct("*")) {
            break;
        }
        start = p;
    }
    if start == open || !tokens[start].is_ident() || !at_statement_start(tokens, start) {
        return None;
    }
    if STATEMENT_WORDS.contains(&tokens[start].text.as_str()) {
        return None;
    }

    let mut storage = String::new();
    let mut ret_start = start;
    while tokens[ret_start].is_ident() && STORAGE_WORDS.contains(&tokens[ret_start].text.as_str()) {
        storage.push_str(&tokens[ret_start].text);
        storage.push(' ');
        ret_start = next_significant(tokens, ret_start + 1)?;
    }
    if ret_start >= open {
        return None;
    }
    let ret = compact(&tokens[ret_start..open]);
    let params = compact(&tokens[params_open + 1..params_close]);
    let text = format!("{}std::function<{}({})> {}", storage, ret, params, tokens[name].text);
    Some((start, params_close, text))
}

/// Prefix calls to the C math functions with `std::`. Member calls,
/// qualified calls and declarations are skipped.
pub fn qualify_math_calls(tokens: &mut Vec<Token>) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < tokens.len() {
        if !is_math_call(tokens, i) {
            i += 1;
            continue;
        }
        let text = format!("std::{}", tokens[i].text);
        let replacement = synthesize(&text, tokens[i].span);
        let len = replacement.len();
        tokens.splice(i..=i, replacement);
        count += 1;
        i += len;
    }
    count
}

fn is_math_call(tokens: &[Token], idx: usize) -> bool {
    let tok = &tokens[idx];
    if !tok.is_ident() || !MATH_FUNCTIONS.contains(&tok.text.as_str()) {
        return false;
    }
    if !next_significant(tokens, idx + 1).map_or(false, |n| tokens[n].is_punct("(")) {
        return false;
    }
    match prev_significant(tokens, idx) {
        None => true,
        Some(p) => {
            let prev = &tokens[p];
            if prev.is_ident() {
                // `double sqrt(double)` declares rather than calls.
                matches!(prev.text.as_str(), "return" | "else" | "case" | "do")
            } else {
                !(prev.is_punct(".") || prev.is_punct("->") || prev.is_punct("::"))
            }
        }
    }
}
