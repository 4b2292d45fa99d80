//! Entry point normalization.

use crate::lexer::synthesize;
use crate::token::{matching_close, next_significant, prev_significant, span_of, Token};
use crate::unit::Unit;

pub const ENTRY_PARAMS: &str = "(int argc, char* argv[])";

pub fn run(unit: &mut Unit) {
    let normalized = normalize(&mut unit.body);
    tracing::debug!(normalized, "entry pass complete");
}

/// Rewrite the parameter list of every top-level `main()` or `main(void)`
/// definition. Returns how many were rewritten.
pub fn normalize(tokens: &mut Vec<Token>) -> usize {
    let mut count = 0;
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].text.as_str() {
            "{" if tokens[i].is_punct("{") => depth += 1,
            "}" if tokens[i].is_punct("}") => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 && is_entry_definition(tokens, i) {
            if let Some(open) = next_significant(tokens, i + 1) {
                if let Some(close) = matching_close(tokens, open) {
                    let span = span_of(&tokens[open..=close]);
                    let params = synthesize(ENTRY_PARAMS, span);
                    let len = params.len();
                    tokens.splice(open..=close, params);
                    tracing::trace!(offset = span.start, "normalized entry point");
                    count += 1;
                    i = open + len;
                    continue;
                }
            }
        }
        i += 1;
    }
    count
}

fn is_entry_definition(tokens: &[Token], idx: usize) -> bool {
    if !tokens[idx].is_word("main") {
        return false;
    }
    // A return type, not a member access or call argument.
    if !prev_significant(tokens, idx).map_or(false, |p| tokens[p].is_ident()) {
        return false;
    }
    let Some(open) = next_significant(tokens, idx + 1).filter(|&o| tokens[o].is_punct("(")) else {
        return false;
    };
    let Some(close) = matching_close(tokens, open) else { return false };
    let inner: Vec<&Token> = tokens[open + 1..close].iter().filter(|t| !t.is_trivia()).collect();
    let bare = match inner.as_slice() {
        [] => true,
        [v] => v.is_word("void"),
        _ => false,
    };
    bare && next_significant(tokens, close + 1).map_or(false, |b| tokens[b].is_punct("{"))
}
