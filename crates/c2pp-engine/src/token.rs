//! Tokens and the slice helpers every pass shares.

use c2pp_common::Span;
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    /// A whole preprocessor line, continuations included, newline excluded.
    Directive,
    Whitespace,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Number | TokenKind::Str | TokenKind::Char)
    }
}

/// Index of the first non-trivia token at or after `from`.
pub fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

/// Index of the last non-trivia token strictly before `before`.
pub fn prev_significant(tokens: &[Token], before: usize) -> Option<usize> {
    (0..before.min(tokens.len())).rev().find(|&i| !tokens[i].is_trivia())
}

/// Index of the delimiter closing the one at `open`, if balanced.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let (open_text, close_text) = match tokens.get(open)?.text.as_str() {
        "(" => ("(", ")"),
        "[" => ("[", "]"),
        "{" => ("{", "}"),
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.kind != TokenKind::Punct {
            continue;
        }
        if tok.text == open_text {
            depth += 1;
        } else if tok.text == close_text {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Index of the delimiter opening the one at `close`, if balanced.
pub fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let (open_text, close_text) = match tokens.get(close)?.text.as_str() {
        ")" => ("(", ")"),
        "]" => ("[", "]"),
        "}" => ("{", "}"),
        _ => return None,
    };
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        let tok = &tokens[i];
        if tok.kind != TokenKind::Punct {
            continue;
        }
        if tok.text == close_text {
            depth += 1;
        } else if tok.text == open_text {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on a punctuation token that sits outside of any bracket.
pub fn split_top_level<'a>(tokens: &'a [Token], sep: &str) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Punct {
            continue;
        }
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            t if t == sep && depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Concatenate token text verbatim.
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Render with every trivia run collapsed to one space, trimmed.
pub fn compact(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for tok in tokens {
        if tok.is_trivia() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push_str(&tok.text);
    }
    out
}

/// The non-trivia tokens of a slice.
pub fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|t| !t.is_trivia()).collect()
}

/// Span covering a token range. Empty slices get an empty span.
pub fn span_of(tokens: &[Token]) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => Span::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_matching_close_nested() {
        let tokens = tokenize("f(a, (b), c) + 1");
        let open = tokens.iter().position(|t| t.is_punct("(")).unwrap();
        let close = matching_close(&tokens, open).unwrap();
        assert_eq!(render(&tokens[open..=close]), "(a, (b), c)");
    }

    #[test]
    fn test_matching_open_nested() {
        let tokens = tokenize("x = a[b[1]][2];");
        let close = tokens.iter().rposition(|t| t.is_punct("]")).unwrap();
        let open = matching_open(&tokens, close).unwrap();
        assert_eq!(render(&tokens[open..=close]), "[2]");
        let inner = tokens.iter().position(|t| t.is_punct("]")).unwrap() + 1;
        assert_eq!(render(&tokens[matching_open(&tokens, inner).unwrap()..=inner]), "[b[1]]");
    }

    #[test]
    fn test_split_top_level_ignores_nested_commas() {
        let tokens = tokenize("a, g(b, c), d[1, 2]");
        let parts: Vec<String> = split_top_level(&tokens, ",").into_iter().map(compact).collect();
        assert_eq!(parts, vec!["a", "g(b, c)", "d[1, 2]"]);
    }

    #[test]
    fn test_compact_collapses_trivia() {
        let tokens = tokenize("  struct   Point /* c */ *p\n");
        assert_eq!(compact(&tokens), "struct Point *p");
    }
}
