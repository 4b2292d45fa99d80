//! `printf`-family output and `scanf` input to stream insertion and extraction.

use crate::lexer::synthesize;
use crate::token::{
    compact, matching_close, next_significant, prev_significant, span_of, split_top_level, Token, TokenKind,
};
use crate::unit::Unit;
use c2pp_common::{Diagnostic, DiagnosticKind};

/// A piece of a parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, escapes kept as written.
    Text(String),
    /// A conversion consuming one argument.
    Conversion { conv: char, precision: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub segments: Vec<Segment>,
    /// The format ended in `\n`, which was removed from the last segment.
    pub newline: bool,
}

impl Format {
    pub fn conversions(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Conversion { .. }))
            .count()
    }
}

const CONVERSIONS: &str = "diouxXfFeEgGaAcspn";
const LENGTH_MODIFIERS: &str = "hlLqjzt";

/// Split the contents of a format literal into text and conversions.
pub fn parse_format(contents: &str) -> Format {
    let mut segments = Vec::new();
    let mut text = String::new();
    let chars: Vec<char> = contents.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                text.push('\\');
                if let Some(&c) = chars.get(i + 1) {
                    text.push(c);
                }
                i += 2;
            }
            '%' if chars.get(i + 1) == Some(&'%') => {
                text.push('%');
                i += 2;
            }
            '%' => match conversion_at(&chars, i + 1) {
                Some((segment, next)) => {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(segment);
                    i = next;
                }
                None => {
                    text.push('%');
                    i += 1;
                }
            },
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }

    let mut newline = false;
    if let Some(Segment::Text(last)) = segments.last_mut() {
        if ends_with_newline_escape(last) {
            last.truncate(last.len() - 2);
            newline = true;
            if last.is_empty() {
                segments.pop();
            }
        }
    }
    Format { segments, newline }
}

/// Parse `[flags][width][.precision][length]conv` starting at `from`.
fn conversion_at(chars: &[char], from: usize) -> Option<(Segment, usize)> {
    let mut i = from;
    while i < chars.len() && "-+ #0".contains(chars[i]) {
        i += 1;
    }
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '*') {
        i += 1;
    }
    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let digits: String = chars[start..i].iter().collect();
        precision = Some(digits.parse().unwrap_or(0));
    }
    while i < chars.len() && LENGTH_MODIFIERS.contains(chars[i]) {
        i += 1;
    }
    let conv = *chars.get(i)?;
    CONVERSIONS
        .contains(conv)
        .then_some((Segment::Conversion { conv, precision }, i + 1))
}

fn ends_with_newline_escape(text: &str) -> bool {
    let Some(head) = text.strip_suffix('n') else { return false };
    let slashes = head.chars().rev().take_while(|&c| c == '\\').count();
    slashes % 2 == 1
}

/// Concatenated contents of adjacent string literals, or `None` if the
/// tokens are anything else.
fn literal_contents(tokens: &[Token]) -> Option<String> {
    let mut contents = String::new();
    let mut any = false;
    for tok in tokens.iter().filter(|t| !t.is_trivia()) {
        if tok.kind != TokenKind::Str {
            return None;
        }
        // Unterminated literals have no closing quote.
        let inner = tok
            .text
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .filter(|_| tok.text.len() >= 2)?;
        contents.push_str(inner);
        any = true;
    }
    any.then_some(contents)
}

/// Binary operators that bind looser than `<<`, plus the shifts themselves.
const LOOSE_OPERATORS: &[&str] = &[
    "<<", ">>", "<", ">", "<=", ">=", "==", "!=", "&", "^", "|", "&&", "||", "?", "=", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<=", ">>=",
];

/// Whether an operand must be parenthesized inside a `<<`/`>>` chain.
fn needs_parens(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    let mut prev: Option<&Token> = None;
    for tok in tokens.iter().filter(|t| !t.is_trivia()) {
        if tok.kind == TokenKind::Punct {
            match tok.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                op if depth == 0 && LOOSE_OPERATORS.contains(&op) => {
                    let binary = prev.map_or(false, |p| {
                        p.is_ident() || p.is_literal() || p.is_punct(")") || p.is_punct("]")
                    });
                    if binary || op == "?" {
                        return true;
                    }
                }
                _ => {}
            }
        }
        prev = Some(tok);
    }
    false
}

fn operand(tokens: &[Token]) -> String {
    let text = compact(tokens);
    if needs_parens(tokens) {
        format!("({})", text)
    } else {
        text
    }
}

/// Output chain for a format and its arguments, and whether `setprecision`
/// was used.
fn insertion_chain(stream: &str, format: &Format, args: &[&[Token]]) -> (String, bool) {
    let mut parts = vec![stream.to_string()];
    let mut next = 0;
    let mut precision_used = false;
    for segment in &format.segments {
        match segment {
            Segment::Text(text) => parts.push(format!("\"{}\"", text)),
            Segment::Conversion { conv, precision } => {
                let Some(arg) = args.get(next) else { continue };
                next += 1;
                let arg = operand(arg);
                parts.push(match (*conv, *precision) {
                    ('f' | 'F' | 'e' | 'E' | 'g' | 'G', Some(n)) => {
                        precision_used = true;
                        format!("fixed << setprecision({}) << {}", n, arg)
                    }
                    ('x' | 'X', _) => format!("hex << {} << dec", arg),
                    ('o', _) => format!("oct << {} << dec", arg),
                    _ => arg,
                });
            }
        }
    }
    parts.extend(args.iter().skip(next).map(|a| operand(a)));
    if format.newline {
        parts.push("endl".to_string());
    }
    if parts.len() == 1 {
        parts.push("\"\"".to_string());
    }
    (parts.join(" << "), precision_used)
}

fn extraction_chain(args: &[&[Token]]) -> String {
    let mut parts = vec!["cin".to_string()];
    for &arg in args {
        let start = next_significant(arg, 0).unwrap_or(arg.len());
        let arg = match arg.get(start) {
            Some(t) if t.is_punct("&") => &arg[start + 1..],
            _ => arg,
        };
        parts.push(operand(arg));
    }
    parts.join(" >> ")
}

/// Whether the call starting at `idx` begins a statement.
fn at_statement_start(tokens: &[Token], idx: usize) -> bool {
    match prev_significant(tokens, idx) {
        None => true,
        Some(p) => {
            let tok = &tokens[p];
            tok.kind == TokenKind::Directive
                || tok.is_word("else")
                || tok.is_word("do")
                || matches!(tok.text.as_str(), ";" | "{" | "}" | ")" | ":") && tok.kind == TokenKind::Punct
        }
    }
}

pub fn run(unit: &mut Unit) {
    let mut counts = Counts::default();
    unit.rewrite_sequences(|tokens, diagnostics| rewrite_calls(tokens, &mut counts, diagnostics));
    if counts.precision {
        unit.needs_iomanip = true;
    }
    tracing::debug!(output = counts.output, input = counts.input, "i/o pass complete");
}

#[derive(Default)]
struct Counts {
    output: usize,
    input: usize,
    precision: bool,
}

fn rewrite_calls(tokens: &mut Vec<Token>, counts: &mut Counts, diagnostics: &mut Vec<Diagnostic>) {
    let mut i = 0;
    while i < tokens.len() {
        let is_io = tokens[i].kind == TokenKind::Ident
            && matches!(tokens[i].text.as_str(), "printf" | "fprintf" | "puts" | "scanf");
        if !is_io || !at_statement_start(tokens, i) {
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
        if !next_significant(tokens, close + 1).map_or(false, |s| tokens[s].is_punct(";")) {
            i = close + 1;
            continue;
        }

        let function = tokens[i].text.clone();
        let span = span_of(&tokens[i..=close]);
        let args = split_top_level(&tokens[open + 1..close], ",");
        let rewrite = match rewrite_call(&function, &args, counts) {
            Ok(Some(rewrite)) => rewrite,
            Ok(None) => {
                i = close + 1;
                continue;
            }
            Err(diagnostic) => {
                diagnostics.push(diagnostic.with_span(span));
                i = close + 1;
                continue;
            }
        };
        if let Some(diagnostic) = rewrite.mismatch {
            diagnostics.push(diagnostic.with_span(span));
        }
        tracing::trace!(%function, chain = %rewrite.text, "rewrote i/o call");
        let synthesized = synthesize(&rewrite.text, span);
        let len = synthesized.len();
        tokens.splice(i..=close, synthesized);
        i += len;
    }
}

struct Rewrite {
    text: String,
    mismatch: Option<Diagnostic>,
}

fn mismatch(function: &str, placeholders: usize, arguments: usize) -> Option<Diagnostic> {
    (placeholders != arguments).then(|| {
        Diagnostic::warning(
            DiagnosticKind::FormatMismatch,
            format!(
                "`{}` format has {} placeholder(s) but {} argument(s) were given",
                function, placeholders, arguments
            ),
        )
        .with_label("placeholder count differs")
        .with_help(if arguments > placeholders {
            "extra arguments were appended to the chain"
        } else {
            "placeholders without an argument were dropped"
        })
    })
}

/// `Ok(None)` means the call is left alone without comment.
fn rewrite_call(function: &str, args: &[&[Token]], counts: &mut Counts) -> Result<Option<Rewrite>, Diagnostic> {
    let non_literal = || {
        Diagnostic::warning(
            DiagnosticKind::NonLiteralFormat,
            format!("`{}` format is not a string literal", function),
        )
        .with_label("left as is")
    };
    match function {
        "puts" => {
            let [arg] = args else { return Ok(None) };
            if next_significant(arg, 0).is_none() {
                return Ok(None);
            }
            counts.output += 1;
            Ok(Some(Rewrite {
                text: format!("cout << {} << endl", operand(arg)),
                mismatch: None,
            }))
        }
        "printf" | "fprintf" => {
            let (stream, rest) = if function == "fprintf" {
                let Some((target, rest)) = args.split_first() else { return Ok(None) };
                match compact(target).as_str() {
                    "stdout" => ("cout", rest),
                    "stderr" => ("cerr", rest),
                    _ => return Ok(None),
                }
            } else {
                ("cout", args)
            };
            let Some((fmt, values)) = rest.split_first() else { return Ok(None) };
            let contents = literal_contents(fmt).ok_or_else(non_literal)?;
            let format = parse_format(&contents);
            let (text, precision) = insertion_chain(stream, &format, values);
            counts.output += 1;
            counts.precision |= precision;
            Ok(Some(Rewrite {
                text,
                mismatch: mismatch(function, format.conversions(), values.len()),
            }))
        }
        "scanf" => {
            let Some((fmt, values)) = args.split_first() else { return Ok(None) };
            let contents = literal_contents(fmt).ok_or_else(non_literal)?;
            if values.is_empty() {
                return Ok(None);
            }
            let placeholders = parse_format(&contents)
                .segments
                .iter()
                .filter(|s| matches!(s, Segment::Conversion { conv, .. } if *conv != 'n'))
                .count()
                .saturating_sub(suppressed_assignments(&contents));
            counts.input += 1;
            Ok(Some(Rewrite {
                text: extraction_chain(values),
                mismatch: mismatch(function, placeholders, values.len()),
            }))
        }
        _ => Ok(None),
    }
}

/// Number of `%*` conversions, which read without storing.
fn suppressed_assignments(contents: &str) -> usize {
    contents.replace("%%", "").matches("%*").count()
}
