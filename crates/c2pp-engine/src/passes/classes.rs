//! Struct extraction and class synthesis.
//!
//! Struct definitions are collected into a name-indexed catalog. Free
//! functions whose first parameter points at (or references) a catalogued
//! struct become methods of it: the receiver parameter is dropped, member
//! access through it becomes implicit, and every call site is rewritten to
//! member-call syntax.
//!
//! ```text
//! struct Point { int x; int y; };          class Point {
//! void show(struct Point *p) {      =>     public:
//!     printf("%d", p->x);                      int x;
//! }                                            ...
//! show(&pt);                                   void show();
//!                                          };
//!                                          pt.show();
//! ```

use crate::lexer::synthesize;
use crate::token::{
    compact, matching_close, next_significant, prev_significant, render, span_of, split_top_level,
    Token, TokenKind,
};
use crate::unit::{remove_range, Field, MethodRecord, Receiver, StructRecord, Unit};
use c2pp_common::{Diagnostic, DiagnosticKind};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

const NOT_FUNCTIONS: &[&str] = &["if", "while", "for", "switch", "return", "sizeof", "do", "else"];

/// Qualifiers dropped from a free function's return type when it becomes a method.
const LINKAGE_WORDS: &[&str] = &["static", "inline", "extern"];

/// A token range scheduled for removal, optionally replaced by new text.
#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: Option<String>,
}

/// Whether a variable holds a struct by value or through a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Value,
    Pointer,
}

impl Shape {
    fn call_operator(self) -> &'static str {
        match self {
            Shape::Value => ".",
            Shape::Pointer => "->",
        }
    }
}

pub fn run(unit: &mut Unit) {
    let aliases = collect_typedef_aliases(&unit.body);
    apply_aliases(&mut unit.body, &aliases);

    extract_structs(unit);
    if unit.structs.is_empty() {
        tracing::debug!("no structs found");
        return;
    }
    extract_methods(unit);

    let owners = method_owners(unit);
    let mut variables = collect_variables(unit);
    let mut diagnostics = Vec::new();

    for record in unit.structs.values_mut() {
        for method in &mut record.methods {
            let shape = match method.receiver {
                Receiver::Pointer => Shape::Pointer,
                Receiver::Reference => Shape::Value,
            };
            let previous = variables.insert(method.self_name.clone(), (method.owner.clone(), shape));
            rewrite_calls(&mut method.body, &owners, &variables, &mut diagnostics);
            match previous {
                Some(prev) => variables.insert(method.self_name.clone(), prev),
                None => variables.remove(&method.self_name),
            };
            rewrite_receiver(method);
        }
    }
    rewrite_calls(&mut unit.body, &owners, &variables, &mut diagnostics);
    unit.diagnostics.extend(diagnostics);

    tracing::debug!(
        structs = unit.structs.len(),
        methods = unit.structs.values().map(|s| s.methods.len()).sum::<usize>(),
        "class synthesis complete"
    );
}

/// Brace depth before each token.
fn brace_depths(tokens: &[Token]) -> Vec<u32> {
    let mut depth = 0u32;
    tokens
        .iter()
        .map(|tok| {
            let before = depth;
            if tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct("}") {
                depth = depth.saturating_sub(1);
            }
            before
        })
        .collect()
}

/// First significant token of the declaration that contains `idx`.
fn statement_start(tokens: &[Token], idx: usize) -> usize {
    let mut start = idx;
    let mut j = idx;
    while let Some(prev) = prev_significant(tokens, j) {
        let tok = &tokens[prev];
        if tok.kind == TokenKind::Directive || tok.is_punct(";") || tok.is_punct("}") || tok.is_punct("{") {
            break;
        }
        start = prev;
        j = prev;
    }
    start
}

/// `typedef struct Tag { ... } Alias;` maps `Tag` to `Alias`.
fn collect_typedef_aliases(tokens: &[Token]) -> FxHashMap<SmolStr, SmolStr> {
    let mut aliases = FxHashMap::default();
    let depths = brace_depths(tokens);
    for i in 0..tokens.len() {
        if depths[i] != 0 || !tokens[i].is_word("typedef") {
            continue;
        }
        let Some(kw) = next_significant(tokens, i + 1) else { continue };
        if !tokens[kw].is_word("struct") {
            continue;
        }
        let Some(tag) = next_significant(tokens, kw + 1) else { continue };
        if !tokens[tag].is_ident() {
            continue;
        }
        let Some(open) = next_significant(tokens, tag + 1) else { continue };
        if !tokens[open].is_punct("{") {
            continue;
        }
        let Some(close) = matching_close(tokens, open) else { continue };
        let Some(alias) = next_significant(tokens, close + 1) else { continue };
        if tokens[alias].is_ident() && tokens[alias].text != tokens[tag].text {
            aliases.insert(tokens[tag].text.clone(), tokens[alias].text.clone());
        }
    }
    aliases
}

/// Replace `struct Tag` with the typedef alias, except at the definition itself.
fn apply_aliases(tokens: &mut Vec<Token>, aliases: &FxHashMap<SmolStr, SmolStr>) {
    if aliases.is_empty() {
        return;
    }
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_word("struct") {
            if let Some(tag) = next_significant(tokens, i + 1) {
                let defines = next_significant(tokens, tag + 1).map_or(false, |n| tokens[n].is_punct("{"));
                if let Some(alias) = aliases.get(&tokens[tag].text).filter(|_| !defines) {
                    let span = tokens[i].span.merge(tokens[tag].span);
                    let replacement = synthesize(alias, span);
                    tokens.splice(i..=tag, replacement);
                }
            }
        }
        i += 1;
    }
}

fn parse_fields(body: &[Token]) -> Vec<Field> {
    let mut fields = Vec::new();
    for member in split_top_level(body, ";") {
        if member.iter().all(Token::is_trivia) {
            continue;
        }
        let mut base_ty = String::new();
        for (n, declarator) in split_top_level(member, ",").into_iter().enumerate() {
            let cut = declarator
                .iter()
                .position(|t| t.is_punct("[") || t.is_punct(":"))
                .unwrap_or(declarator.len());
            let head = &declarator[..cut];
            let Some(name_idx) = head.iter().rposition(Token::is_ident) else { continue };
            let suffix = compact(&declarator[cut..]);
            let (ty, text) = if n == 0 {
                let ty = compact(&head[..name_idx]);
                base_ty = ty.trim_end_matches(['*', '&', ' ']).to_string();
                (ty, compact(declarator))
            } else {
                let stars = compact(&head[..name_idx]);
                let ty = format!("{} {}", base_ty, stars).trim_end().to_string();
                let text = format!("{} {}", base_ty, compact(declarator));
                (ty, text)
            };
            fields.push(Field {
                ty,
                name: head[name_idx].text.clone(),
                suffix,
                text,
            });
        }
    }
    fields
}

fn extract_structs(unit: &mut Unit) {
    let tokens = &unit.body;
    let depths = brace_depths(tokens);
    let mut edits = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if depths[i] != 0 || !tokens[i].is_word("struct") {
            i += 1;
            continue;
        }
        let start = statement_start(tokens, i);
        let is_typedef = tokens[start].is_word("typedef") && start < i;
        if start != i && !is_typedef {
            i += 1;
            continue;
        }

        let mut cursor = next_significant(tokens, i + 1);
        let mut tag = None;
        if let Some(c) = cursor.filter(|&c| tokens[c].is_ident()) {
            tag = Some(tokens[c].text.clone());
            cursor = next_significant(tokens, c + 1);
        }
        let Some(open) = cursor.filter(|&c| tokens[c].is_punct("{")) else {
            i += 1;
            continue;
        };
        let Some(close) = matching_close(tokens, open) else {
            i += 1;
            continue;
        };
        let Some(semi) = (close + 1..tokens.len()).find(|&k| tokens[k].is_punct(";")) else {
            i += 1;
            continue;
        };
        let trailing = compact(&tokens[close + 1..semi]);

        let (name, replacement) = if is_typedef {
            let alias = (!trailing.is_empty()).then(|| SmolStr::new(&trailing));
            match alias.or(tag) {
                Some(name) if name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) => (name, None),
                _ => {
                    i = semi + 1;
                    continue;
                }
            }
        } else {
            let Some(name) = tag else {
                i = semi + 1;
                continue;
            };
            let replacement = (!trailing.is_empty()).then(|| format!("{} {};", name, trailing));
            (name, replacement)
        };

        let span = span_of(&tokens[start..=semi]);
        let record = StructRecord::new(name.clone(), parse_fields(&tokens[open + 1..close]), span);
        if unit.structs.contains_key(&name) {
            unit.diagnostics.push(
                Diagnostic::info(
                    DiagnosticKind::DuplicateStruct,
                    format!("struct `{}` is defined again; the later definition wins", name),
                )
                .with_span(span)
                .with_label("this definition replaces the earlier one"),
            );
        }
        tracing::trace!(%name, fields = record.fields.len(), "captured struct");
        unit.structs.insert(name, record);
        edits.push(Edit { start, end: semi, replacement });
        i = semi + 1;
    }
    apply_edits(&mut unit.body, edits);
}

/// The receiver described by a first parameter, if it names a known struct.
fn parse_receiver(param: &[Token], unit: &Unit) -> Option<(SmolStr, Receiver, SmolStr, bool)> {
    let sig: Vec<&Token> = param.iter().filter(|t| !t.is_trivia()).collect();
    let mut idx = 0;
    let mut is_const = false;
    while let Some(tok) = sig.get(idx) {
        if tok.is_word("const") {
            is_const = true;
        } else if !tok.is_word("struct") {
            break;
        }
        idx += 1;
    }
    let owner = sig.get(idx).filter(|t| t.is_ident() && unit.structs.contains_key(&t.text))?;
    let mut receiver = None;
    let mut name = None;
    for tok in &sig[idx + 1..] {
        match tok.text.as_str() {
            "*" if receiver.is_none() => receiver = Some(Receiver::Pointer),
            "&" if receiver.is_none() => receiver = Some(Receiver::Reference),
            "const" if name.is_none() => {}
            _ if tok.is_ident() && name.is_none() && receiver.is_some() => name = Some(tok.text.clone()),
            _ => return None,
        }
    }
    Some((owner.text.clone(), receiver?, name?, is_const))
}

/// A top-level function definition or prototype.
struct FunctionShape {
    start: usize,
    name: usize,
    open_paren: usize,
    close_paren: usize,
    /// Index of the body's closing brace, or of the `;` for a prototype.
    end: usize,
    body_open: Option<usize>,
}

fn function_at(tokens: &[Token], depths: &[u32], i: usize) -> Option<FunctionShape> {
    if depths[i] != 0 || !tokens[i].is_ident() || NOT_FUNCTIONS.contains(&tokens[i].text.as_str()) {
        return None;
    }
    let open_paren = next_significant(tokens, i + 1).filter(|&p| tokens[p].is_punct("("))?;
    let close_paren = matching_close(tokens, open_paren)?;
    let after = next_significant(tokens, close_paren + 1)?;
    let start = statement_start(tokens, i);
    if start == i {
        return None;
    }
    let type_ok = tokens[start..i]
        .iter()
        .filter(|t| !t.is_trivia())
        .all(|t| t.is_ident() || t.is_punct("*") || t.is_punct("&"));
    if !type_ok {
        return None;
    }
    let (end, body_open) = if tokens[after].is_punct("{") {
        (matching_close(tokens, after)?, Some(after))
    } else if tokens[after].is_punct(";") {
        (after, None)
    } else {
        return None;
    };
    Some(FunctionShape {
        start,
        name: i,
        open_paren,
        close_paren,
        end,
        body_open,
    })
}

fn extract_methods(unit: &mut Unit) {
    let depths = brace_depths(&unit.body);
    let mut edits = Vec::new();
    let mut found: Vec<MethodRecord> = Vec::new();
    let mut prototypes = Vec::new();
    let mut i = 0;
    while i < unit.body.len() {
        let Some(shape) = function_at(&unit.body, &depths, i) else {
            i += 1;
            continue;
        };
        let tokens = &unit.body;
        let params = split_top_level(&tokens[shape.open_paren + 1..shape.close_paren], ",");
        let receiver = params.first().and_then(|first| parse_receiver(first, unit));
        let Some((owner, receiver, self_name, is_const)) = receiver else {
            i = shape.end + 1;
            continue;
        };

        match shape.body_open {
            Some(open) => {
                let return_type = tokens[shape.start..shape.name]
                    .iter()
                    .filter(|t| !t.is_trivia() && !LINKAGE_WORDS.contains(&t.text.as_str()))
                    .cloned()
                    .collect::<Vec<_>>();
                let rest = params[1..].iter().map(|p| compact(p)).collect::<Vec<_>>().join(", ");
                found.push(MethodRecord {
                    owner,
                    return_type: compact_words(&return_type),
                    name: tokens[shape.name].text.clone(),
                    params: rest,
                    receiver,
                    self_name,
                    body: tokens[open + 1..shape.end].to_vec(),
                    is_const,
                    span: span_of(&tokens[shape.start..=shape.end]),
                });
            }
            None => prototypes.push((shape.start, shape.end, owner, tokens[shape.name].text.clone())),
        }
        edits.push(Edit {
            start: shape.start,
            end: shape.end,
            replacement: None,
        });
        i = shape.end + 1;
    }

    // A prototype with no matching definition declares nothing we emit; keep it.
    edits.retain(|edit| {
        prototypes
            .iter()
            .find(|(start, ..)| *start == edit.start)
            .map_or(true, |(_, _, owner, name)| found.iter().any(|m| &m.owner == owner && &m.name == name))
    });
    apply_edits(&mut unit.body, edits);

    for method in found {
        tracing::trace!(owner = %method.owner, name = %method.name, "captured method");
        if let Some(record) = unit.structs.get_mut(&method.owner) {
            record.methods.push(method);
        }
    }
}

/// Join type words with single spaces, keeping `*` and `&` attached.
fn compact_words(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let attach = tok.is_punct("*") || tok.is_punct("&");
        if !out.is_empty() && !attach {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

fn apply_edits(tokens: &mut Vec<Token>, mut edits: Vec<Edit>) {
    edits.sort_by_key(|e| e.start);
    for edit in edits.into_iter().rev() {
        match edit.replacement {
            Some(text) => {
                let span = span_of(&tokens[edit.start..=edit.end]);
                tokens.splice(edit.start..=edit.end, synthesize(&text, span));
            }
            None => remove_range(tokens, edit.start, edit.end),
        }
    }
}

/// Method name to its owning structs and their receiver shapes.
type Owners = FxHashMap<SmolStr, Vec<(SmolStr, Receiver)>>;

fn method_owners(unit: &Unit) -> Owners {
    let mut owners: Owners = FxHashMap::default();
    for record in unit.structs.values() {
        for method in &record.methods {
            owners
                .entry(method.name.clone())
                .or_default()
                .push((record.name.clone(), method.receiver));
        }
    }
    owners
}

/// Variables declared with a catalogued struct type anywhere in the unit.
fn collect_variables(unit: &Unit) -> FxHashMap<SmolStr, (SmolStr, Shape)> {
    let mut vars = FxHashMap::default();
    for tokens in unit.sequences() {
        for (i, tok) in tokens.iter().enumerate() {
            if !tok.is_ident() || !unit.structs.contains_key(&tok.text) {
                continue;
            }
            // Skip `Name::` and calls such as `Name(...)`.
            let mut shape = Shape::Value;
            let mut j = i + 1;
            let name = loop {
                let Some(n) = next_significant(tokens, j) else { break None };
                match tokens[n].text.as_str() {
                    "*" => shape = Shape::Pointer,
                    "const" => {}
                    _ if tokens[n].is_ident() => break Some(n),
                    _ => break None,
                }
                j = n + 1;
            };
            let Some(name) = name else { continue };
            let declares = next_significant(tokens, name + 1)
                .map_or(false, |n| matches!(tokens[n].text.as_str(), "=" | ";" | "," | "[" | ")"));
            if declares {
                vars.insert(tokens[name].text.clone(), (tok.text.clone(), shape));
            }
        }
    }
    vars
}

fn is_simple_object(tokens: &[&Token]) -> bool {
    !tokens.is_empty()
        && tokens.iter().all(|t| {
            t.is_ident() || t.kind == TokenKind::Number || matches!(t.text.as_str(), "." | "->" | "[" | "]")
        })
}

/// Rewrite `method(obj, args)` to `obj->method(args)` or `obj.method(args)`.
fn rewrite_calls(
    tokens: &mut Vec<Token>,
    owners: &Owners,
    variables: &FxHashMap<SmolStr, (SmolStr, Shape)>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut i = 0;
    while i < tokens.len() {
        let Some(candidates) = owners.get(&tokens[i].text).filter(|_| tokens[i].is_ident()) else {
            i += 1;
            continue;
        };
        let member_access = prev_significant(tokens, i)
            .map_or(false, |p| matches!(tokens[p].text.as_str(), "." | "->" | "::"));
        let open = next_significant(tokens, i + 1).filter(|&p| tokens[p].is_punct("("));
        let (Some(open), false) = (open, member_access) else {
            i += 1;
            continue;
        };
        let Some(close) = matching_close(tokens, open) else {
            i += 1;
            continue;
        };
        let args = split_top_level(&tokens[open + 1..close], ",");
        let first: Vec<&Token> = args[0].iter().filter(|t| !t.is_trivia()).collect();
        if first.is_empty() {
            i = close + 1;
            continue;
        }

        // Object expression and what we know about its type.
        let (object, known) = if first[0].is_punct("&") && is_simple_object(&first[1..]) {
            let object: String = first[1..].iter().map(|t| t.text.as_str()).collect();
            let owner = (first.len() == 2).then(|| variables.get(&first[1].text)).flatten();
            (object, Some((owner.map(|(o, _)| o.clone()), Shape::Value)))
        } else if first.len() == 1 && first[0].is_ident() {
            let known = variables.get(&first[0].text).map(|(o, s)| (Some(o.clone()), *s));
            (first[0].text.to_string(), known)
        } else if is_simple_object(&first) {
            (compact(args[0]), None)
        } else {
            (format!("({})", compact(args[0])), None)
        };

        let owner_hint = known.as_ref().and_then(|(o, _)| o.clone());
        let chosen = match &owner_hint {
            Some(hint) => candidates.iter().find(|(o, _)| o == hint),
            None if candidates.len() == 1 => candidates.first(),
            None => None,
        };
        let Some((owner, receiver)) = chosen else {
            if owner_hint.is_none() {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::AmbiguousCall,
                        format!(
                            "`{}` is a method of several classes and its receiver type is unknown",
                            tokens[i].text
                        ),
                    )
                    .with_span(span_of(&tokens[i..=close]))
                    .with_label("left as a free call"),
                );
            }
            i = close + 1;
            continue;
        };
        let operator = known.map_or(receiver.call_operator(), |(_, shape)| shape.call_operator());

        let rest = if args.len() > 1 {
            let first_comma = open + 1 + args[0].len();
            render(&tokens[first_comma + 1..close]).trim().to_string()
        } else {
            String::new()
        };
        let text = format!("{}{}{}({})", object, operator, tokens[i].text, rest);
        tracing::trace!(owner = %owner, call = %text, "rewrote call site");
        let span = span_of(&tokens[i..=close]);
        let replacement = synthesize(&text, span);
        let len = replacement.len();
        tokens.splice(i..=close, replacement);
        i += len;
    }
}

/// Identifiers used bare (not after `.`/`->`) in the body or named in the params.
fn bare_identifiers(method: &MethodRecord) -> FxHashSet<SmolStr> {
    let mut names: FxHashSet<SmolStr> = crate::lexer::tokenize(&method.params)
        .into_iter()
        .filter(|t| t.is_ident())
        .map(|t| t.text)
        .collect();
    for (i, tok) in method.body.iter().enumerate() {
        let after_access = prev_significant(&method.body, i)
            .map_or(false, |p| matches!(method.body[p].text.as_str(), "." | "->"));
        if tok.is_ident() && !after_access && tok.text != method.self_name {
            names.insert(tok.text.clone());
        }
    }
    names
}

/// Turn receiver-qualified member access into implicit member access.
fn rewrite_receiver(method: &mut MethodRecord) {
    let shadowed = bare_identifiers(method);
    let this_expr = match method.receiver {
        Receiver::Pointer => "this",
        Receiver::Reference => "(*this)",
    };
    let access = match method.receiver {
        Receiver::Pointer => "->",
        Receiver::Reference => ".",
    };
    let body = &mut method.body;
    let mut i = 0;
    while i < body.len() {
        if !body[i].is_word(&method.self_name) {
            i += 1;
            continue;
        }
        let prev = prev_significant(body, i);
        if prev.map_or(false, |p| matches!(body[p].text.as_str(), "." | "->" | "::")) {
            i += 1;
            continue;
        }

        // `(*p).member`
        let deref = prev
            .filter(|&p| body[p].is_punct("*"))
            .and_then(|star| prev_significant(body, star).filter(|&o| body[o].is_punct("(")))
            .and_then(|open| {
                let close = next_significant(body, i + 1).filter(|&c| body[c].is_punct(")"))?;
                let dot = next_significant(body, close + 1).filter(|&d| body[d].is_punct("."))?;
                Some((open, dot))
            });
        let (start, op_end) = match deref {
            Some((open, dot)) if method.receiver == Receiver::Pointer => (open, Some(dot)),
            _ => {
                let op = next_significant(body, i + 1).filter(|&o| body[o].is_punct(access));
                (i, op)
            }
        };

        let member = op_end
            .and_then(|o| next_significant(body, o + 1))
            .filter(|&m| body[m].is_ident());
        let (end, text) = match (op_end, member) {
            (Some(_), Some(m)) if shadowed.contains(&body[m].text) => {
                (m, format!("this->{}", body[m].text))
            }
            (Some(_), Some(m)) => (m, body[m].text.to_string()),
            _ => (i, this_expr.to_string()),
        };
        let span = span_of(&body[start..=end]);
        let replacement = synthesize(&text, span);
        let len = replacement.len();
        body.splice(start..=end, replacement);
        i = start + len;
    }
}

/// The class declaration for one struct.
pub fn class_declaration(record: &StructRecord, indent: &str) -> String {
    let mut out = format!("class {} {{\npublic:\n", record.name);
    for field in &record.fields {
        out.push_str(&format!("{}{}\n", indent, field.declaration()));
    }
    if !record.fields.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("{}{}() {{}}\n", indent, record.name));
    if !record.methods.is_empty() {
        out.push('\n');
        for method in &record.methods {
            out.push_str(&format!("{}{};\n", indent, method_signature(method, None)));
        }
    }
    out.push_str("};");
    out
}

fn method_signature(method: &MethodRecord, qualifier: Option<&str>) -> String {
    let name = match qualifier {
        Some(owner) => format!("{}::{}", owner, method.name),
        None => method.name.to_string(),
    };
    let constness = if method.is_const { " const" } else { "" };
    format!("{} {}({}){}", method.return_type, name, method.params, constness)
}

/// Out-of-line definitions of every method of one struct.
pub fn method_definitions(record: &StructRecord) -> Vec<String> {
    record
        .methods
        .iter()
        .map(|m| format!("{} {{{}}}", method_signature(m, Some(&record.name)), render(&m.body)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn run_on(source: &str) -> Unit {
        let mut unit = Unit::new(tokenize(source));
        run(&mut unit);
        unit
    }

    fn field_names(record: &StructRecord) -> Vec<&str> {
        record.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_struct_becomes_class_without_methods() {
        let unit = run_on("struct Point {\n    int x;\n    int y;\n};\n\nint main() { return 0; }\n");
        let record = &unit.structs["Point"];
        assert_eq!(field_names(record), vec!["x", "y"]);
        assert!(record.methods.is_empty());
        assert_eq!(
            class_declaration(record, "    "),
            "class Point {\npublic:\n    int x;\n    int y;\n\n    Point() {}\n};"
        );
        assert_eq!(render(&unit.body), "\nint main() { return 0; }\n");
    }

    #[test]
    fn test_field_order_and_declarator_lists() {
        let unit = run_on("struct Rec { char name[50]; int a, *b; double score; unsigned flag : 1; };");
        let record = &unit.structs["Rec"];
        assert_eq!(field_names(record), vec!["name", "a", "b", "score", "flag"]);
        let decls: Vec<String> = record.fields.iter().map(Field::declaration).collect();
        assert_eq!(
            decls,
            vec!["char name[50];", "int a;", "int *b;", "double score;", "unsigned flag : 1;"]
        );
    }

    #[test]
    fn test_pointer_function_becomes_method() {
        let source = "struct Point { int x; int y; };\n\
                      void move_by(struct Point *p, int dx) {\n    p->x += dx;\n    (*p).y = 0;\n}\n\
                      int main() {\n    struct Point pt;\n    move_by(&pt, 3);\n    return 0;\n}\n";
        let unit = run_on(source);
        let record = &unit.structs["Point"];
        assert_eq!(record.methods.len(), 1);
        let method = &record.methods[0];
        assert_eq!(method.params, "int dx");
        assert_eq!(render(&method.body), "\n    x += dx;\n    y = 0;\n");
        assert!(class_declaration(record, "    ").contains("    void move_by(int dx);\n"));
        assert_eq!(
            method_definitions(record),
            vec!["void Point::move_by(int dx) {\n    x += dx;\n    y = 0;\n}"]
        );
        assert!(render(&unit.body).contains("pt.move_by(3);"));
        assert!(!render(&unit.body).contains("void move_by"));
    }

    #[test]
    fn test_shadowed_member_keeps_this() {
        let unit = run_on("struct P { int x; };\nvoid set_x(struct P *p, int x) { p->x = x; }\n");
        let method = &unit.structs["P"].methods[0];
        assert_eq!(render(&method.body), " this->x = x; ");
    }

    #[test]
    fn test_bare_receiver_becomes_this() {
        let unit = run_on(
            "struct N { int v; };\nint read(struct N *n) { return n->v; }\n\
             int twice(struct N *n) { return read(n) * 2; }\n",
        );
        let record = &unit.structs["N"];
        assert_eq!(record.methods.len(), 2);
        assert_eq!(render(&record.methods[0].body), " return v; ");
        assert_eq!(render(&record.methods[1].body), " return read() * 2; ");
    }

    #[test]
    fn test_reference_receiver() {
        let unit = run_on("struct C { int n; };\nvoid bump(C &c) { c.n++; }\nint main() { C c; bump(c); }\n");
        let record = &unit.structs["C"];
        assert_eq!(render(&record.methods[0].body), " n++; ");
        assert!(render(&unit.body).contains("c.bump()"));
    }

    #[test]
    fn test_pointer_variable_call_uses_arrow() {
        let unit = run_on(
            "struct S { int a; };\nvoid show(struct S *s) { }\n\
             int main() { struct S *ptr = 0; show(ptr); show(list[0]); }\n",
        );
        let body = render(&unit.body);
        assert!(body.contains("ptr->show()"));
        assert!(body.contains("list[0]->show()"));
    }

    #[test]
    fn test_const_receiver_makes_const_method() {
        let unit = run_on("struct S { int a; };\nint get(const struct S *s) { return s->a; }\n");
        let record = &unit.structs["S"];
        assert!(class_declaration(record, "    ").contains("int get() const;"));
    }

    #[test]
    fn test_unmatched_function_stays_free() {
        let source = "struct S { int a; };\nint add(int a, int b) { return a + b; }\n";
        let unit = run_on(source);
        assert!(unit.structs["S"].methods.is_empty());
        assert_eq!(render(&unit.body), "int add(int a, int b) { return a + b; }\n");
    }

    #[test]
    fn test_duplicate_struct_last_wins() {
        let unit = run_on("struct P { int a; };\nstruct P { double b; double c; };\n");
        assert_eq!(unit.structs.len(), 1);
        assert_eq!(field_names(&unit.structs["P"]), vec!["b", "c"]);
        assert_eq!(unit.diagnostics.len(), 1);
        assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::DuplicateStruct);
    }

    #[test]
    fn test_same_method_name_on_two_structs() {
        let unit = run_on(
            "struct A { int x; };\nstruct B { int y; };\n\
             void show(struct A *a) { }\nvoid show(struct B *b) { }\n\
             int main() { struct A a; struct B b; show(&a); show(&b); show(get()); }\n",
        );
        assert_eq!(unit.structs["A"].methods.len(), 1);
        assert_eq!(unit.structs["B"].methods.len(), 1);
        let body = render(&unit.body);
        assert!(body.contains("a.show()"));
        assert!(body.contains("b.show()"));
        assert!(body.contains("show(get())"));
        assert!(unit.diagnostics.iter().any(|d| d.kind == DiagnosticKind::AmbiguousCall));
    }

    #[test]
    fn test_receiver_type_picks_the_owner() {
        let unit = run_on(
            "struct A { int x; };\nstruct B { int y; };\nstruct C { int z; };\n\
             void show(struct A *a) { }\nvoid show(struct B *b) { }\n\
             int main() { struct B *pb; struct C c; show(pb); show(&c); }\n",
        );
        let body = render(&unit.body);
        assert!(body.contains("pb->show();"), "{}", body);
        assert!(body.contains("show(&c);"), "{}", body);
        assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
    }

    #[test]
    fn test_typedef_struct_alias() {
        let unit = run_on(
            "typedef struct node { int value; struct node *next; } Node;\n\
             int value_of(Node *n) { return n->value; }\n",
        );
        let record = &unit.structs["Node"];
        assert_eq!(field_names(record), vec!["value", "next"]);
        assert_eq!(record.fields[1].declaration(), "Node *next;");
        assert_eq!(record.methods.len(), 1);
    }

    #[test]
    fn test_prototype_removed_with_its_method() {
        let unit = run_on(
            "struct S { int a; };\nvoid show(struct S *s);\nint main() { return 0; }\nvoid show(struct S *s) { }\n",
        );
        assert!(!render(&unit.body).contains("show"));
    }

    #[test]
    fn test_struct_with_declarator_keeps_variable() {
        let unit = run_on("struct S { int a; } first, second;\n");
        assert_eq!(render(&unit.body), "S first, second;\n");
    }
}
