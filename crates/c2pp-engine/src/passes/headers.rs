//! Include mapping: legacy C headers to their C++ names.

use crate::token::TokenKind;
use crate::unit::{remove_line, Unit};
use indexmap::IndexMap;

/// Legacy header name to modern header name.
pub static HEADER_MAP: &[(&str, &str)] = &[
    ("stdio.h", "iostream"),
    ("stdlib.h", "cstdlib"),
    ("string.h", "string"),
    ("math.h", "cmath"),
    ("time.h", "ctime"),
    ("assert.h", "cassert"),
    ("ctype.h", "cctype"),
    ("float.h", "cfloat"),
    ("limits.h", "climits"),
    ("locale.h", "clocale"),
    ("signal.h", "csignal"),
    ("stdarg.h", "cstdarg"),
    ("stdbool.h", "cstdbool"),
    ("stddef.h", "cstddef"),
    ("stdint.h", "cstdint"),
];

/// Mapped name for `header`; the built-in table wins over `extra`.
pub fn lookup<'a>(header: &str, extra: &'a IndexMap<String, String>) -> Option<&'a str> {
    HEADER_MAP
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| *to)
        .or_else(|| extra.get(header).map(String::as_str))
}

/// The header named by an include directive.
pub fn include_target(directive: &str) -> Option<&str> {
    let rest = directive.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("include")?.trim_start();
    let close = match rest.chars().next()? {
        '<' => '>',
        '"' => '"',
        _ => return None,
    };
    let inner = &rest[1..];
    let end = inner.find(close)?;
    Some(&inner[..end])
}

/// Move every include into the include section, rewriting mapped ones.
pub fn run(unit: &mut Unit, extra: &IndexMap<String, String>) {
    let mut mapped = 0usize;
    let mut i = 0;
    while i < unit.body.len() {
        let tok = &unit.body[i];
        let line = match (tok.kind, include_target(&tok.text)) {
            (TokenKind::Directive, Some(header)) => match lookup(header, extra) {
                Some(modern) => {
                    mapped += 1;
                    tracing::trace!(header, modern, "mapped include");
                    format!("#include <{}>", modern)
                }
                None => tok.text.to_string(),
            },
            _ => {
                i += 1;
                continue;
            }
        };
        if !unit.includes.contains(&line) {
            unit.includes.push(line);
        }
        remove_line(&mut unit.body, i);
    }
    tracing::debug!(includes = unit.includes.len(), mapped, "header pass complete");
}
