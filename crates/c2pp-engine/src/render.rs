//! Final assembly of the translated text.

use crate::options::OutputOptions;
use crate::passes::classes::{class_declaration, method_definitions};
use crate::passes::stdlib::FUNCTIONAL_INCLUDE;
use crate::token::render;
use crate::unit::Unit;

pub const IOMANIP_INCLUDE: &str = "#include <iomanip>";

/// Assemble the output: banner, includes, namespace directive, constants,
/// class declarations, method definitions, then the remaining body. Empty
/// sections are skipped; the rest are separated by one blank line.
pub fn render_unit(unit: &Unit, options: &OutputOptions) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(banner) = options.banner.as_deref().filter(|b| !b.trim().is_empty()) {
        sections.push(format!("// {}", banner.trim()));
    }

    let mut includes = unit.includes.clone();
    if unit.needs_iomanip && !includes.iter().any(|i| i == IOMANIP_INCLUDE) {
        includes.push(IOMANIP_INCLUDE.to_string());
    }
    if unit.needs_functional && !includes.iter().any(|i| i == FUNCTIONAL_INCLUDE) {
        includes.push(FUNCTIONAL_INCLUDE.to_string());
    }
    push_lines(&mut sections, &includes, "\n");

    sections.push(format!("using namespace {};", options.namespace));

    push_lines(&mut sections, &unit.constants, "\n");

    let classes: Vec<String> = unit
        .structs
        .values()
        .map(|record| class_declaration(record, &options.indent))
        .collect();
    push_lines(&mut sections, &classes, "\n\n");

    let methods: Vec<String> = unit.structs.values().flat_map(method_definitions).collect();
    push_lines(&mut sections, &methods, "\n\n");

    let body = render(&unit.body);
    let body = trim_leading_blank_lines(&body);
    if !body.trim().is_empty() {
        sections.push(body.to_string());
    }

    let mut out = sections.join("\n\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn push_lines(sections: &mut Vec<String>, lines: &[String], separator: &str) {
    if !lines.is_empty() {
        sections.push(lines.join(separator));
    }
}

/// Drop whole lines of whitespace at the start, keeping the indentation of
/// the first line with content.
fn trim_leading_blank_lines(text: &str) -> &str {
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    &text[start..]
}
