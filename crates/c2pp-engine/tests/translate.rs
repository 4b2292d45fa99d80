//! End-to-end translation tests.

use c2pp_engine::lexer::tokenize;
use c2pp_engine::passes::headers::HEADER_MAP;
use c2pp_engine::token::render;
use c2pp_engine::{transform, transform_with_diagnostics, DiagnosticKind, Options, Translator};

const BANNER: &str = "// Translated from C to C++ by c2pp\n\n";

const POINT_PROGRAM: &str = r#"#include <stdio.h>
#include <stdlib.h>

#define MAX_SIZE 100

// A simple structure
struct Point {
    int x;
    int y;
};

// Function to print a point
void printPoint(struct Point *p) {
    printf("Point: (%d, %d)\n", p->x, p->y);
}

int main() {
    struct Point *p = (struct Point *)malloc(sizeof(struct Point));
    p->x = 1;
    p->y = 2;
    printPoint(p);
    free(p);
    return 0;
}
"#;

/// The worked example: every idiom in one program.
#[test]
fn test_point_program() {
    let translation = transform_with_diagnostics(POINT_PROGRAM);
    let out = &translation.output;

    assert!(out.starts_with(BANNER), "missing banner:\n{}", out);
    assert!(out.contains("#include <iostream>\n#include <cstdlib>\n"));
    assert!(out.contains("using namespace std;"));
    assert!(out.contains("const int MAX_SIZE = 100;"));
    assert!(out.contains(
        "class Point {\npublic:\n    int x;\n    int y;\n\n    Point() {}\n\n    void printPoint();\n};"
    ));
    assert!(out.contains(
        "void Point::printPoint() {\n    cout << \"Point: (\" << x << \", \" << y << \")\" << endl;\n}"
    ));
    assert!(out.contains("struct Point *p = new Point;"));
    assert!(out.contains("p->printPoint();"));
    assert!(out.contains("delete p;"));
    assert!(out.contains("int main(int argc, char* argv[]) {"));

    assert!(!out.contains("malloc"));
    assert!(!out.contains("printf"));
    assert!(!out.contains("#define"));
    assert!(translation.diagnostics.is_empty(), "{:?}", translation.diagnostics);
}

/// Sections appear in their fixed order.
#[test]
fn test_point_program_section_order() {
    let out = transform(POINT_PROGRAM);
    let positions: Vec<usize> = [
        "// Translated",
        "#include <iostream>",
        "using namespace std;",
        "const int MAX_SIZE",
        "class Point",
        "void Point::printPoint",
        "int main(",
    ]
    .iter()
    .map(|needle| out.find(needle).expect("section present"))
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", out);
}

/// Input without any recognized idiom only gains the banner and namespace directive.
#[test]
fn test_no_op_input_is_unchanged() {
    let source = "int add(int a, int b) {\n    return a + b;\n}\n";
    assert_eq!(
        transform(source),
        format!("{}using namespace std;\n\n{}", BANNER, source)
    );
}

/// Every table entry maps; unmapped includes survive byte for byte.
#[test]
fn test_header_mapping_totality() {
    for (legacy, modern) in HEADER_MAP {
        let out = transform(&format!("#include <{}>\n", legacy));
        assert!(out.contains(&format!("#include <{}>", modern)), "{} -> {}", legacy, modern);
        assert!(!out.contains(legacy));
    }
    let out = transform("#include \"my_lib.h\"\n#include <sys/types.h>\n");
    assert!(out.contains("#include \"my_lib.h\"\n#include <sys/types.h>\n"));
}

/// Fields keep their declaration order.
#[test]
fn test_field_order_preserved() {
    let source = "struct Rec {\n    long id;\n    char name[32];\n    double score;\n    int *refs;\n    unsigned flags : 4;\n};\n";
    let out = transform(source);
    assert!(out.contains(
        "class Rec {\npublic:\n    long id;\n    char name[32];\n    double score;\n    int *refs;\n    unsigned flags : 4;\n\n    Rec() {}\n};"
    ), "{}", out);
}

/// One declared method per free function taking the struct as its first parameter.
#[test]
fn test_method_count_conservation() {
    let source = r#"struct Counter {
    int value;
};

void reset(struct Counter *c) {
    c->value = 0;
}

void add(struct Counter *c, int n) {
    c->value += n;
}

int get(struct Counter *c) {
    return c->value;
}

int twice(int n) {
    return n * 2;
}
"#;
    let out = transform(source);
    assert!(out.contains(
        "class Counter {\npublic:\n    int value;\n\n    Counter() {}\n\n    void reset();\n    void add(int n);\n    int get();\n};"
    ), "{}", out);
    assert!(out.contains("void Counter::reset() {\n    value = 0;\n}"));
    assert!(out.contains("void Counter::add(int n) {\n    value += n;\n}"));
    assert!(out.contains("int Counter::get() {\n    return value;\n}"));
    assert!(out.contains("int twice(int n) {\n    return n * 2;\n}"));
    assert!(!out.contains("Counter::twice"));
}

/// The second definition of a struct name wins.
#[test]
fn test_duplicate_struct_last_wins() {
    let translation = transform_with_diagnostics("struct P { int a; };\nstruct P { int b; int c; };\n");
    let out = &translation.output;
    assert_eq!(out.matches("class P").count(), 1);
    assert!(out.contains("    int b;\n    int c;\n"));
    assert!(!out.contains("int a;"));
    let kinds: Vec<DiagnosticKind> = translation.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::DuplicateStruct]);
}

/// One placeholder with two arguments gives two insertions, the second bare.
#[test]
fn test_mismatched_placeholder() {
    let translation = transform_with_diagnostics("int main() {\n    printf(\"%d\\n\", a, b);\n}\n");
    assert!(translation.output.contains("    cout << a << b << endl;\n"));
    assert_eq!(translation.diagnostics.len(), 1);
    assert_eq!(translation.diagnostics[0].kind, DiagnosticKind::FormatMismatch);
}

/// Directive-like text inside literals and comments is not a directive.
#[test]
fn test_macros_in_strings_and_comments_untouched() {
    let source = "// #define X 1\n/* printf(\"no\"); */\nconst char *s = \"#define Y 2\";\n";
    let out = transform(source);
    assert!(out.ends_with(source), "{}", out);
    assert!(!out.contains("const int"));
}

/// Diagnostics carry 1-based locations and come back in source order.
#[test]
fn test_diagnostics_located_and_sorted() {
    let source = "#define SQ(x) ((x)*(x))\nint main() {\n    printf(msg);\n    free(q);\n}\n";
    let translation = transform_with_diagnostics(source);
    let found: Vec<(DiagnosticKind, Option<(u32, u32)>)> =
        translation.diagnostics.iter().map(|d| (d.kind, d.location)).collect();
    assert_eq!(
        found,
        vec![
            (DiagnosticKind::FunctionLikeMacro, Some((1, 1))),
            (DiagnosticKind::NonLiteralFormat, Some((3, 5))),
            (DiagnosticKind::UnmatchedFree, Some((4, 5))),
        ]
    );
    assert!(translation.output.contains("#define SQ(x) ((x)*(x))"));
}

/// Options change the banner, namespace and header table.
#[test]
fn test_translator_options() {
    let options = Options::from_toml_str(
        "[output]\nbanner = \"generated\"\nnamespace = \"app\"\nindent = \"\\t\"\n\n[headers]\n\"conio.h\" = \"cstdio\"\n",
    )
    .expect("valid options");
    let translation = Translator::new(options).translate("#include <conio.h>\nstruct S { int v; };\n");
    assert_eq!(
        translation.output,
        "// generated\n\n#include <cstdio>\n\nusing namespace app;\n\nclass S {\npublic:\n\tint v;\n\n\tS() {}\n};\n"
    );
}

/// Concatenating the tokens reproduces the input exactly.
#[test]
fn test_tokenizer_is_lossless() {
    let source = "#include <stdio.h>\r\n#define LONG \\\n  1\nint main(void) { /* c */ char c = '\\''; // x\n  return \"s\\\"\" [0]; }\n\"open";
    assert_eq!(render(&tokenize(source)), source);
}

/// A small program rendered in full.
#[test]
fn test_hello_world_snapshot() {
    let out = transform("#include <stdio.h>\n\nint main() {\n    printf(\"%d\\n\", 42);\n    return 0;\n}\n");
    insta::assert_snapshot!(out, @r#"
// Translated from C to C++ by c2pp

#include <iostream>

using namespace std;

int main(int argc, char* argv[]) {
    cout << 42 << endl;
    return 0;
}
"#);
}

/// A format literal cut off by the end of the line is left alone.
#[test]
fn test_unterminated_format_literal() {
    let translation = transform_with_diagnostics("int main() {\n    printf(\"é\n    );\n}\n");
    assert!(translation.output.contains("    printf(\"é\n    );\n"), "{}", translation.output);
    let kinds: Vec<DiagnosticKind> = translation.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![DiagnosticKind::NonLiteralFormat, DiagnosticKind::UnterminatedLiteral]
    );
}

/// `sizeof` of an expression is not a type; the pair stays `malloc`/`free`.
#[test]
fn test_sizeof_expression_allocation_kept() {
    let source = "struct Point { int x; };\nint main() {\n    struct Point *p = malloc(sizeof(*p));\n    free(p);\n}\n";
    let translation = transform_with_diagnostics(source);
    let out = &translation.output;
    assert!(out.contains("struct Point *p = malloc(sizeof(*p));\n    free(p);"), "{}", out);
    assert!(!out.contains("new"));
    let kinds: Vec<DiagnosticKind> = translation.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::UnrecognizedAllocation, DiagnosticKind::UnmatchedFree]);
}

/// Array elements are tracked from allocation to release.
#[test]
fn test_array_element_allocation() {
    let source = "int main() {\n    arr[i] = malloc(sizeof(int));\n    free(arr[i]);\n}\n";
    let translation = transform_with_diagnostics(source);
    assert!(translation.output.contains("    arr[i] = new int;\n    delete arr[i];\n"), "{}", translation.output);
    assert!(translation.diagnostics.is_empty(), "{:?}", translation.diagnostics);
}

/// Function pointers and math calls use the C++ library.
#[test]
fn test_function_pointers_and_math() {
    let source = "#include <math.h>\n\ndouble half(double v) {\n    return v / 2;\n}\n\nint main() {\n    double (*op)(double) = half;\n    double r = sqrt(op(8.0));\n    return 0;\n}\n";
    let out = transform(source);
    assert!(out.contains("#include <cmath>\n#include <functional>\n"), "{}", out);
    assert!(out.contains("    std::function<double(double)> op = half;\n"), "{}", out);
    assert!(out.contains("    double r = std::sqrt(op(8.0));\n"), "{}", out);
}
