//! C to C++ idiom translator.
//!
//! The input is tokenized once into a lossless token stream, then a fixed
//! sequence of passes rewrites it in place:
//!
//! 1. [`passes::headers`]: legacy includes become their C++ names.
//! 2. [`passes::macros`]: literal `#define`s become typed constants.
//! 3. [`passes::classes`]: structs and their free functions become classes.
//! 4. [`passes::alloc`]: `malloc`/`calloc`/`free` become `new`/`delete`.
//! 5. [`passes::io`]: `printf`/`scanf` become stream chains.
//! 6. [`passes::stdlib`]: function pointers become `std::function`, math
//!    calls are qualified with `std::`.
//! 7. [`passes::entry`]: `main()` gets the `argc`/`argv` signature.
//!
//! [`render::render_unit`] then lays the sections out in their fixed order.
//!
//! ```
//! let out = c2pp_engine::transform("#include <stdio.h>\nint main() {\n    printf(\"hi\\n\");\n}\n");
//! assert!(out.contains("#include <iostream>"));
//! assert!(out.contains("cout << \"hi\" << endl;"));
//! assert!(out.contains("int main(int argc, char* argv[])"));
//! ```
//!
//! Translation never fails. Constructs left untranslated are reported as
//! [`Diagnostic`]s through [`transform_with_diagnostics`].

pub mod error;
pub mod lexer;
pub mod options;
pub mod passes;
pub mod render;
pub mod token;
pub mod unit;

pub use c2pp_common::{Diagnostic, DiagnosticKind, DiagnosticLevel, SourceFile};
pub use error::{ConfigError, Result};
pub use options::Options;

use lexer::Lexer;
use unit::Unit;

/// Output text together with everything the passes reported.
#[derive(Debug, Clone)]
pub struct Translation {
    pub output: String,
    /// Sorted by source offset; diagnostics without a span come last.
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the pass pipeline with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    options: Options,
}

impl Translator {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn translate(&self, source: &str) -> Translation {
        self.translate_named("<input>", source)
    }

    /// Translate, attributing diagnostic locations to the file `name`.
    pub fn translate_named(&self, name: &str, source: &str) -> Translation {
        let _span = tracing::debug_span!("translate", file = name, bytes = source.len()).entered();

        let (tokens, lex_diagnostics) = Lexer::new(source).tokenize();
        tracing::debug!(tokens = tokens.len(), "tokenized");
        let mut unit = Unit::new(tokens);
        unit.diagnostics = lex_diagnostics;

        passes::headers::run(&mut unit, &self.options.headers);
        passes::macros::run(&mut unit);
        passes::classes::run(&mut unit);
        passes::alloc::run(&mut unit);
        passes::io::run(&mut unit);
        passes::stdlib::run(&mut unit);
        passes::entry::run(&mut unit);

        let output = render::render_unit(&unit, &self.options.output);

        let file = SourceFile::new(name, source);
        let mut diagnostics: Vec<Diagnostic> = std::mem::take(&mut unit.diagnostics)
            .into_iter()
            .map(|d| d.locate(&file))
            .collect();
        diagnostics.sort_by_key(|d| d.offset().unwrap_or(usize::MAX));
        tracing::debug!(diagnostics = diagnostics.len(), bytes = output.len(), "translation complete");

        Translation { output, diagnostics }
    }
}

/// Translate with default options.
pub fn transform(source: &str) -> String {
    transform_with_diagnostics(source).output
}

/// Translate with default options, keeping the diagnostics.
pub fn transform_with_diagnostics(source: &str) -> Translation {
    Translator::default().translate(source)
}
