//! Translator options (`c2pp.toml` format).
//!
//! ```toml
//! [output]
//! banner = "Translated from C to C++ by c2pp"
//! namespace = "std"
//! indent = "    "
//!
//! [headers]
//! "conio.h" = "cstdio"
//! ```

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_BANNER: &str = "Translated from C to C++ by c2pp";

/// Root options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Options {
    #[serde(default)]
    pub output: OutputOptions,

    /// Header mappings consulted after the built-in table.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

/// Shape of the emitted text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Banner comment text. `None` disables the banner.
    pub banner: Option<String>,

    /// Namespace named in the `using namespace` directive.
    pub namespace: String,

    /// Indentation used inside synthesized classes.
    pub indent: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            banner: Some(DEFAULT_BANNER.to_string()),
            namespace: "std".to_string(),
            indent: "    ".to_string(),
        }
    }
}

impl Options {
    /// Load options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Options = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let ns = &self.output.namespace;
        let valid_ident = ns
            .chars()
            .next()
            .map_or(false, |c| c == '_' || c.is_ascii_alphabetic())
            && ns.chars().all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !valid_ident {
            return Err(ConfigError::Validation(format!(
                "namespace '{}' is not an identifier",
                ns
            )));
        }
        if !self.output.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ConfigError::Validation(
                "indent must contain only spaces or tabs".to_string(),
            ));
        }
        for (from, to) in &self.headers {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "header mapping '{}' -> '{}' has an empty side",
                    from, to
                )));
            }
        }
        Ok(())
    }
}
