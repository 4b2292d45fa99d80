//! The rewrite passes, in the order the translator runs them.

pub mod headers;
pub mod macros;
pub mod classes;
pub mod alloc;
pub mod io;
pub mod stdlib;
pub mod entry;
