//! Structural parsing of JVM source files via tree-sitter.
//!
//! Turns one file's text into a [`StructuralUnit`]: package name, primary
//! class name, and every method-like member with a formatting-stable
//! signature and a normalized-body fingerprint. This is what lets the differ
//! recognize a method that merely moved as the same method, and a cosmetic
//! edit as no change at all.

mod fingerprint;
mod language;
mod parser;

pub use fingerprint::fingerprint;
pub use language::Language;
pub use parser::{parse, ParsedMethod, StructuralUnit};
