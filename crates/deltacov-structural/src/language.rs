use std::path::Path;

/// JVM source language detected from a file extension.
///
/// Only languages that compile to JVM classes are supported, since the
/// reconciler matches diff records against compiled-class coverage data.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use deltacov_structural::Language;
///
/// assert_eq!(Language::from_path(Path::new("src/Foo.java")), Some(Language::Java));
/// assert_eq!(Language::from_path(Path::new("src/Foo.kt")), Some(Language::Kotlin));
/// assert_eq!(Language::from_path(Path::new("build.gradle")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    Kotlin,
}

impl Language {
    /// Detect the language from a file path, or `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("java") => Some(Language::Java),
            Some("kt") | Some("kts") => Some(Language::Kotlin),
            _ => None,
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        match self {
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_jvm_sources_only() {
        assert_eq!(
            Language::from_path(Path::new("a/b/C.java")),
            Some(Language::Java)
        );
        assert_eq!(
            Language::from_path(Path::new("a/b/C.kt")),
            Some(Language::Kotlin)
        );
        assert_eq!(
            Language::from_path(Path::new("script.kts")),
            Some(Language::Kotlin)
        );
        assert_eq!(Language::from_path(Path::new("README.md")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }
}
