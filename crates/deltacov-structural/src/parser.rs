use std::collections::HashSet;
use std::path::Path;

use deltacov_core::{DeltacovError, SignaturePolicy};
use tree_sitter::{Node, Parser};

use crate::fingerprint::fingerprint;
use crate::language::Language;

/// One method-like member extracted from a source file.
///
/// # Examples
///
/// ```
/// use deltacov_structural::ParsedMethod;
///
/// let method = ParsedMethod {
///     signature: "connect(String,int)".into(),
///     start_line: 12,
///     end_line: 20,
///     fingerprint: "3b7a".into(),
/// };
/// assert_eq!(method.signature, "connect(String,int)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMethod {
    /// Method name plus erased parameter types; methods of nested types
    /// carry an `Outer$Inner#` qualifying prefix.
    pub signature: String,
    /// First line of the declaration (1-indexed).
    pub start_line: u32,
    /// Last line of the declaration (1-indexed).
    pub end_line: u32,
    /// Normalized-body content hash.
    pub fingerprint: String,
}

/// The parsed shape of one source file, independent of formatting.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use deltacov_core::SignaturePolicy;
/// use deltacov_structural::parse;
///
/// let unit = parse(
///     "package com.example;\nclass Foo {\n  void bar() { }\n}\n",
///     Path::new("src/main/java/com/example/Foo.java"),
///     SignaturePolicy::NameAndParams,
/// )
/// .unwrap();
/// assert_eq!(unit.package, "com.example");
/// assert_eq!(unit.class_name, "Foo");
/// assert_eq!(unit.methods[0].signature, "bar()");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralUnit {
    /// Dotted package name; empty for the default package.
    pub package: String,
    /// Primary class name of the file.
    pub class_name: String,
    /// Methods in declaration order, unique by signature.
    pub methods: Vec<ParsedMethod>,
}

impl StructuralUnit {
    /// Look up a method by signature.
    pub fn method(&self, signature: &str) -> Option<&ParsedMethod> {
        self.methods.iter().find(|m| m.signature == signature)
    }
}

/// Parse one source file into a [`StructuralUnit`].
///
/// Tree-sitter is error-tolerant, so files with localized syntax errors
/// still yield the members that did parse. Methods without a body (abstract
/// and interface declarations) are skipped: they compile to no executable
/// lines, so there is nothing for coverage to narrow to.
///
/// # Errors
///
/// Returns [`DeltacovError::Parse`] when the file extension is unsupported,
/// the grammar cannot be loaded, or the text is malformed enough that no
/// member could be extracted.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use deltacov_core::SignaturePolicy;
/// use deltacov_structural::parse;
///
/// let err = parse("x", Path::new("notes.txt"), SignaturePolicy::NameAndParams);
/// assert!(err.is_err());
/// ```
pub fn parse(
    content: &str,
    path: &Path,
    policy: SignaturePolicy,
) -> Result<StructuralUnit, DeltacovError> {
    let language = Language::from_path(path).ok_or_else(|| {
        DeltacovError::Parse(format!("unsupported source file: {}", path.display()))
    })?;

    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| DeltacovError::Parse(format!("failed to set language: {e}")))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| DeltacovError::Parse(format!("failed to parse {}", path.display())))?;

    let root = tree.root_node();
    let source = content.as_bytes();

    let package = extract_package(root, source);
    let class_name =
        extract_primary_class(root, source).unwrap_or_else(|| fallback_class_name(path, language));

    let mut methods = Vec::new();
    let mut seen = HashSet::new();
    collect_methods(
        root,
        source,
        language,
        policy,
        &class_name,
        "",
        true,
        &mut seen,
        &mut methods,
    );

    if methods.is_empty() && !content.trim().is_empty() && root.has_error() {
        return Err(DeltacovError::Parse(format!(
            "no parsable declarations in {}",
            path.display()
        )));
    }

    Ok(StructuralUnit {
        package,
        class_name,
        methods,
    })
}

fn extract_package(root: Node, source: &[u8]) -> String {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        // Java: package_declaration, Kotlin: package_header
        if child.kind().starts_with("package") {
            let text = node_text(&child, source);
            return text
                .trim_start_matches("package")
                .trim()
                .trim_end_matches(';')
                .trim()
                .to_string();
        }
    }
    String::new()
}

const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "object_declaration",
];

const METHOD_DECLARATION_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "function_declaration",
    "secondary_constructor",
];

fn extract_primary_class(root: Node, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if TYPE_DECLARATION_KINDS.contains(&child.kind()) {
            if let Some(name) = declaration_name(&child, source) {
                return Some(name);
            }
        }
    }
    None
}

fn fallback_class_name(path: &Path, language: Language) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown");
    match language {
        Language::Java => stem.to_string(),
        // Kotlin top-level members compile into a `FooKt` facade class.
        Language::Kotlin => {
            let mut chars = stem.chars();
            match chars.next() {
                Some(first) => format!("{}{}Kt", first.to_uppercase(), chars.as_str()),
                None => "UnknownKt".to_string(),
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_methods(
    node: Node,
    source: &[u8],
    language: Language,
    policy: SignaturePolicy,
    primary: &str,
    prefix: &str,
    at_top_level: bool,
    seen: &mut HashSet<String>,
    methods: &mut Vec<ParsedMethod>,
) {
    let kind = node.kind();

    if TYPE_DECLARATION_KINDS.contains(&kind) {
        let name = declaration_name(&node, source).unwrap_or_default();
        // The primary class contributes no prefix; nested and sibling types
        // are flattened with `Outer$Inner#`.
        let new_prefix = if at_top_level && name == primary {
            String::new()
        } else if prefix.is_empty() {
            name
        } else {
            format!("{prefix}${name}")
        };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect_methods(
                child, source, language, policy, primary, &new_prefix, false, seen, methods,
            );
        }
        return;
    }

    if METHOD_DECLARATION_KINDS.contains(&kind) {
        if let Some(method) = extract_method(&node, source, language, policy, prefix) {
            // Erased-identical overloads collapse onto the first occurrence.
            if seen.insert(method.signature.clone()) {
                methods.push(method);
            }
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_methods(
            child,
            source,
            language,
            policy,
            primary,
            prefix,
            at_top_level,
            seen,
            methods,
        );
    }
}

fn extract_method(
    node: &Node,
    source: &[u8],
    language: Language,
    policy: SignaturePolicy,
    prefix: &str,
) -> Option<ParsedMethod> {
    let body = node
        .child_by_field_name("body")
        .or_else(|| find_child(node, &["function_body", "constructor_body", "block"]))?;

    let name = declaration_name(node, source)?;
    let params = parameter_types(node, source, language, policy);

    let signature = if prefix.is_empty() {
        format!("{name}({})", params.join(","))
    } else {
        format!("{prefix}#{name}({})", params.join(","))
    };

    Some(ParsedMethod {
        signature,
        start_line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        fingerprint: fingerprint(&node_text(&body, source)),
    })
}

fn parameter_types(
    node: &Node,
    source: &[u8],
    language: Language,
    policy: SignaturePolicy,
) -> Vec<String> {
    let Some(params) = node
        .child_by_field_name("parameters")
        .or_else(|| find_child(node, &["formal_parameters", "function_value_parameters"]))
    else {
        return Vec::new();
    };

    let mut types = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        if !child.kind().contains("parameter") {
            continue;
        }
        if let Some(ty) = parameter_type(&child, source, language) {
            types.push(erase_type(&ty, policy));
        }
    }
    types
}

fn parameter_type(param: &Node, source: &[u8], language: Language) -> Option<String> {
    if let Some(ty) = param.child_by_field_name("type") {
        return Some(node_text(&ty, source));
    }
    match language {
        // Java spread parameters lack a `type` field; the type is the first
        // named child.
        Language::Java => param
            .named_child(0)
            .map(|ty| format!("{}[]", node_text(&ty, source))),
        // Kotlin parameters read `name: Type`; the type is the last named
        // child after the identifier.
        Language::Kotlin => {
            let mut cursor = param.walk();
            param
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "simple_identifier" && !c.kind().contains("modifier"))
                .last()
                .map(|ty| node_text(&ty, source))
        }
    }
}

/// Reduce a parameter type to its identity form: whitespace removed and,
/// under [`SignaturePolicy::NameAndParams`], generic arguments erased.
fn erase_type(ty: &str, policy: SignaturePolicy) -> String {
    let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
    match policy {
        SignaturePolicy::NameParamsAndGenerics => compact,
        SignaturePolicy::NameAndParams => {
            let mut out = String::with_capacity(compact.len());
            let mut depth = 0u32;
            for c in compact.chars() {
                match c {
                    '<' => depth += 1,
                    '>' => depth = depth.saturating_sub(1),
                    c if depth == 0 => out.push(c),
                    _ => {}
                }
            }
            out
        }
    }
}

fn declaration_name(node: &Node, source: &[u8]) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(&name, source));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(
            child.kind(),
            "identifier" | "type_identifier" | "simple_identifier"
        ) {
            let text = node_text(&child, source);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn find_child<'a>(node: &Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if kinds.contains(&child.kind()) {
            return Some(child);
        }
    }
    None
}

fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}
