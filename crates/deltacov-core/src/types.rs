use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a method-level change between two revisions.
///
/// Unchanged methods are never materialized: a method whose normalized body
/// is identical on both sides is dropped before it reaches any consumer.
///
/// # Examples
///
/// ```
/// use deltacov_core::ChangeKind;
///
/// let kind = ChangeKind::Modified;
/// assert_eq!(format!("{kind}"), "modified");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present only in the new revision.
    Added,
    /// Present in both revisions with a differing body.
    Modified,
    /// Present only in the old revision.
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// One changed method inside a [`ClassInfo`].
///
/// Line coordinates are taken from the new revision for added/modified
/// methods and from the old revision for deleted ones, so consumers can map
/// the range onto the snapshot that actually contains the code.
///
/// # Examples
///
/// ```
/// use deltacov_core::{ChangeKind, MethodInfo};
///
/// let method = MethodInfo {
///     signature: "bar(int,String)".into(),
///     start_line: 10,
///     end_line: 18,
///     fingerprint: "9f2c".into(),
///     change_kind: ChangeKind::Modified,
/// };
/// assert!(method.contains_line(12));
/// assert!(!method.contains_line(19));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    /// Identity key: method name plus erased parameter type sequence.
    /// Stable across whitespace, comment, and line-position changes.
    pub signature: String,
    /// First line of the method (1-indexed, inclusive).
    pub start_line: u32,
    /// Last line of the method (1-indexed, inclusive).
    pub end_line: u32,
    /// Content hash of the normalized method body.
    pub fingerprint: String,
    /// How this method changed.
    pub change_kind: ChangeKind,
}

impl MethodInfo {
    /// Returns `true` if `line` falls inside this method's span.
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Per-class diff record: the changed methods of one source file's primary
/// class, including methods of nested types flattened with a qualifying
/// prefix.
///
/// A class with only unchanged methods is never materialized, so
/// `change_kind` is always [`ChangeKind::Added`] (new file) or
/// [`ChangeKind::Modified`] (existing file with method changes).
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use deltacov_core::{ChangeKind, ClassInfo};
///
/// let class = ClassInfo {
///     package: "com.example.auth".into(),
///     class_name: "TokenStore".into(),
///     source_path: PathBuf::from("src/main/java/com/example/auth/TokenStore.java"),
///     methods: vec![],
///     change_kind: ChangeKind::Modified,
/// };
/// assert_eq!(class.qualified_name(), "com/example/auth/TokenStore");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    /// Dotted package name; empty for the default package.
    pub package: String,
    /// Primary class name of the source file.
    pub class_name: String,
    /// Source file path relative to the repository root.
    pub source_path: PathBuf,
    /// Changed methods, unique by signature, in declaration order.
    pub methods: Vec<MethodInfo>,
    /// Added if the file did not exist in the old revision, else Modified.
    pub change_kind: ChangeKind,
}

impl ClassInfo {
    /// VM-internal qualified name (`com/example/Foo`), the key compiled
    /// coverage records are registered under.
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}/{}", self.package.replace('.', "/"), self.class_name)
        }
    }

    /// Relative class-file path without extension (`com/example/Foo`).
    pub fn class_file(&self) -> String {
        self.qualified_name()
    }

    /// Returns the changed method whose span contains `line`, if any.
    pub fn method_at_line(&self, line: u32) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.contains_line(line))
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} methods)",
            self.qualified_name(),
            self.change_kind,
            self.methods.len()
        )
    }
}

/// Why a changed file was skipped during aggregation.
///
/// # Examples
///
/// ```
/// use deltacov_core::SkipReason;
///
/// let reason = SkipReason::Parse;
/// assert_eq!(format!("{reason}"), "parse");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// File content could not be fetched from a snapshot.
    Fetch,
    /// File content could not be parsed into a structural unit.
    Parse,
    /// File was deleted in the new revision; no coverage target exists.
    Deleted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Fetch => write!(f, "fetch"),
            SkipReason::Parse => write!(f, "parse"),
            SkipReason::Deleted => write!(f, "deleted"),
        }
    }
}

/// A degraded, per-file failure accumulated during a diff run.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use deltacov_core::{Diagnostic, SkipReason};
///
/// let diag = Diagnostic {
///     path: PathBuf::from("src/Broken.java"),
///     reason: SkipReason::Parse,
///     detail: "no class declaration found".into(),
/// };
/// assert_eq!(diag.reason, SkipReason::Parse);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// File the failure applies to.
    pub path: PathBuf,
    /// Failure category.
    pub reason: SkipReason,
    /// Human-readable detail.
    pub detail: String,
}

/// The complete structural diff between two revisions.
///
/// Built once per diff run and never mutated afterwards. Class order equals
/// the revision store's changed-file order, and qualified names are unique
/// within one result.
///
/// # Examples
///
/// ```
/// use deltacov_core::DiffResult;
///
/// let diff = DiffResult::default();
/// assert!(diff.is_empty());
/// assert!(diff.find("com/example/Foo").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Per-class diff records, one per changed source file.
    pub classes: Vec<ClassInfo>,
    /// Degraded failures collected while building this result.
    pub diagnostics: Vec<Diagnostic>,
    /// Qualified names claimed by multiple source files with conflicting
    /// content. Coverage for these classes cannot be trusted and must be
    /// reported as no-match.
    #[serde(default)]
    pub duplicate_classes: Vec<String>,
}

impl DiffResult {
    /// Create a result from already-aggregated classes and diagnostics.
    pub fn new(classes: Vec<ClassInfo>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            classes,
            diagnostics,
            duplicate_classes: Vec::new(),
        }
    }

    /// Returns `true` if `qualified_name` was claimed by conflicting files.
    pub fn is_duplicate(&self, qualified_name: &str) -> bool {
        self.duplicate_classes
            .iter()
            .any(|name| name == qualified_name)
    }

    /// Returns `true` if no class changed.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Look up a class by VM-internal qualified name.
    pub fn find(&self, qualified_name: &str) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .find(|c| c.qualified_name() == qualified_name)
    }
}

/// How the reconciler treats coverage records for classes outside the diff.
///
/// # Examples
///
/// ```
/// use deltacov_core::ReportMode;
///
/// let mode: ReportMode = "incremental".parse().unwrap();
/// assert_eq!(mode, ReportMode::Incremental);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Only changed classes appear; their counters are narrowed to changed
    /// method line ranges.
    #[default]
    Incremental,
    /// Untouched classes pass through unfiltered; changed classes are still
    /// narrowed.
    Full,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Incremental => write!(f, "incremental"),
            ReportMode::Full => write!(f, "full"),
        }
    }
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" => Ok(ReportMode::Incremental),
            "full" => Ok(ReportMode::Full),
            other => Err(format!("unknown report mode: {other}")),
        }
    }
}

/// How overloaded methods are told apart when building signatures.
///
/// # Examples
///
/// ```
/// use deltacov_core::SignaturePolicy;
///
/// let policy = SignaturePolicy::default();
/// assert_eq!(policy, SignaturePolicy::NameAndParams);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignaturePolicy {
    /// Method name plus erased parameter type names; generic arguments and
    /// return types do not participate.
    #[default]
    NameAndParams,
    /// Like [`SignaturePolicy::NameAndParams`] but generic arguments are
    /// kept in the parameter types, so `List<String>` and `List<Integer>`
    /// parameters produce distinct signatures.
    NameParamsAndGenerics,
}

impl FromStr for SignaturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nameandparams" => Ok(SignaturePolicy::NameAndParams),
            "nameparamsandgenerics" => Ok(SignaturePolicy::NameParamsAndGenerics),
            other => Err(format!("unknown signature policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class() -> ClassInfo {
        ClassInfo {
            package: "com.example".into(),
            class_name: "Foo".into(),
            source_path: PathBuf::from("src/main/java/com/example/Foo.java"),
            methods: vec![
                MethodInfo {
                    signature: "bar()".into(),
                    start_line: 5,
                    end_line: 9,
                    fingerprint: "aa".into(),
                    change_kind: ChangeKind::Modified,
                },
                MethodInfo {
                    signature: "qux(int)".into(),
                    start_line: 11,
                    end_line: 14,
                    fingerprint: "bb".into(),
                    change_kind: ChangeKind::Added,
                },
            ],
            change_kind: ChangeKind::Modified,
        }
    }

    #[test]
    fn qualified_name_uses_slashes() {
        assert_eq!(sample_class().qualified_name(), "com/example/Foo");
    }

    #[test]
    fn qualified_name_default_package() {
        let mut class = sample_class();
        class.package = String::new();
        assert_eq!(class.qualified_name(), "Foo");
    }

    #[test]
    fn method_at_line_finds_enclosing_method() {
        let class = sample_class();
        assert_eq!(class.method_at_line(7).unwrap().signature, "bar()");
        assert_eq!(class.method_at_line(11).unwrap().signature, "qux(int)");
        assert!(class.method_at_line(10).is_none());
    }

    #[test]
    fn diff_result_find_by_qualified_name() {
        let diff = DiffResult::new(vec![sample_class()], Vec::new());
        assert!(diff.find("com/example/Foo").is_some());
        assert!(diff.find("com/example/Bar").is_none());
        assert!(!diff.is_empty());
    }

    #[test]
    fn change_kind_display() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::Modified.to_string(), "modified");
        assert_eq!(ChangeKind::Deleted.to_string(), "deleted");
    }

    #[test]
    fn report_mode_from_str() {
        assert_eq!(
            "incremental".parse::<ReportMode>().unwrap(),
            ReportMode::Incremental
        );
        assert_eq!("FULL".parse::<ReportMode>().unwrap(), ReportMode::Full);
        assert!("partial".parse::<ReportMode>().is_err());
    }

    #[test]
    fn signature_policy_from_str() {
        assert_eq!(
            "nameAndParams".parse::<SignaturePolicy>().unwrap(),
            SignaturePolicy::NameAndParams
        );
        assert_eq!(
            "nameParamsAndGenerics".parse::<SignaturePolicy>().unwrap(),
            SignaturePolicy::NameParamsAndGenerics
        );
        assert!("erased".parse::<SignaturePolicy>().is_err());
    }

    #[test]
    fn method_info_serializes_camel_case() {
        let method = MethodInfo {
            signature: "bar()".into(),
            start_line: 1,
            end_line: 2,
            fingerprint: "ff".into(),
            change_kind: ChangeKind::Added,
        };
        let json = serde_json::to_value(&method).unwrap();
        assert!(json.get("startLine").is_some());
        assert!(json.get("start_line").is_none());
        assert_eq!(json.get("changeKind").unwrap(), "added");
    }

    #[test]
    fn class_info_serializes_camel_case() {
        let json = serde_json::to_value(sample_class()).unwrap();
        assert!(json.get("className").is_some());
        assert!(json.get("sourcePath").is_some());
    }
}
