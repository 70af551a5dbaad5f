use std::collections::{HashMap, HashSet};

use deltacov_core::{ChangeKind, MethodInfo};
use deltacov_structural::{ParsedMethod, StructuralUnit};

/// Classify every method change between the two sides of one file.
///
/// Matching is by signature, so a method that merely moved or was
/// reformatted is recognized as the same method. Unchanged methods are
/// dropped; the result holds only added, modified, and deleted entries, in
/// new-side declaration order followed by deletions in old-side order.
/// Added and modified methods carry new-side line coordinates; deleted
/// methods carry old-side coordinates.
///
/// # Examples
///
/// ```
/// use deltacov_diff::diff_methods;
///
/// assert!(diff_methods(None, None).is_empty());
/// ```
pub fn diff_methods(
    before: Option<&StructuralUnit>,
    after: Option<&StructuralUnit>,
) -> Vec<MethodInfo> {
    let empty = Vec::new();
    let before_methods = before.map_or(&empty, |u| &u.methods);
    let after_methods = after.map_or(&empty, |u| &u.methods);

    let before_by_sig: HashMap<&str, &ParsedMethod> = before_methods
        .iter()
        .map(|m| (m.signature.as_str(), m))
        .collect();
    let after_sigs: HashSet<&str> = after_methods.iter().map(|m| m.signature.as_str()).collect();

    let mut changes = Vec::new();

    for method in after_methods {
        match before_by_sig.get(method.signature.as_str()) {
            None => changes.push(MethodInfo {
                signature: method.signature.clone(),
                start_line: method.start_line,
                end_line: method.end_line,
                fingerprint: method.fingerprint.clone(),
                change_kind: ChangeKind::Added,
            }),
            Some(old) if old.fingerprint != method.fingerprint => changes.push(MethodInfo {
                signature: method.signature.clone(),
                start_line: method.start_line,
                end_line: method.end_line,
                fingerprint: method.fingerprint.clone(),
                change_kind: ChangeKind::Modified,
            }),
            Some(_) => {}
        }
    }

    for method in before_methods {
        if !after_sigs.contains(method.signature.as_str()) {
            changes.push(MethodInfo {
                signature: method.signature.clone(),
                start_line: method.start_line,
                end_line: method.end_line,
                fingerprint: method.fingerprint.clone(),
                change_kind: ChangeKind::Deleted,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltacov_structural::ParsedMethod;

    fn method(signature: &str, start: u32, end: u32, fingerprint: &str) -> ParsedMethod {
        ParsedMethod {
            signature: signature.into(),
            start_line: start,
            end_line: end,
            fingerprint: fingerprint.into(),
        }
    }

    fn unit(methods: Vec<ParsedMethod>) -> StructuralUnit {
        StructuralUnit {
            package: "com.example".into(),
            class_name: "Foo".into(),
            methods,
        }
    }

    #[test]
    fn identical_units_yield_no_changes() {
        let a = unit(vec![method("bar()", 3, 6, "aa"), method("baz()", 8, 11, "bb")]);
        let b = a.clone();
        assert!(diff_methods(Some(&a), Some(&b)).is_empty());
    }

    #[test]
    fn shifted_but_identical_methods_are_unchanged() {
        let before = unit(vec![method("bar()", 3, 6, "aa")]);
        let after = unit(vec![method("bar()", 43, 46, "aa")]);
        assert!(diff_methods(Some(&before), Some(&after)).is_empty());
    }

    #[test]
    fn modified_method_reports_after_side_lines() {
        let before = unit(vec![method("bar()", 3, 6, "aa")]);
        let after = unit(vec![method("bar()", 10, 15, "cc")]);
        let changes = diff_methods(Some(&before), Some(&after));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_kind, ChangeKind::Modified);
        assert_eq!(changes[0].start_line, 10);
        assert_eq!(changes[0].end_line, 15);
    }

    #[test]
    fn deleted_method_reports_before_side_lines() {
        let before = unit(vec![method("bar()", 3, 6, "aa")]);
        let after = unit(Vec::new());
        let changes = diff_methods(Some(&before), Some(&after));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_kind, ChangeKind::Deleted);
        assert_eq!(changes[0].start_line, 3);
    }

    #[test]
    fn absent_before_side_marks_everything_added() {
        let after = unit(vec![method("bar()", 1, 4, "aa"), method("baz()", 6, 9, "bb")]);
        let changes = diff_methods(None, Some(&after));
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|m| m.change_kind == ChangeKind::Added));
    }

    #[test]
    fn mixed_change_set_round_trips() {
        // A unchanged, B added, C modified, D deleted.
        let before = unit(vec![
            method("a()", 1, 3, "fa"),
            method("c()", 5, 9, "fc"),
            method("d()", 11, 14, "fd"),
        ]);
        let after = unit(vec![
            method("a()", 1, 3, "fa"),
            method("b()", 5, 7, "fb"),
            method("c()", 9, 13, "fc2"),
        ]);

        let changes = diff_methods(Some(&before), Some(&after));
        let kinds: Vec<(&str, ChangeKind)> = changes
            .iter()
            .map(|m| (m.signature.as_str(), m.change_kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("b()", ChangeKind::Added),
                ("c()", ChangeKind::Modified),
                ("d()", ChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn overloads_are_tracked_independently() {
        let before = unit(vec![
            method("f(int)", 1, 3, "fa"),
            method("f(String)", 5, 7, "fb"),
        ]);
        let after = unit(vec![
            method("f(int)", 1, 3, "fa"),
            method("f(String)", 5, 8, "fb2"),
        ]);
        let changes = diff_methods(Some(&before), Some(&after));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].signature, "f(String)");
        assert_eq!(changes[0].change_kind, ChangeKind::Modified);
    }
}
