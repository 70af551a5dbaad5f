use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use deltacov_core::{ChangeKind, ClassInfo};

/// A missed/covered pair, the basic unit of coverage accounting.
///
/// # Examples
///
/// ```
/// use deltacov_reconcile::Counter;
///
/// let mut counter = Counter::new(3, 1);
/// counter.increment(&Counter::new(1, 2));
/// assert_eq!(counter.missed, 4);
/// assert_eq!(counter.covered, 3);
/// assert_eq!(counter.total(), 7);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    /// Units not executed.
    pub missed: u32,
    /// Units executed at least once.
    pub covered: u32,
}

impl Counter {
    /// Create a counter from missed and covered counts.
    pub fn new(missed: u32, covered: u32) -> Self {
        Self { missed, covered }
    }

    /// Add another counter into this one.
    pub fn increment(&mut self, other: &Counter) {
        self.missed += other.missed;
        self.covered += other.covered;
    }

    /// Total units counted.
    pub fn total(&self) -> u32 {
        self.missed + self.covered
    }

    /// Fraction of units covered, or 0.0 when nothing was counted.
    pub fn covered_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            f64::from(self.covered) / f64::from(self.total())
        }
    }
}

/// Instruction and branch counters for one source line.
///
/// # Examples
///
/// ```
/// use deltacov_reconcile::{Counter, LineHits};
///
/// let line = LineHits {
///     instructions: Counter::new(0, 4),
///     branches: Counter::new(1, 1),
/// };
/// assert!(line.is_covered());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineHits {
    /// Bytecode instruction counter for the line.
    pub instructions: Counter,
    /// Branch counter for the line; zero totals for non-branching lines.
    pub branches: Counter,
}

impl LineHits {
    /// Merge another execution of the same line.
    pub fn merge(&mut self, other: &LineHits) {
        self.instructions.increment(&other.instructions);
        self.branches.increment(&other.branches);
    }

    /// A line counts as covered once any instruction on it executed.
    pub fn is_covered(&self) -> bool {
        self.instructions.covered > 0
    }
}

/// Execution data for one compiled class, keyed by qualified name and a
/// content identity of the compiled form.
///
/// Supplied by the bytecode-analysis collaborator; read-only here apart
/// from same-identity merging.
///
/// # Examples
///
/// ```
/// use deltacov_reconcile::CoverageRecord;
///
/// let record = CoverageRecord::new("com/example/Foo", 0xfeed);
/// assert_eq!(record.qualified_name, "com/example/Foo");
/// assert_eq!(record.package_name(), "com/example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRecord {
    /// VM-internal qualified class name (`com/example/Foo`).
    pub qualified_name: String,
    /// Content identity of the compiled class (e.g. a digest of the class
    /// bytes). Records with the same name but different ids cannot be
    /// reconciled.
    pub id: u64,
    /// Simple source file name (`Foo.java`), when the compiler recorded it.
    pub source_file_name: Option<String>,
    /// First source line with executable code; 0 when unknown.
    pub first_line: u32,
    /// Last source line with executable code; 0 when unknown.
    pub last_line: u32,
    /// Number of methods in the compiled class.
    pub method_count: u32,
    /// Per-line execution counters.
    pub lines: BTreeMap<u32, LineHits>,
}

impl CoverageRecord {
    /// Create an empty record for a class.
    pub fn new(qualified_name: &str, id: u64) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            id,
            source_file_name: None,
            first_line: 0,
            last_line: 0,
            method_count: 0,
            lines: BTreeMap::new(),
        }
    }

    /// Package part of the qualified name, slash-separated; empty for the
    /// default package.
    pub fn package_name(&self) -> &str {
        match self.qualified_name.rfind('/') {
            Some(idx) => &self.qualified_name[..idx],
            None => "",
        }
    }

    /// Simple class name without the package.
    pub fn simple_name(&self) -> &str {
        match self.qualified_name.rfind('/') {
            Some(idx) => &self.qualified_name[idx + 1..],
            None => &self.qualified_name,
        }
    }

    /// Merge another run's execution data for the same compiled class.
    ///
    /// Callers must have checked that `other` carries the same identity;
    /// this is plain multi-run aggregation, not conflict resolution.
    pub fn merge(&mut self, other: &CoverageRecord) {
        for (line, hits) in &other.lines {
            self.lines.entry(*line).or_default().merge(hits);
        }
        if self.first_line == 0 || (other.first_line != 0 && other.first_line < self.first_line) {
            self.first_line = other.first_line;
        }
        if other.last_line > self.last_line {
            self.last_line = other.last_line;
        }
    }

    /// Sanity-check this record against the structure the diff implies.
    ///
    /// A record that carries line information but spans none of the class's
    /// surviving changed methods was compiled from different source than
    /// the diff saw (stale instrumentation) and cannot be narrowed safely.
    pub fn is_compatible(&self, class: &ClassInfo) -> bool {
        if self.method_count == 0 && !class.methods.is_empty() {
            return class
                .methods
                .iter()
                .all(|m| m.change_kind == ChangeKind::Deleted);
        }
        if self.first_line == 0 || self.last_line == 0 {
            return true;
        }
        let mut surviving = class
            .methods
            .iter()
            .filter(|m| m.change_kind != ChangeKind::Deleted)
            .peekable();
        if surviving.peek().is_none() {
            return true;
        }
        surviving.any(|m| m.start_line <= self.last_line && m.end_line >= self.first_line)
    }

    /// Clone of this record with counters narrowed to the line ranges of
    /// the class's added and modified methods.
    pub fn retain_changed_lines(&self, class: &ClassInfo) -> CoverageRecord {
        let mut filtered = self.clone();
        filtered.lines = self
            .lines
            .iter()
            .filter(|(line, _)| {
                class
                    .methods
                    .iter()
                    .any(|m| m.change_kind != ChangeKind::Deleted && m.contains_line(**line))
            })
            .map(|(line, hits)| (*line, *hits))
            .collect();
        filtered
    }

    /// Line coverage rollup: one unit per line carrying executable code.
    pub fn line_counter(&self) -> Counter {
        let mut counter = Counter::default();
        for hits in self.lines.values() {
            if hits.is_covered() {
                counter.covered += 1;
            } else {
                counter.missed += 1;
            }
        }
        counter
    }

    /// Branch coverage rollup across all lines.
    pub fn branch_counter(&self) -> Counter {
        let mut counter = Counter::default();
        for hits in self.lines.values() {
            counter.increment(&hits.branches);
        }
        counter
    }
}
