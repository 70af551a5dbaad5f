use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use deltacov_core::{ClassInfo, DeltacovConfig, DiffResult, ReportMode};

use crate::record::{Counter, CoverageRecord, LineHits};

/// Outcome of matching one coverage record against the structural diff.
///
/// # Examples
///
/// ```
/// use deltacov_reconcile::ReconcileStatus;
///
/// let status = ReconcileStatus::MatchedPartial;
/// assert_ne!(status, ReconcileStatus::NoMatch);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcileStatus {
    /// Class is outside the diff; counters pass through unfiltered.
    MatchedFull,
    /// Class is in the diff; counters were narrowed to changed-method lines.
    MatchedPartial,
    /// Record could not be trusted against the diff (conflicting compiled
    /// forms, duplicate source claims, or stale line information).
    NoMatch,
}

/// One coverage record after reconciliation against the diff.
///
/// For [`ReconcileStatus::MatchedPartial`] the embedded record's line
/// counters are already narrowed; for [`ReconcileStatus::NoMatch`] the
/// original record is kept unmodified so callers can inspect what failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledClass {
    /// The (possibly narrowed) execution data.
    pub record: CoverageRecord,
    /// The diff record this was matched against, when one exists.
    pub class: Option<ClassInfo>,
    /// How the match went.
    pub status: ReconcileStatus,
}

impl ReconciledClass {
    /// Returns `true` unless reconciliation rejected the record.
    pub fn is_matched(&self) -> bool {
        self.status != ReconcileStatus::NoMatch
    }
}

/// Per-source-file rollup of matched coverage.
///
/// Classes compiled from the same source file accumulate into one entry,
/// keyed by package and file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileCoverage {
    /// Slash-separated package of the source file; empty for the default
    /// package.
    pub package_name: String,
    /// Simple file name (`Foo.java`).
    pub file_name: String,
    /// Merged per-line counters across all classes of the file.
    pub lines: BTreeMap<u32, LineHits>,
}

impl SourceFileCoverage {
    /// Fold one class's execution data into this file's counters.
    pub fn increment(&mut self, record: &CoverageRecord) {
        for (line, hits) in &record.lines {
            self.lines.entry(*line).or_default().merge(hits);
        }
    }

    /// Line coverage rollup for the file.
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
}

/// Top-level report node: every matched class and source file under one
/// name, with line and branch totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleCoverage {
    /// Report title, from configuration.
    pub name: String,
    /// Matched classes in visit order.
    pub classes: Vec<ReconciledClass>,
    /// Per-source-file rollups, sorted by package then file name.
    pub source_files: Vec<SourceFileCoverage>,
    /// Line totals across all matched classes.
    pub line_counter: Counter,
    /// Branch totals across all matched classes.
    pub branch_counter: Counter,
}

/// Reconciles compiled-class coverage records against a structural diff.
///
/// Feed every record from the execution data through [`visit_coverage`],
/// then read the matched classes, the rejects, or a full [`BundleCoverage`].
/// The diff is taken by value at construction and never mutated, so two
/// builders over the same diff cannot observe each other.
///
/// [`visit_coverage`]: CoverageBuilder::visit_coverage
///
/// # Examples
///
/// ```
/// use deltacov_core::{DiffResult, ReportMode};
/// use deltacov_reconcile::{CoverageBuilder, CoverageRecord};
///
/// let mut builder = CoverageBuilder::new(DiffResult::default(), ReportMode::Full);
/// builder.visit_coverage(CoverageRecord::new("com/example/Untouched", 7));
/// assert_eq!(builder.classes().len(), 1);
/// assert!(builder.no_match_classes().is_empty());
/// ```
#[derive(Debug)]
pub struct CoverageBuilder {
    diff: DiffResult,
    mode: ReportMode,
    records: Vec<CoverageRecord>,
    index: HashMap<String, usize>,
    conflicted: HashSet<String>,
}

impl CoverageBuilder {
    /// Create a builder over one diff run's result.
    pub fn new(diff: DiffResult, mode: ReportMode) -> Self {
        Self {
            diff,
            mode,
            records: Vec::new(),
            index: HashMap::new(),
            conflicted: HashSet::new(),
        }
    }

    /// Create a builder with the report mode taken from configuration.
    pub fn from_config(diff: DiffResult, config: &DeltacovConfig) -> Self {
        Self::new(diff, config.report.mode)
    }

    /// Register one compiled class's execution data.
    ///
    /// A record for an already-seen name with the same id merges into the
    /// earlier one (multiple runs of the same build). The same name with a
    /// different id means two different compiled forms of one class were
    /// executed; neither can be reconciled and both end up as no-match.
    pub fn visit_coverage(&mut self, record: CoverageRecord) {
        match self.index.get(&record.qualified_name) {
            Some(&idx) => {
                if self.records[idx].id == record.id {
                    self.records[idx].merge(&record);
                } else {
                    self.conflicted.insert(record.qualified_name.clone());
                    self.records.push(record);
                }
            }
            None => {
                self.index
                    .insert(record.qualified_name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// All successfully matched classes, in first-visit order.
    ///
    /// Incremental mode drops classes outside the diff; full mode passes
    /// them through with [`ReconcileStatus::MatchedFull`].
    pub fn classes(&self) -> Vec<ReconciledClass> {
        self.records
            .iter()
            .filter_map(|r| self.reconcile(r))
            .filter(|r| r.is_matched())
            .collect()
    }

    /// Records reconciliation rejected, in first-visit order.
    ///
    /// These point at stale execution data: rebuild, re-run, and diff again.
    pub fn no_match_classes(&self) -> Vec<ReconciledClass> {
        self.records
            .iter()
            .filter_map(|r| self.reconcile(r))
            .filter(|r| !r.is_matched())
            .collect()
    }

    /// Per-source-file rollup over all matched classes.
    pub fn source_files(&self) -> Vec<SourceFileCoverage> {
        let mut by_file: BTreeMap<(String, String), SourceFileCoverage> = BTreeMap::new();
        for reconciled in self.classes() {
            let record = &reconciled.record;
            // Without debug info the file name is unknowable; group under
            // the primary class name rather than guessing an extension.
            let file_name = match &record.source_file_name {
                Some(name) => name.clone(),
                None => primary_name(record.simple_name()).to_string(),
            };
            let key = (record.package_name().to_string(), file_name.clone());
            let entry = by_file.entry(key).or_insert_with(|| SourceFileCoverage {
                package_name: record.package_name().to_string(),
                file_name,
                lines: BTreeMap::new(),
            });
            entry.increment(record);
        }
        by_file.into_values().collect()
    }

    /// Assemble the final report node.
    pub fn bundle(&self, name: &str) -> BundleCoverage {
        let classes = self.classes();
        let mut line_counter = Counter::default();
        let mut branch_counter = Counter::default();
        for reconciled in &classes {
            line_counter.increment(&reconciled.record.line_counter());
            branch_counter.increment(&reconciled.record.branch_counter());
        }
        BundleCoverage {
            name: name.to_string(),
            source_files: self.source_files(),
            classes,
            line_counter,
            branch_counter,
        }
    }

    /// Match one record against the diff.
    ///
    /// `None` means the record is silently excluded (untouched class in
    /// incremental mode); everything else carries a status.
    fn reconcile(&self, record: &CoverageRecord) -> Option<ReconciledClass> {
        if self.conflicted.contains(&record.qualified_name)
            || self.diff.is_duplicate(&record.qualified_name)
        {
            return Some(ReconciledClass {
                record: record.clone(),
                class: self.diff.find(&record.qualified_name).cloned(),
                status: ReconcileStatus::NoMatch,
            });
        }

        // Nested classes reconcile against the primary class's diff record.
        let class = self
            .diff
            .find(&record.qualified_name)
            .or_else(|| self.diff.find(&primary_qualified_name(record)));

        match class {
            None => match self.mode {
                ReportMode::Incremental => None,
                ReportMode::Full => Some(ReconciledClass {
                    record: record.clone(),
                    class: None,
                    status: ReconcileStatus::MatchedFull,
                }),
            },
            Some(class) => {
                if record.is_compatible(class) {
                    Some(ReconciledClass {
                        record: record.retain_changed_lines(class),
                        class: Some(class.clone()),
                        status: ReconcileStatus::MatchedPartial,
                    })
                } else {
                    Some(ReconciledClass {
                        record: record.clone(),
                        class: Some(class.clone()),
                        status: ReconcileStatus::NoMatch,
                    })
                }
            }
        }
    }
}

/// Strip a nested-class suffix (`Foo$Bar` -> `Foo`).
fn primary_name(simple: &str) -> &str {
    match simple.find('$') {
        Some(idx) => &simple[..idx],
        None => simple,
    }
}

fn primary_qualified_name(record: &CoverageRecord) -> String {
    let package = record.package_name();
    let primary = primary_name(record.simple_name());
    if package.is_empty() {
        primary.to_string()
    } else {
        format!("{package}/{primary}")
    }
}
