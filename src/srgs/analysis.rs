//! Rule graph analysis
//!
//! Two jobs:
//! - [`find_cycle`] rejects graphs where a rule reaches itself through
//!   references. Neither compiled form can express unbounded recursion, so
//!   the parser refuses such grammars before anything is compiled.
//! - [`GrammarAnalyzer`] reports suspicious but legal constructs
//!   (unreachable rules, empty `one-of`, repeats that match nothing).

use super::grammar::{
    Alternative, Item, ItemVisitor, RefCollector, Repeat, RuleGraph, RuleId, RuleRef, SpecialRule,
};
use hashbrown::HashSet;

/// Traversal state of a rule during cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Find a reference cycle
///
/// Returns the rules along the first cycle found, with the starting rule
/// repeated at the end (`[a, b, a]`), or `None` for an acyclic graph.
pub fn find_cycle(graph: &RuleGraph) -> Option<Vec<RuleId>> {
    let edges: Vec<Vec<RuleId>> = (0..graph.rule_count())
        .map(|i| {
            let mut refs = RefCollector::default();
            graph.visit_rule(RuleId(i), &mut refs);
            refs.refs
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; edges.len()];
    let mut path = Vec::new();
    for start in 0..edges.len() {
        if marks[start] == Mark::Unvisited {
            if let Some(cycle) = visit(RuleId(start), &edges, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    id: RuleId,
    edges: &[Vec<RuleId>],
    marks: &mut [Mark],
    path: &mut Vec<RuleId>,
) -> Option<Vec<RuleId>> {
    marks[id.index()] = Mark::InProgress;
    path.push(id);

    for &next in &edges[id.index()] {
        match marks.get(next.index()) {
            Some(Mark::InProgress) => {
                let start = path.iter().position(|&r| r == next).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Some(Mark::Unvisited) => {
                if let Some(cycle) = visit(next, edges, marks, path) {
                    return Some(cycle);
                }
            }
            Some(Mark::Done) | None => {}
        }
    }

    path.pop();
    marks[id.index()] = Mark::Done;
    None
}

/// Kind of grammar warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A rule is defined but never reachable from the root
    UnreachableRule,

    /// A `one-of` or rule with no alternatives never matches
    EmptyAlternatives,

    /// Repeat with max=0 (always matches nothing)
    UselessRepetition,

    /// Reference to VOID makes its sequence unmatchable
    VoidReference,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreachableRule => write!(f, "unreachable rule"),
            Self::EmptyAlternatives => write!(f, "empty alternatives"),
            Self::UselessRepetition => write!(f, "useless repetition"),
            Self::VoidReference => write!(f, "void reference"),
        }
    }
}

/// A grammar warning
#[derive(Debug, Clone)]
pub struct GrammarWarning {
    /// The kind of warning
    pub kind: WarningKind,
    /// Rule in which the warning was detected
    pub rule: String,
    /// Human-readable message
    pub message: String,
}

impl GrammarWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[rule {}] {}: {}", self.rule, self.kind, self.message)
    }
}

/// Grammar analyzer
pub struct GrammarAnalyzer<'a> {
    graph: &'a RuleGraph,
}

impl<'a> GrammarAnalyzer<'a> {
    /// Create a new analyzer for the given graph
    pub fn new(graph: &'a RuleGraph) -> Self {
        Self { graph }
    }

    /// Analyze the graph and return all warnings
    pub fn analyze(&self) -> Vec<GrammarWarning> {
        let mut warnings = Vec::new();
        self.detect_unreachable_rules(&mut warnings);
        for (i, rule) in self.graph.rules.iter().enumerate() {
            if rule.alternatives.is_empty() {
                warnings.push(GrammarWarning::new(
                    WarningKind::EmptyAlternatives,
                    &rule.name,
                    "Rule has no alternatives and never matches",
                ));
            }
            let mut scan = ItemScan::default();
            self.graph.visit_rule(RuleId(i), &mut scan);
            for (kind, message) in scan.findings {
                warnings.push(GrammarWarning::new(kind, &rule.name, message));
            }
        }
        warnings
    }

    /// Detect rules not reachable from the root
    fn detect_unreachable_rules(&self, warnings: &mut Vec<GrammarWarning>) {
        let mut reachable = HashSet::new();
        self.collect_reachable(self.graph.root, &mut reachable);

        for (i, rule) in self.graph.rules.iter().enumerate() {
            if !reachable.contains(&RuleId(i)) {
                warnings.push(GrammarWarning::new(
                    WarningKind::UnreachableRule,
                    &rule.name,
                    format!("Rule {} is defined but never reachable from root", rule.name),
                ));
            }
        }
    }

    /// Collect all rules reachable from the given rule
    fn collect_reachable(&self, id: RuleId, reachable: &mut HashSet<RuleId>) {
        if !reachable.insert(id) {
            return;
        }
        let mut refs = RefCollector::default();
        self.graph.visit_rule(id, &mut refs);
        for next in refs.refs {
            self.collect_reachable(next, reachable);
        }
    }
}

/// Per-item checks
#[derive(Default)]
struct ItemScan {
    findings: Vec<(WarningKind, String)>,
}

impl ItemVisitor for ItemScan {
    fn visit_item(&mut self, item: &Item) {
        if let Repeat { max: Some(0), .. } = item.repeat {
            self.findings.push((
                WarningKind::UselessRepetition,
                "Repeat with max=0 always matches nothing".to_string(),
            ));
        }
    }

    fn visit_ruleref(&mut self, target: RuleRef) {
        if target == RuleRef::Special(SpecialRule::Void) {
            self.findings.push((
                WarningKind::VoidReference,
                "Reference to VOID never matches".to_string(),
            ));
        }
    }

    fn visit_one_of_pre(&mut self, alternatives: &[Alternative]) {
        if alternatives.is_empty() {
            self.findings.push((
                WarningKind::EmptyAlternatives,
                "Empty one-of never matches".to_string(),
            ));
        }
    }
}
