//! Rule graph types
//!
//! This module defines the in-memory representation of a parsed SRGS
//! grammar. Rules live in an arena and refer to each other by [`RuleId`],
//! so a rule referenced from many places is stored once and reference
//! cycles can be detected without chasing owned pointers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a rule in [`RuleGraph::rules`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub usize);

impl RuleId {
    /// Position in the rule arena
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of input a grammar describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputMode {
    /// Spoken words separated by the word separator
    #[default]
    Voice,
    /// Telephone keypad presses, one key per token
    Dtmf,
}

impl InputMode {
    /// Attribute value as written in documents
    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Voice => "voice",
            InputMode::Dtmf => "dtmf",
        }
    }
}

/// Rule visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Referenceable from other grammars
    Public,
    /// Local to this grammar
    #[default]
    Private,
}

/// Reserved rule references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialRule {
    /// Matches without consuming input
    Null,
    /// Never matches
    Void,
    /// Matches any token sequence, including none
    Garbage,
}

impl SpecialRule {
    /// Name used in `special="..."`
    pub fn as_str(self) -> &'static str {
        match self {
            SpecialRule::Null => "NULL",
            SpecialRule::Void => "VOID",
            SpecialRule::Garbage => "GARBAGE",
        }
    }

    /// Parse a `special` attribute value
    pub fn from_name(name: &str) -> Option<SpecialRule> {
        match name {
            "NULL" => Some(SpecialRule::Null),
            "VOID" => Some(SpecialRule::Void),
            "GARBAGE" => Some(SpecialRule::Garbage),
            _ => None,
        }
    }
}

/// Target of a rule reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleRef {
    /// A rule of the same grammar
    Local(RuleId),
    /// A reserved rule
    Special(SpecialRule),
}

/// Repetition bounds of an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    /// Minimum number of repetitions
    pub min: u32,
    /// Maximum number of repetitions (None = unlimited)
    pub max: Option<u32>,
    /// Repeat probability, informational only
    pub prob: Option<f64>,
}

impl Repeat {
    /// Exactly once
    pub const ONCE: Repeat = Repeat {
        min: 1,
        max: Some(1),
        prob: None,
    };

    /// Repeat between `min` and `max` times
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self {
            min,
            max,
            prob: None,
        }
    }

    /// Whether this is the default 1..1
    #[inline]
    pub fn is_once(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    /// Whether bounds satisfy `min <= max`
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Self::ONCE
    }
}

/// What an item matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    /// One or more words, matched in order
    Literal(Vec<String>),
    /// Reference to a rule
    RuleRef(RuleRef),
    /// Interpretation payload; matches no input
    Tag(String),
    /// Nested sequence, the scope of a repeat
    Group(Sequence),
    /// Nested alternatives
    OneOf(Vec<Alternative>),
}

/// A grammar item with its repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// What the item matches
    pub kind: ItemKind,
    /// How often
    pub repeat: Repeat,
}

impl Item {
    /// Item matched exactly once
    pub fn once(kind: ItemKind) -> Self {
        Self {
            kind,
            repeat: Repeat::ONCE,
        }
    }

    /// Builder-style repeat setter
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Ordered items forming one derivation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Items in order
    pub items: Vec<Item>,
}

impl Sequence {
    /// Sequence of the given items
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Whether the sequence has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One alternative of a rule or `one-of`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Relative weight, informational only
    pub weight: Option<f64>,
    /// The derivation
    pub sequence: Sequence,
}

impl Alternative {
    /// Unweighted alternative
    pub fn new(sequence: Sequence) -> Self {
        Self {
            weight: None,
            sequence,
        }
    }
}

/// A named production
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier
    pub name: String,
    /// Visibility
    pub scope: Scope,
    /// Alternative derivations, in document order
    pub alternatives: Vec<Alternative>,
}

/// A complete rule graph
///
/// Contains all rules and the root rule id. Produced by the parser with
/// every reference resolved and no reference cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGraph {
    /// All rules (referenced by id)
    pub rules: Vec<Rule>,
    /// Root rule
    pub root: RuleId,
    /// Input mode
    pub mode: InputMode,
    /// `xml:lang` of the document
    pub language: Option<String>,
    /// `xml:base` of the document
    pub base_uri: Option<String>,
    /// `tag-format` of the document
    pub tag_format: Option<String>,
}

impl RuleGraph {
    /// Create an empty graph
    pub fn new(mode: InputMode) -> Self {
        Self {
            rules: Vec::new(),
            root: RuleId(0),
            mode,
            language: None,
            base_uri: None,
            tag_format: None,
        }
    }

    /// Add a rule and return its id
    #[inline]
    pub fn add_rule(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(self.rules.len());
        self.rules.push(rule);
        id
    }

    /// Get a rule by id
    #[inline]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// Look up a rule by name
    pub fn find(&self, name: &str) -> Option<RuleId> {
        self.rules.iter().position(|r| r.name == name).map(RuleId)
    }

    /// Get the root rule
    #[inline]
    pub fn root_rule(&self) -> Option<&Rule> {
        self.rule(self.root)
    }

    /// Total rule count
    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Summarize the graph
    pub fn stats(&self) -> GrammarStats {
        let mut counter = ItemKindCounter::default();
        for id in 0..self.rules.len() {
            self.visit_rule(RuleId(id), &mut counter);
        }

        let mut item_kinds = HashMap::new();
        for (kind, count) in [
            ("literal", counter.literal_count),
            ("ruleref", counter.ruleref_count),
            ("tag", counter.tag_count),
            ("group", counter.group_count),
            ("one-of", counter.one_of_count),
        ] {
            if count > 0 {
                item_kinds.insert(kind, count);
            }
        }

        GrammarStats {
            total_rules: self.rules.len(),
            item_kinds,
            has_repeats: counter.repeat_count > 0,
            has_tags: counter.tag_count > 0,
        }
    }
}

/// Result of [`RuleGraph::stats`]
#[derive(Debug, Clone)]
pub struct GrammarStats {
    /// Number of rules
    pub total_rules: usize,
    /// Item count by kind
    pub item_kinds: HashMap<&'static str, usize>,
    /// Whether any item repeats other than once
    pub has_repeats: bool,
    /// Whether any tag items exist
    pub has_tags: bool,
}

// ============================================================================
// ItemVisitor Trait
// ============================================================================

/// Visitor over the items of a rule
///
/// References are reported but not followed; walk the target rule
/// separately if needed.
pub trait ItemVisitor {
    /// Visit any item (before its kind-specific callback)
    fn visit_item(&mut self, _item: &Item) {}

    /// Visit a literal
    fn visit_literal(&mut self, _words: &[String]) {}

    /// Visit a rule reference
    fn visit_ruleref(&mut self, _target: RuleRef) {}

    /// Visit a tag
    fn visit_tag(&mut self, _payload: &str) {}

    /// Visit a group before its children
    fn visit_group_pre(&mut self, _sequence: &Sequence) {}

    /// Visit a one-of before its alternatives
    fn visit_one_of_pre(&mut self, _alternatives: &[Alternative]) {}
}

impl RuleGraph {
    /// Visit every item of one rule in document order
    pub fn visit_rule<V: ItemVisitor>(&self, id: RuleId, visitor: &mut V) {
        if let Some(rule) = self.rule(id) {
            visit_alternatives(&rule.alternatives, visitor);
        }
    }
}

fn visit_alternatives<V: ItemVisitor>(alternatives: &[Alternative], visitor: &mut V) {
    for alternative in alternatives {
        visit_sequence(&alternative.sequence, visitor);
    }
}

fn visit_sequence<V: ItemVisitor>(sequence: &Sequence, visitor: &mut V) {
    for item in &sequence.items {
        visitor.visit_item(item);
        match &item.kind {
            ItemKind::Literal(words) => visitor.visit_literal(words),
            ItemKind::RuleRef(target) => visitor.visit_ruleref(*target),
            ItemKind::Tag(payload) => visitor.visit_tag(payload),
            ItemKind::Group(inner) => {
                visitor.visit_group_pre(inner);
                visit_sequence(inner, visitor);
            }
            ItemKind::OneOf(alternatives) => {
                visitor.visit_one_of_pre(alternatives);
                visit_alternatives(alternatives, visitor);
            }
        }
    }
}

/// Counts item kinds
#[derive(Debug, Clone, Default)]
pub struct ItemKindCounter {
    /// Count of literals
    pub literal_count: usize,
    /// Count of rule references
    pub ruleref_count: usize,
    /// Count of tags
    pub tag_count: usize,
    /// Count of groups
    pub group_count: usize,
    /// Count of one-of items
    pub one_of_count: usize,
    /// Count of items with a repeat other than once
    pub repeat_count: usize,
}

impl ItemVisitor for ItemKindCounter {
    fn visit_item(&mut self, item: &Item) {
        if !item.repeat.is_once() {
            self.repeat_count += 1;
        }
    }

    fn visit_literal(&mut self, _words: &[String]) {
        self.literal_count += 1;
    }

    fn visit_ruleref(&mut self, _target: RuleRef) {
        self.ruleref_count += 1;
    }

    fn visit_tag(&mut self, _payload: &str) {
        self.tag_count += 1;
    }

    fn visit_group_pre(&mut self, _sequence: &Sequence) {
        self.group_count += 1;
    }

    fn visit_one_of_pre(&mut self, _alternatives: &[Alternative]) {
        self.one_of_count += 1;
    }
}

/// Collects local rule references
#[derive(Debug, Clone, Default)]
pub struct RefCollector {
    /// Referenced rules in visiting order, duplicates included
    pub refs: Vec<RuleId>,
}

impl ItemVisitor for RefCollector {
    fn visit_ruleref(&mut self, target: RuleRef) {
        if let RuleRef::Local(id) = target {
            self.refs.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> Item {
        Item::once(ItemKind::Literal(vec![w.to_string()]))
    }

    fn yes_no() -> RuleGraph {
        let mut graph = RuleGraph::new(InputMode::Voice);
        graph.add_rule(Rule {
            name: "yesno".to_string(),
            scope: Scope::Public,
            alternatives: vec![
                Alternative::new(Sequence::new(vec![word("yes")])),
                Alternative::new(Sequence::new(vec![word("no")])),
            ],
        });
        graph
    }

    #[test]
    fn test_graph_add_rule() {
        let mut graph = RuleGraph::new(InputMode::Voice);
        let id = graph.add_rule(Rule {
            name: "a".to_string(),
            scope: Scope::Private,
            alternatives: Vec::new(),
        });
        assert_eq!(id, RuleId(0));
        assert_eq!(graph.rule_count(), 1);
        assert_eq!(graph.find("a"), Some(id));
        assert_eq!(graph.find("b"), None);
    }

    #[test]
    fn test_repeat_validity() {
        assert!(Repeat::ONCE.is_once());
        assert!(Repeat::new(0, None).is_valid());
        assert!(Repeat::new(2, Some(3)).is_valid());
        assert!(!Repeat::new(3, Some(2)).is_valid());
    }

    #[test]
    fn test_special_names() {
        for special in [SpecialRule::Null, SpecialRule::Void, SpecialRule::Garbage] {
            assert_eq!(SpecialRule::from_name(special.as_str()), Some(special));
        }
        assert_eq!(SpecialRule::from_name("null"), None);
    }

    #[test]
    fn test_stats() {
        let mut graph = yes_no();
        graph.rules[0].alternatives[0]
            .sequence
            .items
            .push(Item::once(ItemKind::Tag("YES".to_string())).with_repeat(Repeat::new(0, Some(1))));

        let stats = graph.stats();
        assert_eq!(stats.total_rules, 1);
        assert_eq!(stats.item_kinds.get("literal"), Some(&2));
        assert!(stats.has_tags);
        assert!(stats.has_repeats);
    }

    #[test]
    fn test_ref_collector() {
        let mut graph = yes_no();
        graph.add_rule(Rule {
            name: "main".to_string(),
            scope: Scope::Public,
            alternatives: vec![Alternative::new(Sequence::new(vec![
                Item::once(ItemKind::RuleRef(RuleRef::Local(RuleId(0)))),
                Item::once(ItemKind::Group(Sequence::new(vec![Item::once(
                    ItemKind::RuleRef(RuleRef::Special(SpecialRule::Null)),
                )]))),
            ]))],
        });

        let mut refs = RefCollector::default();
        graph.visit_rule(RuleId(1), &mut refs);
        assert_eq!(refs.refs, vec![RuleId(0)]);
    }

    #[test]
    fn test_json_roundtrip() {
        let graph = yes_no();
        let json = graph.to_json().unwrap();
        let parsed = RuleGraph::from_json(&json).unwrap();
        assert_eq!(parsed, graph);
    }
}
