//! Regex compilation of a rule graph
//!
//! Every word of the language is written as `word` followed by the word
//! separator, so items concatenate without separator bookkeeping and input
//! is prepared the same way (`"book flight "`). DTMF grammars use no
//! separator at all.
//!
//! Besides the language pattern, the compiler derives a *proper-prefix*
//! pattern: it matches exactly the inputs that at least one more word can
//! extend toward a complete utterance. The matcher classifies input with
//! the two patterns together:
//!
//! | language | proper prefix | verdict       |
//! |----------|---------------|---------------|
//! | yes      | yes           | MATCH         |
//! | yes      | no            | MATCH_END     |
//! | no       | yes           | MATCH_PARTIAL |
//! | no       | no            | NO_MATCH      |
//!
//! Tags compile to empty capture groups `()`. Every other group is
//! non-capturing, so capture group `i + 1` belongs to tag `i`.

use super::config::GrammarConfig;
use super::error::CompileError;
use super::grammar::{
    Alternative, InputMode, Item, ItemKind, Repeat, RuleGraph, RuleId, RuleRef, Sequence,
    SpecialRule,
};
use crate::logging::log_debug;
use hashbrown::HashMap;
use regex::{Regex, RegexBuilder};

/// Pattern that never matches
const NEVER: &str = r"[^\d\D]";

/// DTMF key class
const DTMF_KEY: &str = r"[0-9#*A-Da-d]";

/// Deepest chain of items and rule references inlined into one pattern
pub const MAX_INLINE_DEPTH: usize = 128;

/// A grammar compiled to regular expressions
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    prefix_pattern: Option<String>,
    tags: Vec<String>,
    language: Regex,
    prefix: Option<Regex>,
}

impl CompiledPattern {
    /// The anchored language pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The anchored proper-prefix pattern, if any input can be extended
    pub fn prefix_pattern(&self) -> Option<&str> {
        self.prefix_pattern.as_deref()
    }

    /// Tag payloads; entry `i` belongs to capture group `i + 1`
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Compiled language regex
    pub fn language(&self) -> &Regex {
        &self.language
    }

    /// Compiled proper-prefix regex
    pub fn prefix(&self) -> Option<&Regex> {
        self.prefix.as_ref()
    }
}

/// Compile a rule graph
pub fn compile(graph: &RuleGraph, config: &GrammarConfig) -> Result<CompiledPattern, CompileError> {
    let mut compiler = PatternCompiler::new(graph, config);
    let root = compiler.rule(graph.root)?;

    let pattern = format!("^{}$", root.pattern);
    let prefix_pattern = root.prefix.map(|p| format!("^{}$", p));
    log_debug!("compiled pattern {} ({} tags)", pattern, root.tags.len());

    let limit = config.regex_size_limit;
    let build = |p: &str| {
        RegexBuilder::new(p)
            .size_limit(limit)
            .build()
            .map_err(|e| CompileError::from_regex(e, limit))
    };
    let language = build(&pattern)?;
    let prefix = prefix_pattern.as_deref().map(build).transpose()?;

    Ok(CompiledPattern {
        pattern,
        prefix_pattern,
        tags: root.tags,
        language,
        prefix,
    })
}

/// Compiled form of one grammar construct
#[derive(Debug, Clone)]
struct Fragment {
    /// Language pattern with tag capture groups
    pattern: String,
    /// Same language without capture groups
    plain: String,
    /// Tag payloads in capture group order
    tags: Vec<String>,
    /// Proper-prefix pattern; `None` when nothing can be extended
    prefix: Option<String>,
    /// Whether the language has at least one string
    nonempty: bool,
}

impl Fragment {
    /// Matches only the empty input
    fn empty() -> Self {
        Self {
            pattern: String::new(),
            plain: String::new(),
            tags: Vec::new(),
            prefix: None,
            nonempty: true,
        }
    }

    /// Matches nothing
    fn never() -> Self {
        Self {
            pattern: NEVER.to_string(),
            plain: NEVER.to_string(),
            tags: Vec::new(),
            prefix: None,
            nonempty: false,
        }
    }

    /// Concatenation `self rest`
    ///
    /// An input extends past `self rest` either inside `self` (when `rest`
    /// can still follow) or after a complete `self` inside `rest`.
    fn then(self, rest: Fragment) -> Fragment {
        let mut prefixes = Vec::new();
        if rest.nonempty {
            if let Some(p) = self.prefix {
                prefixes.push(p);
            }
        }
        if self.nonempty {
            if let Some(p) = &rest.prefix {
                prefixes.push(format!("{}{}", self.plain, p));
            }
        }

        let mut tags = self.tags;
        tags.extend(rest.tags);
        Fragment {
            pattern: self.pattern + &rest.pattern,
            plain: self.plain + &rest.plain,
            tags,
            prefix: alternate(prefixes, true),
            nonempty: self.nonempty && rest.nonempty,
        }
    }

    /// Alternation in priority order
    fn one_of(options: Vec<Fragment>) -> Fragment {
        if options.len() <= 1 {
            return options.into_iter().next().unwrap_or_else(Fragment::never);
        }

        let mut patterns = Vec::with_capacity(options.len());
        let mut plains = Vec::with_capacity(options.len());
        let mut prefixes = Vec::new();
        let mut tags = Vec::new();
        let mut nonempty = false;
        for option in options {
            patterns.push(option.pattern);
            plains.push(option.plain);
            prefixes.extend(option.prefix);
            tags.extend(option.tags);
            nonempty |= option.nonempty;
        }

        Fragment {
            pattern: alternate(patterns, false).unwrap_or_else(|| NEVER.to_string()),
            plain: alternate(plains, true).unwrap_or_else(|| NEVER.to_string()),
            tags,
            prefix: alternate(prefixes, true),
            nonempty,
        }
    }

    /// Apply repetition bounds
    fn repeat(self, repeat: Repeat) -> Fragment {
        if repeat.is_once() {
            return self;
        }
        if repeat.max == Some(0) {
            return Fragment::empty();
        }

        let quantifier = quantifier(repeat.min, repeat.max);
        let wrap = |p: &str| {
            if p.is_empty() {
                String::new()
            } else {
                format!("(?:{}){}", p, quantifier)
            }
        };

        // Any number of complete iterations that leaves room for one more,
        // then a proper prefix of that next iteration.
        let prefix = match (&self.prefix, self.nonempty) {
            (Some(p), true) => {
                let lead = match repeat.max {
                    _ if self.plain.is_empty() => String::new(),
                    Some(1) => String::new(),
                    Some(max) => format!("(?:{}){{0,{}}}", self.plain, max - 1),
                    None => format!("(?:{})*", self.plain),
                };
                Some(lead + p)
            }
            _ => None,
        };

        Fragment {
            pattern: wrap(&self.pattern),
            plain: wrap(&self.plain),
            tags: self.tags,
            prefix,
            nonempty: repeat.min == 0 || self.nonempty,
        }
    }
}

/// Regex quantifier for repetition bounds
fn quantifier(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, Some(1)) => "?".to_string(),
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (min, None) => format!("{{{},}}", min),
        (min, Some(max)) if min == max => format!("{{{}}}", min),
        (min, Some(max)) => format!("{{{},{}}}", min, max),
    }
}

/// Join alternatives
///
/// Returns `None` when there are no alternatives. Capture-bearing patterns
/// (`dedupe == false`) keep every branch in place, empty ones included, so
/// leftmost-first matching follows declaration order. Otherwise duplicates
/// are dropped and empty branches fold into an optional group; an empty
/// branch listed first keeps its priority through a lazy `??`.
fn alternate(options: Vec<String>, dedupe: bool) -> Option<String> {
    if !dedupe {
        return match options.len() {
            0 | 1 => options.into_iter().next(),
            _ => Some(format!("(?:{})", options.join("|"))),
        };
    }
    if options.is_empty() {
        return None;
    }
    let empty_first = options[0].is_empty();
    let has_empty = options.iter().any(String::is_empty);
    let mut rest: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        if !option.is_empty() && !rest.contains(&option) {
            rest.push(option);
        }
    }

    let body = rest.join("|");
    Some(match (rest.len(), has_empty) {
        (0, _) => String::new(),
        (1, false) => body,
        (_, false) => format!("(?:{})", body),
        (_, true) if empty_first => format!("(?:{})??", body),
        (_, true) => format!("(?:{})?", body),
    })
}

/// Recursive descent over the rule graph
struct PatternCompiler<'g> {
    graph: &'g RuleGraph,
    config: &'g GrammarConfig,
    separator: String,
    memo: HashMap<RuleId, Fragment>,
    depth: usize,
}

impl<'g> PatternCompiler<'g> {
    fn new(graph: &'g RuleGraph, config: &'g GrammarConfig) -> Self {
        let separator = match graph.mode {
            InputMode::Voice => regex::escape(&config.word_separator.to_string()),
            InputMode::Dtmf => String::new(),
        };
        Self {
            graph,
            config,
            separator,
            memo: HashMap::new(),
            depth: 0,
        }
    }

    /// Reject a fragment whose text already exceeds the size limit
    ///
    /// Inlined references copy the referenced rule's text, so text size is
    /// exponential in reference depth and must be checked at every step.
    fn bounded(&self, fragment: Fragment) -> Result<Fragment, CompileError> {
        let limit = self.config.regex_size_limit;
        let prefix_len = fragment.prefix.as_ref().map_or(0, String::len);
        if fragment.pattern.len().max(fragment.plain.len()).max(prefix_len) > limit {
            return Err(CompileError::PatternTooLarge { limit });
        }
        Ok(fragment)
    }

    /// Compile a rule once; later references reuse the fragment
    fn rule(&mut self, id: RuleId) -> Result<Fragment, CompileError> {
        if let Some(fragment) = self.memo.get(&id) {
            return Ok(fragment.clone());
        }
        let fragment = match self.graph.rule(id) {
            Some(rule) => self.alternatives(&rule.alternatives)?,
            None => Fragment::never(),
        };
        self.memo.insert(id, fragment.clone());
        Ok(fragment)
    }

    fn alternatives(&mut self, alternatives: &[Alternative]) -> Result<Fragment, CompileError> {
        let options = alternatives
            .iter()
            .map(|alt| self.sequence(&alt.sequence))
            .collect::<Result<Vec<_>, _>>()?;
        self.bounded(Fragment::one_of(options))
    }

    fn sequence(&mut self, sequence: &Sequence) -> Result<Fragment, CompileError> {
        let mut fragment = Fragment::empty();
        for item in sequence.items.iter().rev() {
            let compiled = self.item(item)?;
            fragment = self.bounded(compiled.then(fragment))?;
        }
        Ok(fragment)
    }

    fn item(&mut self, item: &Item) -> Result<Fragment, CompileError> {
        if self.depth >= MAX_INLINE_DEPTH {
            return Err(CompileError::NestingTooDeep {
                limit: MAX_INLINE_DEPTH,
            });
        }
        self.depth += 1;
        let fragment = self.item_kind(item);
        self.depth -= 1;
        self.bounded(fragment?.repeat(item.repeat))
    }

    fn item_kind(&mut self, item: &Item) -> Result<Fragment, CompileError> {
        Ok(match &item.kind {
            ItemKind::Literal(words) => self.literal(words),
            ItemKind::RuleRef(RuleRef::Local(id)) => self.rule(*id)?,
            ItemKind::RuleRef(RuleRef::Special(special)) => self.special(*special),
            ItemKind::Tag(payload) => Fragment {
                pattern: "()".to_string(),
                plain: String::new(),
                tags: vec![payload.clone()],
                prefix: None,
                nonempty: true,
            },
            ItemKind::Group(sequence) => self.sequence(sequence)?,
            ItemKind::OneOf(alternatives) => self.alternatives(alternatives)?,
        })
    }

    fn word(&self, word: &str) -> String {
        let normalized = self.config.normalization.apply(word);
        format!("{}{}", regex::escape(&normalized), self.separator)
    }

    fn literal(&self, words: &[String]) -> Fragment {
        let pattern: String = words.iter().map(|w| self.word(w)).collect();
        if pattern.is_empty() {
            return Fragment::empty();
        }

        // Proper prefixes of w1..wn: nothing, w1, w1 w2, ... w1..w(n-1)
        let mut prefix = String::new();
        for w in words[..words.len() - 1].iter().rev() {
            prefix = format!("(?:{}{})?", self.word(w), prefix);
        }

        Fragment {
            plain: pattern.clone(),
            pattern,
            tags: Vec::new(),
            prefix: Some(prefix),
            nonempty: true,
        }
    }

    fn special(&self, special: SpecialRule) -> Fragment {
        match special {
            SpecialRule::Null => Fragment::empty(),
            SpecialRule::Void => Fragment::never(),
            SpecialRule::Garbage => {
                let any = match self.graph.mode {
                    InputMode::Voice => format!(
                        "(?:[^{}]+{})*",
                        regex::escape(&self.config.word_separator.to_string()),
                        self.separator
                    ),
                    InputMode::Dtmf => format!("{}*", DTMF_KEY),
                };
                Fragment {
                    pattern: any.clone(),
                    plain: any.clone(),
                    tags: Vec::new(),
                    prefix: Some(any),
                    nonempty: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srgs::grammar::{Rule, Scope};

    fn word(w: &str) -> Item {
        Item::once(ItemKind::Literal(vec![w.to_string()]))
    }

    fn graph_of(mode: InputMode, rules: Vec<Vec<Vec<Item>>>) -> RuleGraph {
        let mut graph = RuleGraph::new(mode);
        for (i, alternatives) in rules.into_iter().enumerate() {
            graph.add_rule(Rule {
                name: format!("r{}", i),
                scope: Scope::Public,
                alternatives: alternatives
                    .into_iter()
                    .map(|items| Alternative::new(Sequence::new(items)))
                    .collect(),
            });
        }
        graph
    }

    fn compile_default(graph: &RuleGraph) -> CompiledPattern {
        compile(graph, &GrammarConfig::default()).unwrap()
    }

    #[test]
    fn test_alternatives() {
        let graph = graph_of(InputMode::Voice, vec![vec![vec![word("yes")], vec![word("no")]]]);
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), "^(?:yes |no )$");
        assert!(compiled.language().is_match("yes "));
        assert!(!compiled.language().is_match("maybe "));
        assert_eq!(compiled.prefix_pattern(), Some("^$"));
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(quantifier(0, Some(1)), "?");
        assert_eq!(quantifier(0, None), "*");
        assert_eq!(quantifier(1, None), "+");
        assert_eq!(quantifier(3, None), "{3,}");
        assert_eq!(quantifier(2, Some(2)), "{2}");
        assert_eq!(quantifier(2, Some(3)), "{2,3}");
    }

    #[test]
    fn test_repeat_prefix() {
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![vec![word("word").with_repeat(Repeat::new(2, Some(3)))]]],
        );
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), "^(?:word ){2,3}$");
        let prefix = compiled.prefix().unwrap();
        assert!(prefix.is_match("word "));
        assert!(prefix.is_match("word word "));
        assert!(!prefix.is_match("word word word "));
    }

    #[test]
    fn test_tags_are_capture_groups() {
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![vec![
                word("book"),
                Item::once(ItemKind::Tag("ACTION=BOOK".to_string())),
                word("flight"),
            ]]],
        );
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), "^book ()flight $");
        assert_eq!(compiled.tags(), &["ACTION=BOOK".to_string()]);
        let caps = compiled.language().captures("book flight ").unwrap();
        assert!(caps.get(1).is_some());
    }

    #[test]
    fn test_ruleref_memoized_and_inlined() {
        let graph = graph_of(
            InputMode::Voice,
            vec![
                vec![vec![
                    Item::once(ItemKind::RuleRef(RuleRef::Local(RuleId(1)))),
                    Item::once(ItemKind::RuleRef(RuleRef::Local(RuleId(1)))),
                ]],
                vec![vec![word("a"), Item::once(ItemKind::Tag("t".to_string()))]],
            ],
        );
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), "^a ()a ()$");
        assert_eq!(compiled.tags().len(), 2);
    }

    #[test]
    fn test_literal_escaped_and_normalized() {
        let graph = graph_of(InputMode::Voice, vec![vec![vec![word("C++")]]]);
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), r"^c\+\+ $");
    }

    #[test]
    fn test_multi_word_literal_prefix() {
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![vec![Item::once(ItemKind::Literal(vec![
                "new".to_string(),
                "york".to_string(),
                "city".to_string(),
            ]))]]],
        );
        let compiled = compile_default(&graph);
        let prefix = compiled.prefix().unwrap();
        assert!(prefix.is_match("new "));
        assert!(prefix.is_match("new york "));
        assert!(!prefix.is_match("new york city "));
        assert!(!prefix.is_match("york "));
    }

    #[test]
    fn test_dtmf_has_no_separator() {
        let graph = graph_of(
            InputMode::Dtmf,
            vec![vec![vec![
                word("1").with_repeat(Repeat::new(1, None)),
                word("#"),
            ]]],
        );
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), r"^(?:1)+\#$");
        assert!(compiled.language().is_match("111#"));
    }

    #[test]
    fn test_specials() {
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![
                vec![
                    word("a"),
                    Item::once(ItemKind::RuleRef(RuleRef::Special(SpecialRule::Garbage))),
                ],
                vec![Item::once(ItemKind::RuleRef(RuleRef::Special(SpecialRule::Void)))],
            ]],
        );
        let compiled = compile_default(&graph);
        assert!(compiled.language().is_match("a "));
        assert!(compiled.language().is_match("a b c "));
        assert!(compiled.prefix().unwrap().is_match("a b "));
    }

    #[test]
    fn test_alternate_empty_options() {
        assert_eq!(alternate(Vec::new(), true), None);
        assert_eq!(alternate(vec![String::new()], true), Some(String::new()));
        assert_eq!(
            alternate(vec!["a ".to_string(), String::new()], true),
            Some("(?:a )?".to_string())
        );
        assert_eq!(
            alternate(vec![String::new(), "a ".to_string()], true),
            Some("(?:a )??".to_string())
        );
        assert_eq!(
            alternate(vec!["a ".to_string(), "a ".to_string()], true),
            Some("a ".to_string())
        );
        assert_eq!(
            alternate(vec!["a ()".to_string(), "a ()".to_string()], false),
            Some("(?:a ()|a ())".to_string())
        );
        assert_eq!(
            alternate(vec!["b ".to_string(), String::new(), "a ()".to_string()], false),
            Some("(?:b ||a ())".to_string())
        );
    }

    #[test]
    fn test_empty_alternative_keeps_its_place() {
        // one-of(b, <empty>, a {X}) followed by an optional a {Y}
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![vec![
                Item::once(ItemKind::OneOf(vec![
                    Alternative::new(Sequence::new(vec![word("b")])),
                    Alternative::new(Sequence::new(Vec::new())),
                    Alternative::new(Sequence::new(vec![
                        word("a"),
                        Item::once(ItemKind::Tag("X".to_string())),
                    ])),
                ])),
                Item::once(ItemKind::Group(Sequence::new(vec![
                    word("a"),
                    Item::once(ItemKind::Tag("Y".to_string())),
                ])))
                .with_repeat(Repeat::new(0, Some(1))),
            ]]],
        );
        let compiled = compile_default(&graph);
        assert_eq!(compiled.pattern(), "^(?:b ||a ())(?:a ())?$");
        let caps = compiled.language().captures("a ").unwrap();
        assert!(caps.get(1).is_none());
        assert!(caps.get(2).is_some());
    }

    /// Rule `i` references rule `i + 1` twice
    fn doubling_chain(depth: usize) -> RuleGraph {
        let mut rules: Vec<Vec<Vec<Item>>> = (1..depth)
            .map(|next| {
                let reference = Item::once(ItemKind::RuleRef(RuleRef::Local(RuleId(next))));
                vec![vec![reference.clone(), reference]]
            })
            .collect();
        rules.push(vec![vec![word("w")]]);
        graph_of(InputMode::Voice, rules)
    }

    #[test]
    fn test_exponential_growth_stops_at_size_limit() {
        let limit = 1024 * 1024;
        let config = GrammarConfig::default().with_regex_size_limit(limit);
        assert!(compile(&doubling_chain(8), &config).is_ok());
        assert_eq!(
            compile(&doubling_chain(40), &config).unwrap_err(),
            CompileError::PatternTooLarge { limit }
        );
    }

    #[test]
    fn test_inline_depth_limited() {
        let depth = MAX_INLINE_DEPTH + 10;
        let mut rules: Vec<Vec<Vec<Item>>> = (1..depth)
            .map(|next| {
                vec![vec![Item::once(ItemKind::RuleRef(RuleRef::Local(RuleId(next))))
                    .with_repeat(Repeat::new(0, Some(1)))]]
            })
            .collect();
        rules.push(vec![vec![word("w")]]);
        let graph = graph_of(InputMode::Voice, rules);
        assert_eq!(
            compile(&graph, &GrammarConfig::default()).unwrap_err(),
            CompileError::NestingTooDeep {
                limit: MAX_INLINE_DEPTH
            }
        );
    }

    #[test]
    fn test_size_limit() {
        let graph = graph_of(
            InputMode::Voice,
            vec![vec![vec![word("w").with_repeat(Repeat::new(0, Some(1000)))]]],
        );
        let config = GrammarConfig::default().with_regex_size_limit(64);
        assert!(matches!(
            compile(&graph, &config),
            Err(CompileError::PatternTooLarge { limit: 64 })
        ));
    }
}
