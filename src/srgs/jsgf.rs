//! JSGF rendering of a rule graph
//!
//! Unlike the regex form, references stay references: every rule becomes
//! one named production and the output mirrors the graph item for item.

use super::grammar::{
    Alternative, Item, ItemKind, Repeat, Rule, RuleGraph, RuleRef, Scope, Sequence,
};
use std::fmt::Write;

/// Render the whole grammar
pub fn render(graph: &RuleGraph) -> String {
    let name = graph
        .root_rule()
        .map_or("grammar", |rule| rule.name.as_str());

    let mut out = String::from("#JSGF V1.0;\n");
    let _ = writeln!(out, "grammar {};", name);
    // Root first, the rest in definition order
    if let Some(root) = graph.root_rule() {
        out.push('\n');
        render_rule(graph, root, &mut out);
    }
    for (i, rule) in graph.rules.iter().enumerate() {
        if i != graph.root.index() {
            render_rule(graph, rule, &mut out);
        }
    }
    out
}

fn render_rule(graph: &RuleGraph, rule: &Rule, out: &mut String) {
    if rule.scope == Scope::Public {
        out.push_str("public ");
    }
    let _ = writeln!(
        out,
        "<{}> = {};",
        rule.name,
        alternatives(graph, &rule.alternatives)
    );
}

fn alternatives(graph: &RuleGraph, alternatives: &[Alternative]) -> String {
    if alternatives.is_empty() {
        return "<VOID>".to_string();
    }
    alternatives
        .iter()
        .map(|alt| match alt.weight {
            Some(weight) => format!("/{}/ {}", weight, sequence(graph, &alt.sequence)),
            None => sequence(graph, &alt.sequence),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn sequence(graph: &RuleGraph, sequence: &Sequence) -> String {
    if sequence.is_empty() {
        return "<NULL>".to_string();
    }
    sequence
        .items
        .iter()
        .map(|item| self::item(graph, item))
        .collect::<Vec<_>>()
        .join(" ")
}

fn item(graph: &RuleGraph, item: &Item) -> String {
    // `atomic` is false when the body needs parentheses before a quantifier
    let (body, atomic) = match &item.kind {
        ItemKind::Literal(words) => (
            words.iter().map(|w| token(w)).collect::<Vec<_>>().join(" "),
            words.len() == 1,
        ),
        ItemKind::RuleRef(RuleRef::Local(id)) => {
            let name = graph.rule(*id).map_or("VOID", |r| r.name.as_str());
            (format!("<{}>", name), true)
        }
        ItemKind::RuleRef(RuleRef::Special(special)) => {
            (format!("<{}>", special.as_str()), true)
        }
        ItemKind::Tag(payload) => (format!("{{{}}}", escape_tag(payload)), true),
        ItemKind::Group(inner) => (sequence(graph, inner), false),
        ItemKind::OneOf(alts) => (alternatives(graph, alts), false),
    };

    match item.repeat {
        r if r.is_once() && (atomic || matches!(item.kind, ItemKind::Literal(_))) => body,
        r if r.is_once() => format!("({})", body),
        Repeat {
            min: 0,
            max: Some(1),
            ..
        } => format!("[{}]", body),
        Repeat { min, max, .. } => {
            let quantifier = match (min, max) {
                (0, None) => "*".to_string(),
                (1, None) => "+".to_string(),
                (min, None) => format!("{{{},}}", min),
                (min, Some(max)) if min == max => format!("{{{}}}", min),
                (min, Some(max)) => format!("{{{},{}}}", min, max),
            };
            format!("({}){}", body, quantifier)
        }
    }
}

/// Quote tokens containing JSGF syntax
fn token(word: &str) -> String {
    const SPECIAL: &[char] = &[
        ';', '=', '|', '*', '+', '<', '>', '(', ')', '[', ']', '{', '}', '/', '"', '\\',
    ];
    if word.contains(SPECIAL) {
        let mut quoted = String::with_capacity(word.len() + 2);
        quoted.push('"');
        for c in word.chars() {
            if c == '"' || c == '\\' {
                quoted.push('\\');
            }
            quoted.push(c);
        }
        quoted.push('"');
        quoted
    } else {
        word.to_string()
    }
}

fn escape_tag(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    for c in payload.chars() {
        if matches!(c, '{' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// File name for a rendered grammar
///
/// Characters of the session id outside `[A-Za-z0-9_-]` become `_`.
pub fn file_name(session_id: &str, seq: u64, extension: &str) -> String {
    let session: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}.{}", session, seq, extension.trim_start_matches('.'))
}
