//! SRGS document to rule graph
//!
//! A single pass over tokenizer events with an explicit stack of open
//! frames. Every opening tag is checked against [`SRGS_SCHEMA`] before a
//! frame is pushed; closing a frame hands its finished item to the parent.
//! References are interned by name on first mention and resolved once the
//! whole document has been read.

use super::analysis::find_cycle;
use super::config::GrammarConfig;
use super::error::ParseError;
use super::grammar::{
    Alternative, InputMode, Item, ItemKind, Repeat, Rule, RuleGraph, RuleId, RuleRef, Scope,
    Sequence, SpecialRule,
};
use super::normalize::split_words;
use super::schema::{SrgsTag, SRGS_SCHEMA};
use crate::xml::schema::{TagDef, TextPolicy};
use crate::xml::{Attribute, Tokenizer, XmlEvent};
use hashbrown::HashMap;

/// Parse an SRGS document into a validated, acyclic rule graph
pub fn build(document: &str, config: &GrammarConfig) -> Result<RuleGraph, ParseError> {
    if document.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let mut builder = Builder::new(config.word_separator, config.max_nesting_depth);
    for event in Tokenizer::new(document) {
        match event? {
            XmlEvent::Open {
                name,
                attributes,
                self_closing,
            } => {
                builder.open(name, &attributes)?;
                if self_closing {
                    builder.close()?;
                }
            }
            XmlEvent::Close { .. } => builder.close()?,
            XmlEvent::Text(text) => builder.text(&text)?,
        }
    }
    builder.finish()
}

/// Open element under construction
enum Frame {
    Grammar,
    Rule {
        id: RuleId,
        scope: Scope,
        items: Vec<Item>,
    },
    Item {
        repeat: Repeat,
        weight: Option<f64>,
        items: Vec<Item>,
    },
    OneOf {
        alternatives: Vec<Alternative>,
    },
    Token {
        text: String,
    },
    Tag {
        text: String,
    },
    RuleRef,
    Ignored,
}

struct Open<'a> {
    name: &'a str,
    def: Option<&'static TagDef<SrgsTag>>,
    frame: Frame,
}

struct Builder<'a> {
    separator: char,
    max_depth: usize,
    stack: Vec<Open<'a>>,
    graph: RuleGraph,
    root_name: Option<String>,
    /// Rule name to id, in order of first mention
    ids: HashMap<String, RuleId>,
    names: Vec<String>,
    slots: Vec<Option<Rule>>,
    /// Rules in definition order
    defined: Vec<RuleId>,
}

impl<'a> Builder<'a> {
    fn new(separator: char, max_depth: usize) -> Self {
        Self {
            separator,
            max_depth,
            stack: Vec::new(),
            graph: RuleGraph::new(InputMode::Voice),
            root_name: None,
            ids: HashMap::new(),
            names: Vec::new(),
            slots: Vec::new(),
            defined: Vec::new(),
        }
    }

    fn intern(&mut self, name: &str) -> RuleId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = RuleId(self.names.len());
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        self.slots.push(None);
        id
    }

    fn open(&mut self, name: &'a str, attributes: &[Attribute<'_>]) -> Result<(), ParseError> {
        if self.stack.len() >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        let parent = self.stack.last();
        if matches!(parent, Some(Open { frame: Frame::Ignored, .. })) {
            self.stack.push(Open {
                name,
                def: None,
                frame: Frame::Ignored,
            });
            return Ok(());
        }

        let schema = &*SRGS_SCHEMA;
        let parent = parent.and_then(|p| p.def.map(|def| (p.name, def)));
        let def = schema.check_open(name, parent)?;
        schema.check_attributes(name, def, attributes.iter().map(|a| a.name))?;

        let frame = match def.kind {
            SrgsTag::Grammar => {
                self.grammar_attributes(attributes)?;
                Frame::Grammar
            }
            SrgsTag::Rule => self.open_rule(attributes)?,
            SrgsTag::Item => open_item(attributes)?,
            SrgsTag::OneOf => Frame::OneOf {
                alternatives: Vec::new(),
            },
            SrgsTag::RuleRef => {
                let target = self.rule_ref(attributes)?;
                self.push_item(Item::once(ItemKind::RuleRef(target)));
                Frame::RuleRef
            }
            SrgsTag::Token => Frame::Token {
                text: String::new(),
            },
            SrgsTag::Tag => Frame::Tag {
                text: String::new(),
            },
            SrgsTag::Ignored => Frame::Ignored,
        };
        self.stack.push(Open {
            name,
            def: Some(def),
            frame,
        });
        Ok(())
    }

    fn grammar_attributes(&mut self, attributes: &[Attribute<'_>]) -> Result<(), ParseError> {
        for attr in attributes {
            match attr.name {
                "mode" => {
                    self.graph.mode = match attr.value.as_ref() {
                        "voice" => InputMode::Voice,
                        "dtmf" => InputMode::Dtmf,
                        other => return Err(invalid("grammar", "mode", other)),
                    }
                }
                "root" => self.root_name = Some(attr.value.trim().to_string()),
                "xml:lang" => self.graph.language = Some(attr.value.to_string()),
                "xml:base" => self.graph.base_uri = Some(attr.value.to_string()),
                "tag-format" => self.graph.tag_format = Some(attr.value.to_string()),
                _ => {}
            }
        }
        Ok(())
    }

    fn open_rule(&mut self, attributes: &[Attribute<'_>]) -> Result<Frame, ParseError> {
        let name = attribute(attributes, "id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ParseError::MissingAttribute {
                tag: "rule".to_string(),
                attribute: "id".to_string(),
            })?;
        let scope = match attribute(attributes, "scope") {
            None | Some("private") => Scope::Private,
            Some("public") => Scope::Public,
            Some(other) => return Err(invalid("rule", "scope", other)),
        };

        let id = self.intern(name);
        if self.defined.contains(&id) {
            return Err(ParseError::DuplicateRule {
                id: name.to_string(),
            });
        }
        self.defined.push(id);
        Ok(Frame::Rule {
            id,
            scope,
            items: Vec::new(),
        })
    }

    fn rule_ref(&mut self, attributes: &[Attribute<'_>]) -> Result<RuleRef, ParseError> {
        if let Some(special) = attribute(attributes, "special") {
            return SpecialRule::from_name(special.trim())
                .map(RuleRef::Special)
                .ok_or_else(|| invalid("ruleref", "special", special));
        }
        let uri = attribute(attributes, "uri").ok_or_else(|| ParseError::MissingAttribute {
            tag: "ruleref".to_string(),
            attribute: "uri".to_string(),
        })?;
        match uri.trim().strip_prefix('#') {
            Some(name) if !name.is_empty() => Ok(RuleRef::Local(self.intern(name))),
            _ => Err(ParseError::UnsupportedReference {
                uri: uri.to_string(),
            }),
        }
    }

    fn text(&mut self, text: &str) -> Result<(), ParseError> {
        let mode = self.graph.mode;
        let separator = self.separator;
        let Some(top) = self.stack.last_mut() else {
            return Ok(());
        };
        let policy = top.def.map_or(TextPolicy::Ignore, |def| def.text);

        match (&mut top.frame, policy) {
            (_, TextPolicy::Ignore) => Ok(()),
            (_, TextPolicy::Reject) if text.trim().is_empty() => Ok(()),
            (_, TextPolicy::Reject) => Err(ParseError::UnexpectedText {
                tag: top.name.to_string(),
            }),
            (Frame::Token { text: buf }, _) | (Frame::Tag { text: buf }, _) => {
                buf.push_str(text);
                Ok(())
            }
            (Frame::Rule { items, .. }, _) | (Frame::Item { items, .. }, _) => {
                let words: Vec<String> = split_words(text, mode, separator)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                if !words.is_empty() {
                    items.push(Item::once(ItemKind::Literal(words)));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> Result<(), ParseError> {
        let Some(open) = self.stack.pop() else {
            return Ok(());
        };
        match open.frame {
            Frame::Grammar | Frame::RuleRef | Frame::Ignored => {}
            Frame::Rule { id, scope, items } => {
                let alternatives = match <[Item; 1]>::try_from(items) {
                    Ok([Item {
                        kind: ItemKind::OneOf(alternatives),
                        repeat,
                    }]) if repeat.is_once() => alternatives,
                    Ok([item]) => vec![Alternative::new(Sequence::new(vec![item]))],
                    Err(items) => vec![Alternative::new(Sequence::new(items))],
                };
                self.slots[id.index()] = Some(Rule {
                    name: self.names[id.index()].clone(),
                    scope,
                    alternatives,
                });
            }
            Frame::Item {
                repeat,
                weight,
                items,
            } => {
                if let Some(Open {
                    frame: Frame::OneOf { alternatives },
                    ..
                }) = self.stack.last_mut()
                {
                    let sequence = if repeat.is_once() {
                        Sequence::new(items)
                    } else {
                        Sequence::new(vec![repeated(items, repeat)])
                    };
                    alternatives.push(Alternative { weight, sequence });
                } else if repeat.is_once() {
                    for item in items {
                        self.push_item(item);
                    }
                } else {
                    self.push_item(repeated(items, repeat));
                }
            }
            Frame::OneOf { alternatives } => self.push_item(Item::once(ItemKind::OneOf(alternatives))),
            Frame::Token { text } => {
                let words: Vec<String> = split_words(&text, self.graph.mode, self.separator)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                if !words.is_empty() {
                    self.push_item(Item::once(ItemKind::Literal(words)));
                }
            }
            Frame::Tag { text } => self.push_item(Item::once(ItemKind::Tag(text.trim().to_string()))),
        }
        Ok(())
    }

    /// Append to the innermost rule or item; grammar-level tags are dropped
    fn push_item(&mut self, item: Item) {
        match self.stack.last_mut().map(|open| &mut open.frame) {
            Some(Frame::Rule { items, .. }) | Some(Frame::Item { items, .. }) => items.push(item),
            _ => {}
        }
    }

    fn finish(self) -> Result<RuleGraph, ParseError> {
        let Builder {
            mut graph,
            root_name,
            ids,
            names,
            slots,
            defined,
            ..
        } = self;

        if defined.is_empty() {
            return Err(ParseError::MissingRoot);
        }

        graph.rules = Vec::with_capacity(slots.len());
        for (name, slot) in names.iter().zip(slots) {
            match slot {
                Some(rule) => graph.rules.push(rule),
                None => {
                    return Err(ParseError::UnresolvedReference {
                        reference: name.clone(),
                    })
                }
            }
        }

        graph.root = match root_name {
            Some(name) => *ids
                .get(name.as_str())
                .ok_or(ParseError::UnresolvedReference { reference: name })?,
            None => defined
                .iter()
                .copied()
                .find(|id| graph.rules[id.index()].scope == Scope::Public)
                .unwrap_or(defined[0]),
        };

        if let Some(cycle) = find_cycle(&graph) {
            return Err(ParseError::CyclicReference {
                chain: cycle.into_iter().map(|id| names[id.index()].clone()).collect(),
            });
        }
        Ok(graph)
    }
}

fn open_item(attributes: &[Attribute<'_>]) -> Result<Frame, ParseError> {
    let mut repeat = Repeat::ONCE;
    let mut weight = None;
    for attr in attributes {
        match attr.name {
            "repeat" => repeat = Repeat { prob: repeat.prob, ..parse_repeat(&attr.value)? },
            "repeat-prob" => {
                let prob = parse_float(&attr.value)
                    .filter(|p| (0.0..=1.0).contains(p))
                    .ok_or_else(|| invalid("item", "repeat-prob", &attr.value))?;
                repeat.prob = Some(prob);
            }
            "weight" => {
                let w = parse_float(&attr.value)
                    .filter(|w| *w >= 0.0)
                    .ok_or_else(|| invalid("item", "weight", &attr.value))?;
                weight = Some(w);
            }
            _ => {}
        }
    }
    Ok(Frame::Item {
        repeat,
        weight,
        items: Vec::new(),
    })
}

/// Wrap items under a non-trivial repeat
fn repeated(mut items: Vec<Item>, repeat: Repeat) -> Item {
    if items.len() == 1 && items[0].repeat.is_once() {
        if let Some(item) = items.pop() {
            return item.with_repeat(repeat);
        }
    }
    Item::once(ItemKind::Group(Sequence::new(items))).with_repeat(repeat)
}

/// Parse `n`, `n-m` or `n-`
pub fn parse_repeat(value: &str) -> Result<Repeat, ParseError> {
    let bad = || ParseError::InvalidRepeat {
        value: value.to_string(),
    };
    let count = |s: &str| s.trim().parse::<u32>().map_err(|_| bad());

    let repeat = match value.split_once('-') {
        None => {
            let n = count(value)?;
            Repeat::new(n, Some(n))
        }
        Some((min, max)) if max.trim().is_empty() => Repeat::new(count(min)?, None),
        Some((min, max)) => Repeat::new(count(min)?, Some(count(max)?)),
    };
    if repeat.is_valid() {
        Ok(repeat)
    } else {
        Err(bad())
    }
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn attribute<'v>(attributes: &'v [Attribute<'_>], name: &str) -> Option<&'v str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_ref())
}

fn invalid(tag: &str, attribute: &str, value: &str) -> ParseError {
    ParseError::InvalidAttribute {
        tag: tag.to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}
