//! SRGS tag table

use crate::xml::schema::{Attributes, Children, SchemaTable, TagDef, TextPolicy};
use once_cell::sync::Lazy;

/// What the document builder does with a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SrgsTag {
    /// `<grammar>`
    Grammar,
    /// `<rule>`
    Rule,
    /// `<item>`
    Item,
    /// `<one-of>`
    OneOf,
    /// `<ruleref>`
    RuleRef,
    /// `<token>`
    Token,
    /// `<tag>`
    Tag,
    /// Metadata and examples, skipped with their content
    Ignored,
}

const EXPANSION: &[&str] = &["token", "ruleref", "item", "one-of", "tag"];

/// Tag definitions for SRGS 1.0 documents
pub static SRGS_SCHEMA: Lazy<SchemaTable<SrgsTag>> = Lazy::new(|| {
    SchemaTable::new([
        TagDef::new(
            "grammar",
            SrgsTag::Grammar,
            Attributes::Only(&[
                "version",
                "xml:lang",
                "xml:base",
                "mode",
                "root",
                "tag-format",
                "type",
            ]),
            Children::Only(&["meta", "metadata", "lexicon", "tag", "rule"]),
            TextPolicy::Reject,
        )
        .root(),
        TagDef::new(
            "rule",
            SrgsTag::Rule,
            Attributes::Only(&["id", "scope"]),
            Children::Only(&["token", "ruleref", "item", "one-of", "tag", "example"]),
            TextPolicy::Keep,
        ),
        TagDef::new(
            "item",
            SrgsTag::Item,
            Attributes::Only(&["repeat", "repeat-prob", "weight", "xml:lang"]),
            Children::Only(EXPANSION),
            TextPolicy::Keep,
        ),
        TagDef::new(
            "one-of",
            SrgsTag::OneOf,
            Attributes::Only(&["xml:lang"]),
            Children::Only(&["item"]),
            TextPolicy::Reject,
        ),
        TagDef::new(
            "ruleref",
            SrgsTag::RuleRef,
            Attributes::Only(&["uri", "special", "type", "xml:lang"]),
            Children::None,
            TextPolicy::Reject,
        ),
        TagDef::new(
            "token",
            SrgsTag::Token,
            Attributes::Only(&["xml:lang"]),
            Children::None,
            TextPolicy::Keep,
        ),
        TagDef::new(
            "tag",
            SrgsTag::Tag,
            Attributes::Only(&[]),
            Children::None,
            TextPolicy::Keep,
        ),
        TagDef::new(
            "meta",
            SrgsTag::Ignored,
            Attributes::Any,
            Children::None,
            TextPolicy::Ignore,
        ),
        TagDef::new(
            "metadata",
            SrgsTag::Ignored,
            Attributes::Any,
            Children::Any,
            TextPolicy::Ignore,
        ),
        TagDef::new(
            "lexicon",
            SrgsTag::Ignored,
            Attributes::Any,
            Children::None,
            TextPolicy::Ignore,
        ),
        TagDef::new(
            "example",
            SrgsTag::Ignored,
            Attributes::Any,
            Children::None,
            TextPolicy::Ignore,
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_is_root() {
        assert!(SRGS_SCHEMA.get("grammar").unwrap().is_root);
        assert!(!SRGS_SCHEMA.get("rule").unwrap().is_root);
    }

    #[test]
    fn test_nesting() {
        let grammar = *SRGS_SCHEMA.get("grammar").unwrap();
        let one_of = *SRGS_SCHEMA.get("one-of").unwrap();
        assert!(SRGS_SCHEMA.check_open("rule", Some(("grammar", &grammar))).is_ok());
        assert!(SRGS_SCHEMA.check_open("item", Some(("grammar", &grammar))).is_err());
        assert!(SRGS_SCHEMA.check_open("item", Some(("one-of", &one_of))).is_ok());
        assert!(SRGS_SCHEMA.check_open("token", Some(("one-of", &one_of))).is_err());
    }

    #[test]
    fn test_no_fallback() {
        assert!(SRGS_SCHEMA.get("speak").is_none());
    }
}
