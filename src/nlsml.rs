//! NLSML recognition results
//!
//! Recognizers report results as NLSML documents. This module tells a
//! match from a no-input or no-match result, rewrites results into the
//! MRCPv2 namespace, and builds the result document for a DTMF match so
//! keypad and speech input reach the dialog layer in the same shape.
//!
//! ```
//! use speechgram::logging::Logger;
//! use speechgram::nlsml::{classify_result, make_dtmf_result, NlsmlMatch};
//!
//! let result = make_dtmf_result("12#", None);
//! assert_eq!(classify_result(&result, "call-1", &Logger::none()), NlsmlMatch::Match);
//! ```

use crate::logging::{Logger, Severity};
use crate::srgs::normalize::is_dtmf_key;
use crate::xml::schema::{Attributes, Children, SchemaTable, TagDef, TextPolicy};
use crate::xml::{Element, Tokenizer, XmlEvent};
use once_cell::sync::Lazy;
use std::fmt;

/// MRCPv2 result namespace
pub const NLSML_NAMESPACE: &str = "http://www.ietf.org/xml/ns/mrcpv2";

/// XForms namespace bound to the `xf` prefix
pub const XFORMS_NAMESPACE: &str = "http://www.w3.org/2000/xforms";

/// Classification of a result document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NlsmlMatch {
    /// Malformed, invalid, or without any outcome
    BadXml,
    /// Input text was recognized
    Match,
    /// Caller said nothing
    NoInput,
    /// Caller said something the grammar does not cover
    NoMatch,
}

impl NlsmlMatch {
    /// Upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            NlsmlMatch::BadXml => "BAD_XML",
            NlsmlMatch::Match => "MATCH",
            NlsmlMatch::NoInput => "NOINPUT",
            NlsmlMatch::NoMatch => "NOMATCH",
        }
    }
}

impl fmt::Display for NlsmlMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NlsmlTag {
    Result,
    Interpretation,
    Input,
    NoInput,
    NoMatch,
    Other,
}

const ANY: TagDef<NlsmlTag> = TagDef::new(
    "ANY",
    NlsmlTag::Other,
    Attributes::Any,
    Children::Any,
    TextPolicy::Ignore,
);

static NLSML_SCHEMA: Lazy<SchemaTable<NlsmlTag>> = Lazy::new(|| {
    let container = |name: &'static str| TagDef { name, ..ANY };
    SchemaTable::new([
        TagDef::new(
            "result",
            NlsmlTag::Result,
            Attributes::Any,
            Children::Only(&["interpretation"]),
            TextPolicy::Ignore,
        )
        .root(),
        TagDef::new(
            "interpretation",
            NlsmlTag::Interpretation,
            Attributes::Any,
            Children::Only(&["input", "model", "xf:model", "instance", "xf:instance"]),
            TextPolicy::Ignore,
        ),
        TagDef::new(
            "input",
            NlsmlTag::Input,
            Attributes::Any,
            Children::Only(&["input", "nomatch", "noinput"]),
            TextPolicy::Keep,
        ),
        TagDef::new(
            "noinput",
            NlsmlTag::NoInput,
            Attributes::Any,
            Children::None,
            TextPolicy::Reject,
        ),
        TagDef::new(
            "nomatch",
            NlsmlTag::NoMatch,
            Attributes::Any,
            Children::None,
            TextPolicy::Ignore,
        ),
        container("model"),
        container("xf:model"),
        container("instance"),
        container("xf:instance"),
    ])
    .with_fallback(ANY)
});

#[derive(Default)]
struct Counts {
    matches: usize,
    no_input: usize,
    no_match: usize,
}

/// Classify an NLSML result document
///
/// Failures are reported to `logger` at INFO under `session_id`.
pub fn classify_result(document: &str, session_id: &str, logger: &Logger) -> NlsmlMatch {
    if document.trim().is_empty() {
        logger.log(session_id, Severity::Info, "Missing NLSML result");
        return NlsmlMatch::BadXml;
    }
    match scan(document, session_id, logger) {
        Ok(counts) if counts.matches > 0 => NlsmlMatch::Match,
        Ok(counts) if counts.no_match > 0 => NlsmlMatch::NoMatch,
        Ok(counts) if counts.no_input > 0 => NlsmlMatch::NoInput,
        Ok(_) => {
            logger.log(
                session_id,
                Severity::Info,
                "NLSML result does not have match/noinput/nomatch",
            );
            NlsmlMatch::BadXml
        }
        Err(reason) => {
            logger.log_with(session_id, Severity::Info, || {
                format!("Failed to parse NLSML: {}", reason)
            });
            NlsmlMatch::BadXml
        }
    }
}

fn scan(document: &str, session_id: &str, logger: &Logger) -> Result<Counts, String> {
    let schema = &*NLSML_SCHEMA;
    let mut stack: Vec<(&str, &TagDef<NlsmlTag>)> = Vec::new();
    let mut counts = Counts::default();

    for event in Tokenizer::new(document) {
        match event.map_err(|e| e.to_string())? {
            XmlEvent::Open {
                name, self_closing, ..
            } => {
                logger.log_with(session_id, Severity::Debug, || format!("<{}>", name));
                let def = schema
                    .check_open(name, stack.last().copied())
                    .map_err(|v| v.to_string())?;
                match def.kind {
                    NlsmlTag::NoInput => counts.no_input += 1,
                    NlsmlTag::NoMatch => counts.no_match += 1,
                    _ => {}
                }
                if self_closing {
                    logger.log_with(session_id, Severity::Debug, || format!("</{}>", name));
                } else {
                    stack.push((name, def));
                }
            }
            XmlEvent::Close { name } => {
                logger.log_with(session_id, Severity::Debug, || format!("</{}>", name));
                stack.pop();
            }
            XmlEvent::Text(text) => {
                let Some(&(name, def)) = stack.last() else {
                    continue;
                };
                let printable = text.chars().any(|c| !c.is_whitespace() && !c.is_control());
                match (def.text, def.kind) {
                    (TextPolicy::Reject, _) if printable => {
                        return Err(format!("Unexpected CDATA for <{}>", name));
                    }
                    (TextPolicy::Keep, NlsmlTag::Input) if printable => counts.matches += 1,
                    _ => {}
                }
            }
        }
    }
    Ok(counts)
}

/// Rewrite a result into the MRCPv2 namespace
///
/// Returns `None` when the document does not parse.
pub fn normalize_result(document: &str) -> Option<String> {
    let mut root = Element::parse(document).ok()?;
    root.set_attribute("xmlns", NLSML_NAMESPACE);
    Some(root.to_xml())
}

/// Build the result document for a DTMF match
///
/// The input element lists the DTMF keys of `digits` separated by spaces;
/// characters that are not keys are dropped. The instance carries
/// `interpretation`, or the keys when there is none.
pub fn make_dtmf_result(digits: &str, interpretation: Option<&str>) -> String {
    let mut result = Element::new("result")
        .with_attribute("xmlns", NLSML_NAMESPACE)
        .with_attribute("xmlns:xf", XFORMS_NAMESPACE);

    if !digits.is_empty() {
        let keys = digits
            .chars()
            .filter(|&c| is_dtmf_key(c))
            .map(String::from)
            .collect::<Vec<_>>()
            .join(" ");

        let node = result.push_element(Element::new("interpretation"));
        let mut input = Element::new("input")
            .with_attribute("mode", "dtmf")
            .with_attribute("confidence", "100");
        input.push_text(keys.clone());
        node.push_element(input);

        let mut instance = Element::new("instance");
        match interpretation.filter(|i| !i.is_empty()) {
            Some(text) => instance.push_text(text),
            None => instance.push_text(keys),
        }
        node.push_element(instance);
    }
    result.to_xml()
}
