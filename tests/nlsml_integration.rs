//! Integration tests for NLSML result handling
//!
//! Covers the hand-off from grammar matching to result documents: a DTMF
//! match is packaged as NLSML and read back by the classifier.

use speechgram::logging::Logger;
use speechgram::nlsml::{classify_result, make_dtmf_result, normalize_result, NlsmlMatch};
use speechgram::srgs::{MatchType, SrgsParser};
use speechgram::xml::Element;

const ASR_MATCH: &str = r#"<?xml version="1.0"?>
<result grammar="session:order">
  <interpretation grammar="session:order" confidence="0.92">
    <model><group name="order"/></model>
    <instance><order>pizza</order></instance>
    <input mode="speech" confidence="0.92">a pizza please</input>
  </interpretation>
</result>"#;

const ASR_NOINPUT: &str = r#"<result>
  <interpretation>
    <input><noinput/></input>
  </interpretation>
</result>"#;

fn classify(doc: &str) -> NlsmlMatch {
    classify_result(doc, "call-1", &Logger::none())
}

#[test]
fn test_asr_results() {
    assert_eq!(classify(ASR_MATCH), NlsmlMatch::Match);
    assert_eq!(classify(ASR_NOINPUT), NlsmlMatch::NoInput);
    assert_eq!(classify("not xml at all"), NlsmlMatch::BadXml);
    assert_eq!(NlsmlMatch::NoInput.to_string(), "NOINPUT");
}

#[test]
fn test_dtmf_match_round_trip() {
    let mut parser = SrgsParser::new("call-1");
    let grammar = parser
        .parse(
            r#"<grammar mode="dtmf" root="menu"><rule id="menu"><one-of>
                 <item>1 <tag>SALES</tag></item>
                 <item>2 <tag>SUPPORT</tag></item>
               </one-of></rule></grammar>"#,
        )
        .unwrap();

    let outcome = grammar.match_input("2");
    assert_eq!(outcome.kind, MatchType::MatchEnd);

    let result = make_dtmf_result("2", outcome.interpretation.as_deref());
    assert_eq!(classify(&result), NlsmlMatch::Match);

    let root = Element::parse(&result).unwrap();
    let interpretation = root.child("interpretation").unwrap();
    let input = interpretation.child("input").unwrap();
    assert_eq!(input.attribute("mode"), Some("dtmf"));
    assert_eq!(input.text(), "2");
    assert_eq!(interpretation.child("instance").unwrap().text(), "SUPPORT");
}

#[test]
fn test_empty_dtmf_result_is_bad() {
    let result = make_dtmf_result("", None);
    assert_eq!(classify(&result), NlsmlMatch::BadXml);
}

#[test]
fn test_normalize_keeps_content() {
    let normalized = normalize_result(ASR_MATCH).unwrap();
    let root = Element::parse(&normalized).unwrap();
    assert_eq!(root.attribute("xmlns"), Some("http://www.ietf.org/xml/ns/mrcpv2"));
    assert_eq!(root.attribute("grammar"), Some("session:order"));
    assert_eq!(classify(&normalized), NlsmlMatch::Match);
    assert!(normalize_result("").is_none());
}
