//! Session-scoped parser handle

use super::analysis::GrammarAnalyzer;
use super::builder::build;
use super::compiled::Grammar;
use super::config::GrammarConfig;
use super::error::ParseError;
use crate::logging::{log_debug, Logger, Severity};
use ahash::RandomState;
use hashbrown::HashMap;
use std::sync::Arc;

/// Grammars by the exact document text they were parsed from
type DocumentCache = HashMap<Box<str>, Arc<Grammar>, RandomState>;

/// Owns the grammars parsed for one session
///
/// ```
/// use speechgram::srgs::{MatchType, SrgsParser};
///
/// let mut parser = SrgsParser::new("call-42");
/// let grammar = parser
///     .parse(r#"<grammar root="yn"><rule id="yn"><one-of>
///                 <item>yes</item><item>no</item>
///               </one-of></rule></grammar>"#)
///     .unwrap();
/// assert_eq!(grammar.classify("yes"), MatchType::MatchEnd);
/// ```
#[derive(Debug)]
pub struct SrgsParser {
    session_id: Arc<str>,
    config: GrammarConfig,
    logger: Logger,
    grammars: Vec<Arc<Grammar>>,
    cache: DocumentCache,
    next_seq: u64,
}

impl SrgsParser {
    /// Create a handle for `session_id` with default configuration and no logging
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Arc::from(session_id.into()),
            config: GrammarConfig::default(),
            logger: Logger::none(),
            grammars: Vec::new(),
            cache: DocumentCache::with_hasher(RandomState::new()),
            next_seq: 0,
        }
    }

    /// Set the configuration for grammars parsed from now on
    pub fn with_config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the diagnostics logger
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Session id used to tag diagnostics
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current configuration
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Parse a grammar document
    ///
    /// With the document cache enabled, parsing the same text again returns
    /// the grammar built the first time.
    pub fn parse(&mut self, document: &str) -> Result<Arc<Grammar>, ParseError> {
        if self.config.cache_documents {
            if let Some(grammar) = self.cache.get(document) {
                log_debug!("document cache hit for grammar {}", grammar.seq());
                return Ok(Arc::clone(grammar));
            }
        }

        let graph = build(document, &self.config).inspect_err(|err| {
            self.logger.log_with(&self.session_id, Severity::Info, || {
                format!("failed to parse grammar: {}", err)
            });
        })?;

        for warning in GrammarAnalyzer::new(&graph).analyze() {
            self.logger
                .log(&self.session_id, Severity::Notice, &warning.to_string());
        }

        let grammar = Arc::new(Grammar::new(
            graph,
            Arc::clone(&self.session_id),
            self.next_seq,
            self.config.clone(),
            self.logger.clone(),
        ));
        self.next_seq += 1;
        self.logger.log_with(&self.session_id, Severity::Debug, || {
            format!(
                "parsed grammar {} ({} rules)",
                grammar.seq(),
                grammar.graph().rule_count()
            )
        });

        if self.config.cache_documents {
            self.cache.insert(document.into(), Arc::clone(&grammar));
        }
        self.grammars.push(Arc::clone(&grammar));
        Ok(grammar)
    }

    /// Grammars owned by this handle, in parse order
    pub fn grammars(&self) -> &[Arc<Grammar>] {
        &self.grammars
    }

    /// Number of grammars owned
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    /// Whether the handle owns no grammars
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Release one grammar; returns whether this handle owned it
    ///
    /// Outstanding `Arc`s held by callers stay valid.
    pub fn release(&mut self, grammar: &Arc<Grammar>) -> bool {
        let before = self.grammars.len();
        self.grammars.retain(|g| !Arc::ptr_eq(g, grammar));
        self.cache.retain(|_, g| !Arc::ptr_eq(g, grammar));
        self.grammars.len() != before
    }

    /// Release every grammar
    pub fn clear(&mut self) {
        self.grammars.clear();
        self.cache.clear();
    }

    /// Destroy the handle and everything it owns
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for SrgsParser {
    fn drop(&mut self) {
        self.logger.log_with(&self.session_id, Severity::Debug, || {
            format!("destroying parser with {} grammars", self.grammars.len())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const DOC: &str = r#"<grammar><rule id="a">hello</rule></grammar>"#;

    #[test]
    fn test_document_cache() {
        let mut parser = SrgsParser::new("s");
        let a = parser.parse(DOC).unwrap();
        let b = parser.parse(DOC).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(parser.len(), 1);

        let mut uncached =
            SrgsParser::new("s").with_config(GrammarConfig::default().with_document_cache(false));
        let a = uncached.parse(DOC).unwrap();
        let b = uncached.parse(DOC).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!((a.seq(), b.seq()), (0, 1));
    }

    #[test]
    fn test_cache_keyed_by_text() {
        let other = r#"<grammar><rule id="a">goodbye</rule></grammar>"#;
        let mut parser = SrgsParser::new("s");
        let a = parser.parse(DOC).unwrap();
        let b = parser.parse(other).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(parser.cache.contains_key(DOC));
        assert!(parser.cache.contains_key(other));
        assert!(Arc::ptr_eq(&parser.parse(other).unwrap(), &b));
        assert_eq!(b.classify("goodbye"), crate::srgs::MatchType::MatchEnd);
        assert_eq!(parser.len(), 2);
    }

    #[test]
    fn test_release() {
        let mut parser = SrgsParser::new("s");
        let grammar = parser.parse(DOC).unwrap();
        assert!(parser.release(&grammar));
        assert!(!parser.release(&grammar));
        assert!(parser.is_empty());
        // still usable by the caller
        assert!(grammar.to_regex().is_ok());
    }

    #[test]
    fn test_failures_and_warnings_logged() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = Logger::new(move |ctx: &str, sev: Severity, msg: &str| {
            sink.lock().unwrap().push((ctx.to_string(), sev, msg.to_string()));
        })
        .with_min_severity(Severity::Notice);
        let mut parser = SrgsParser::new("call-7").with_logger(logger);

        assert!(parser.parse("<grammar><rule id='a'><ruleref uri='#x'/></rule></grammar>").is_err());
        parser
            .parse("<grammar root='a'><rule id='a'>x</rule><rule id='b'>y</rule></grammar>")
            .unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, "call-7");
        assert_eq!(lines[0].1, Severity::Info);
        assert!(lines[0].2.contains("undefined rule x"));
        assert_eq!(lines[1].1, Severity::Notice);
        assert!(lines[1].2.contains("unreachable"));
    }

    #[test]
    fn test_failed_parse_leaves_no_grammar() {
        let mut parser = SrgsParser::new("s");
        assert!(parser.parse("<grammar><rule id='a'>").is_err());
        assert!(parser.is_empty());
    }
}
