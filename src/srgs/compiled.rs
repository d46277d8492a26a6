//! The compiled grammar artifact
//!
//! A [`Grammar`] is immutable once parsed. Its derived forms are computed on
//! first use and kept for the grammar's lifetime; a failed derivation is not
//! cached, so a later call retries.

use super::config::GrammarConfig;
use super::error::{CompileError, IoFailure};
use super::grammar::{InputMode, Rule, RuleGraph};
use super::jsgf;
use super::matcher::{classify, MatchOutcome, MatchType};
use super::pattern::{compile, CompiledPattern};
use crate::logging::{log_debug, Logger, Severity};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed SRGS grammar
#[derive(Debug)]
pub struct Grammar {
    graph: RuleGraph,
    session_id: Arc<str>,
    seq: u64,
    config: GrammarConfig,
    logger: Logger,
    pattern: OnceCell<CompiledPattern>,
    text: OnceCell<String>,
}

impl Grammar {
    pub(crate) fn new(
        graph: RuleGraph,
        session_id: Arc<str>,
        seq: u64,
        config: GrammarConfig,
        logger: Logger,
    ) -> Self {
        Self {
            graph,
            session_id,
            seq,
            config,
            logger,
            pattern: OnceCell::new(),
            text: OnceCell::new(),
        }
    }

    /// The rule graph
    #[inline]
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// Input mode
    #[inline]
    pub fn mode(&self) -> InputMode {
        self.graph.mode
    }

    /// The root rule
    pub fn root(&self) -> Option<&Rule> {
        self.graph.root_rule()
    }

    /// `xml:lang` of the document
    pub fn language(&self) -> Option<&str> {
        self.graph.language.as_deref()
    }

    /// `xml:base` of the document
    pub fn base_uri(&self) -> Option<&str> {
        self.graph.base_uri.as_deref()
    }

    /// Session id of the handle that parsed this grammar
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Position of this grammar among those parsed by its handle
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Configuration in effect
    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Serialize the rule graph to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.graph.to_json()
    }

    /// Compiled regex forms, built on first call
    pub fn compiled(&self) -> Result<&CompiledPattern, CompileError> {
        self.pattern.get_or_try_init(|| {
            compile(&self.graph, &self.config).inspect_err(|err| {
                self.logger.log_with(&self.session_id, Severity::Warning, || {
                    format!("grammar {}: {}", self.seq, err)
                });
            })
        })
    }

    /// The anchored regex for the grammar's language
    pub fn to_regex(&self) -> Result<&str, CompileError> {
        self.compiled().map(CompiledPattern::pattern)
    }

    /// The grammar as JSGF text
    pub fn to_text_grammar(&self) -> &str {
        self.text.get_or_init(|| jsgf::render(&self.graph))
    }

    /// Write the JSGF text to `dir` and return the path written
    ///
    /// The file name is derived from the session id and [`Grammar::seq`].
    /// The caller owns the file.
    pub fn to_text_grammar_file(
        &self,
        dir: impl AsRef<Path>,
        extension: &str,
    ) -> Result<PathBuf, IoFailure> {
        let path = dir
            .as_ref()
            .join(jsgf::file_name(&self.session_id, self.seq, extension));
        std::fs::write(&path, self.to_text_grammar()).map_err(|source| {
            self.logger.log_with(&self.session_id, Severity::Warning, || {
                format!("failed to write {}: {}", path.display(), source)
            });
            IoFailure {
                path: path.clone(),
                source,
            }
        })?;
        log_debug!("wrote text grammar to {}", path.display());
        Ok(path)
    }

    /// Classify `input` and extract its interpretation
    ///
    /// A grammar whose pattern cannot be compiled matches nothing.
    pub fn match_input(&self, input: &str) -> MatchOutcome {
        let outcome = match self.compiled() {
            Ok(compiled) => classify(compiled, self.graph.mode, &self.config, input),
            Err(_) => MatchOutcome::no_match(),
        };
        self.logger.log_with(&self.session_id, Severity::Debug, || {
            format!("match \"{}\" -> {}", input, outcome.kind)
        });
        outcome
    }

    /// Classify `input`, discarding the interpretation
    pub fn classify(&self, input: &str) -> MatchType {
        self.match_input(input).kind
    }
}
