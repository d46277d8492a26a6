//! Four-way input classification

use super::config::GrammarConfig;
use super::grammar::InputMode;
use super::normalize::split_words;
use super::pattern::CompiledPattern;
use std::fmt;

/// Result of matching input against a grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchType {
    /// Input is not, and cannot become, an utterance of the grammar
    NoMatch,
    /// Input is an incomplete prefix of some utterance
    MatchPartial,
    /// Input is a complete utterance that more words could extend
    Match,
    /// Input is a complete utterance that nothing can extend
    MatchEnd,
}

impl MatchType {
    /// Whether the input forms a complete utterance
    #[inline]
    pub fn is_complete(self) -> bool {
        matches!(self, MatchType::Match | MatchType::MatchEnd)
    }

    /// Upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::NoMatch => "NO_MATCH",
            MatchType::MatchPartial => "MATCH_PARTIAL",
            MatchType::Match => "MATCH",
            MatchType::MatchEnd => "MATCH_END",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification plus interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// The verdict
    pub kind: MatchType,
    /// Set only for complete utterances
    pub interpretation: Option<String>,
}

impl MatchOutcome {
    /// An outcome with no interpretation
    pub fn no_match() -> Self {
        Self {
            kind: MatchType::NoMatch,
            interpretation: None,
        }
    }
}

/// Classify `input` against a compiled grammar
pub fn classify(
    compiled: &CompiledPattern,
    mode: InputMode,
    config: &GrammarConfig,
    input: &str,
) -> MatchOutcome {
    if input.len() > config.max_input_len {
        return MatchOutcome::no_match();
    }
    let words = split_words(input, mode, config.word_separator);
    if words.is_empty() {
        return MatchOutcome::no_match();
    }

    let prepared = prepare(&words, mode, config);
    let extensible = compiled.prefix().is_some_and(|p| p.is_match(&prepared));
    let Some(captures) = compiled.language().captures(&prepared) else {
        return MatchOutcome {
            kind: if extensible {
                MatchType::MatchPartial
            } else {
                MatchType::NoMatch
            },
            interpretation: None,
        };
    };

    let mut interpretation = String::new();
    let mut fired = false;
    for (i, payload) in compiled.tags().iter().enumerate() {
        if captures.get(i + 1).is_some() {
            interpretation.push_str(payload);
            fired = true;
        }
    }
    if !fired {
        let mut buf = [0u8; 4];
        let separator: &str = match mode {
            InputMode::Voice => config.word_separator.encode_utf8(&mut buf),
            InputMode::Dtmf => "",
        };
        interpretation = words.join(separator);
    }

    MatchOutcome {
        kind: if extensible {
            MatchType::Match
        } else {
            MatchType::MatchEnd
        },
        interpretation: Some(interpretation),
    }
}

/// Normalize words and lay them out the way the patterns expect
fn prepare(words: &[&str], mode: InputMode, config: &GrammarConfig) -> String {
    let mut out = String::with_capacity(words.iter().map(|w| w.len() + 1).sum());
    for word in words {
        out.push_str(&config.normalization.apply(word));
        if mode == InputMode::Voice {
            out.push(config.word_separator);
        }
    }
    out
}
