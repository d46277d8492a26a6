//! Speechgram - SRGS grammar compilation and NLSML result handling
//!
//! This library models the documents a telephony dialog platform exchanges
//! with its recognizers. It provides:
//! - SRGS XML parsing into an arena-backed rule graph
//! - Compilation of grammars to anchored regular expressions and JSGF text
//! - Four-way matching of recognizer hypotheses, including partial input
//! - Tag interpretation capture
//! - Classification and synthesis of NLSML result documents
//!
//! ## Quick Start
//!
//! ```rust
//! use speechgram::srgs::{MatchType, SrgsParser};
//!
//! let mut parser = SrgsParser::new("call-1");
//! let grammar = parser
//!     .parse(
//!         r#"<grammar root="order">
//!              <rule id="order">book <tag>ACTION=BOOK</tag> flight</rule>
//!            </grammar>"#,
//!     )
//!     .unwrap();
//!
//! assert_eq!(grammar.classify("book"), MatchType::MatchPartial);
//!
//! let outcome = grammar.match_input("book flight");
//! assert_eq!(outcome.kind, MatchType::MatchEnd);
//! assert_eq!(outcome.interpretation.as_deref(), Some("ACTION=BOOK"));
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

// Prelude module for convenient imports
pub mod prelude;

pub mod logging;
pub mod nlsml;
pub mod srgs;
pub mod xml;

/// Re-export commonly used types for convenience
pub use logging::{LogHandler, Logger, Severity};
pub use nlsml::{classify_result, make_dtmf_result, normalize_result, NlsmlMatch};
pub use srgs::{
    CompileError, Grammar, GrammarConfig, IoFailure, MatchOutcome, MatchType, ParseError,
    SrgsParser,
};
