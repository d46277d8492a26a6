//! SRGS grammar compiler and matcher
//!
//! A grammar document goes through the following stages:
//!
//! ```text
//! document ──> builder ──> RuleGraph ──┬──> pattern ──> matcher
//!                                       └──> jsgf
//! ```
//!
//! # Module Organization
//!
//! ## Core Types
//! - [`SrgsParser`] - Session-scoped handle owning parsed grammars
//! - [`Grammar`] - Immutable parsed grammar with cached derived forms
//! - [`RuleGraph`] - Arena of rules indexed by [`RuleId`]
//!
//! ## Compilation
//! - [`pattern`] - Regex and proper-prefix pattern compiler
//! - [`jsgf`] - JSGF text grammar renderer
//!
//! ## Matching
//! - [`MatchType`] - Four-way verdict
//! - [`MatchOutcome`] - Verdict plus interpretation
//!
//! ## Grammar Analysis
//! - [`GrammarAnalyzer`] - Warnings for legal but suspicious grammars

// ============================================================================
// Module Declarations
// ============================================================================

pub mod analysis;
pub mod builder;
pub mod compiled;
pub mod config;
pub mod error;
pub mod grammar;
pub mod jsgf;
pub mod matcher;
pub mod normalize;
pub mod parser;
pub mod pattern;
pub mod schema;

// ============================================================================
// Core Types
// ============================================================================

pub use compiled::Grammar;
pub use grammar::{
    Alternative, InputMode, Item, ItemKind, ItemKindCounter, ItemVisitor, RefCollector, Repeat,
    Rule, RuleGraph, RuleId, RuleRef, Scope, Sequence, SpecialRule,
};
pub use parser::SrgsParser;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    GrammarConfig, Normalization, DEFAULT_MAX_INPUT_LEN, DEFAULT_MAX_NESTING_DEPTH,
    DEFAULT_REGEX_SIZE_LIMIT, DEFAULT_WORD_SEPARATOR,
};

// ============================================================================
// Error Handling
// ============================================================================

pub use error::{CompileError, IoFailure, ParseError, ParseErrorKind};

// ============================================================================
// Compilation and Matching
// ============================================================================

pub use matcher::{MatchOutcome, MatchType};
pub use pattern::{CompiledPattern, MAX_INLINE_DEPTH};

// ============================================================================
// Grammar Analysis
// ============================================================================

pub use analysis::{find_cycle, GrammarAnalyzer, GrammarWarning, WarningKind};
