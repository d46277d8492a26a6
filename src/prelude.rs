//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from speechgram.
//! Importing this module with a wildcard import brings the core types into scope:
//!
//! ```
//! use speechgram::prelude::*;
//!
//! let parser = SrgsParser::new("call-1").with_config(GrammarConfig::default());
//! assert!(parser.is_empty());
//! ```
//!
//! # Re-exported Items
//!
//! ## Core Types
//! - [`SrgsParser`] - Session-scoped parser handle
//! - [`Grammar`] - Parsed grammar
//! - [`GrammarConfig`] - Compilation and matching configuration
//! - [`MatchType`] - Four-way match verdict
//! - [`MatchOutcome`] - Verdict plus interpretation
//!
//! ## Error Handling
//! - [`ParseError`], [`CompileError`], [`IoFailure`]
//!
//! ## Diagnostics
//! - [`Logger`] - Injected logging capability
//! - [`Severity`] - Message severity
//!
//! ## Results
//! - [`NlsmlMatch`] - Result document classification

// ============================================================================
// Core Types
// ============================================================================

pub use crate::srgs::{Grammar, GrammarConfig, MatchOutcome, MatchType, Normalization, SrgsParser};

// ============================================================================
// Error Handling
// ============================================================================

pub use crate::srgs::{CompileError, IoFailure, ParseError, ParseErrorKind};

// ============================================================================
// Diagnostics
// ============================================================================

pub use crate::logging::{LogHandler, Logger, Severity};

// ============================================================================
// Results
// ============================================================================

pub use crate::nlsml::{classify_result, make_dtmf_result, normalize_result, NlsmlMatch};
