//! Error types for grammar parsing and compilation

use crate::xml::schema::SchemaViolation;
use crate::xml::XmlError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Broad category of a [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The document is not well-formed XML
    MalformedXml,
    /// A tag appears where the schema does not allow it
    DisallowedNesting,
    /// A rule reference names no rule
    UnresolvedReference,
    /// A rule reaches itself through references
    CyclicReference,
    /// Repeat bounds are malformed or inverted
    InvalidRepeat,
    /// Any other structural problem with the document
    InvalidDocument,
}

/// Error type for grammar parsing
///
/// No partially built grammar survives any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Empty or blank document
    EmptyDocument,

    /// Well-formedness failure from the tokenizer
    MalformedXml {
        /// Byte offset of the failure
        position: usize,
        /// Tokenizer message
        reason: String,
    },

    /// Tag not part of SRGS
    UnknownTag {
        /// Tag name
        tag: String,
    },

    /// Tag nested where its parent does not allow it
    DisallowedTag {
        /// Tag name
        tag: String,
        /// Enclosing tag name
        parent: String,
    },

    /// Root-only tag nested inside another element
    NotRoot {
        /// Tag name
        tag: String,
    },

    /// Non-root tag at document level
    InvalidRoot {
        /// Tag name
        tag: String,
    },

    /// Attribute not accepted by the tag
    DisallowedAttribute {
        /// Tag name
        tag: String,
        /// Attribute name
        attribute: String,
    },

    /// Required attribute missing
    MissingAttribute {
        /// Tag name
        tag: String,
        /// Attribute name
        attribute: String,
    },

    /// Attribute value not understood
    InvalidAttribute {
        /// Tag name
        tag: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
    },

    /// Character data where the tag allows none
    UnexpectedText {
        /// Tag name
        tag: String,
    },

    /// Two rules share an identifier
    DuplicateRule {
        /// Rule identifier
        id: String,
    },

    /// The grammar defines no rules
    MissingRoot,

    /// Rule reference to an undefined rule
    UnresolvedReference {
        /// Referenced identifier
        reference: String,
    },

    /// Rule reference outside the document
    UnsupportedReference {
        /// The `uri` attribute
        uri: String,
    },

    /// Rules reaching themselves through references
    CyclicReference {
        /// Rule identifiers along the cycle, first repeated at the end
        chain: Vec<String>,
    },

    /// Malformed or inverted repeat bounds
    InvalidRepeat {
        /// The `repeat` attribute
        value: String,
    },

    /// Elements nested deeper than the configured limit
    NestingTooDeep {
        /// Maximum depth
        limit: usize,
    },
}

impl ParseError {
    /// Category of this error
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::MalformedXml { .. } => ParseErrorKind::MalformedXml,
            ParseError::UnknownTag { .. }
            | ParseError::DisallowedTag { .. }
            | ParseError::NotRoot { .. }
            | ParseError::InvalidRoot { .. }
            | ParseError::NestingTooDeep { .. } => ParseErrorKind::DisallowedNesting,
            ParseError::UnresolvedReference { .. } | ParseError::UnsupportedReference { .. } => {
                ParseErrorKind::UnresolvedReference
            }
            ParseError::CyclicReference { .. } => ParseErrorKind::CyclicReference,
            ParseError::InvalidRepeat { .. } => ParseErrorKind::InvalidRepeat,
            ParseError::EmptyDocument
            | ParseError::DisallowedAttribute { .. }
            | ParseError::MissingAttribute { .. }
            | ParseError::InvalidAttribute { .. }
            | ParseError::UnexpectedText { .. }
            | ParseError::DuplicateRule { .. }
            | ParseError::MissingRoot => ParseErrorKind::InvalidDocument,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyDocument => write!(f, "empty grammar document"),
            ParseError::MalformedXml { position, reason } => {
                write!(f, "malformed XML at byte {}: {}", position, reason)
            }
            ParseError::UnknownTag { tag } => write!(f, "<{}> is not an SRGS tag", tag),
            ParseError::DisallowedTag { tag, parent } => {
                write!(f, "<{}> cannot be a child of <{}>", tag, parent)
            }
            ParseError::NotRoot { tag } => write!(f, "<{}> must be the root element", tag),
            ParseError::InvalidRoot { tag } => write!(f, "<{}> cannot be a root element", tag),
            ParseError::DisallowedAttribute { tag, attribute } => {
                write!(f, "<{}> does not accept attribute {}", tag, attribute)
            }
            ParseError::MissingAttribute { tag, attribute } => {
                write!(f, "<{}> requires attribute {}", tag, attribute)
            }
            ParseError::InvalidAttribute {
                tag,
                attribute,
                value,
            } => write!(f, "invalid {}=\"{}\" on <{}>", attribute, value, tag),
            ParseError::UnexpectedText { tag } => write!(f, "unexpected text in <{}>", tag),
            ParseError::DuplicateRule { id } => write!(f, "rule {} is defined twice", id),
            ParseError::MissingRoot => write!(f, "grammar has no rules"),
            ParseError::UnresolvedReference { reference } => {
                write!(f, "reference to undefined rule {}", reference)
            }
            ParseError::UnsupportedReference { uri } => {
                write!(f, "only local rule references are supported, got {}", uri)
            }
            ParseError::CyclicReference { chain } => {
                write!(f, "cyclic rule reference: {}", chain.join(" -> "))
            }
            ParseError::InvalidRepeat { value } => write!(f, "invalid repeat \"{}\"", value),
            ParseError::NestingTooDeep { limit } => {
                write!(f, "elements nested deeper than {} levels", limit)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<XmlError> for ParseError {
    fn from(err: XmlError) -> Self {
        ParseError::MalformedXml {
            position: err.position,
            reason: err.reason,
        }
    }
}

impl From<SchemaViolation> for ParseError {
    fn from(violation: SchemaViolation) -> Self {
        match violation {
            SchemaViolation::UnknownTag { tag } => ParseError::UnknownTag { tag },
            SchemaViolation::MustBeRoot { tag } => ParseError::NotRoot { tag },
            SchemaViolation::NotRoot { tag } => ParseError::InvalidRoot { tag },
            SchemaViolation::DisallowedChild { tag, parent } => {
                ParseError::DisallowedTag { tag, parent }
            }
            SchemaViolation::DisallowedAttribute { tag, attribute } => {
                ParseError::DisallowedAttribute { tag, attribute }
            }
        }
    }
}

/// Error type for deriving a compiled form
///
/// Leaves the grammar and its other cached forms intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Compiled pattern exceeds the configured size limit
    PatternTooLarge {
        /// Limit in bytes
        limit: usize,
    },
    /// Rule references inline deeper than the compiler allows
    NestingTooDeep {
        /// Maximum depth
        limit: usize,
    },
    /// The regex engine rejected the pattern
    InvalidPattern {
        /// Engine message
        reason: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::PatternTooLarge { limit } => {
                write!(f, "compiled pattern exceeds size limit of {} bytes", limit)
            }
            CompileError::NestingTooDeep { limit } => {
                write!(f, "rule references nest deeper than {} levels", limit)
            }
            CompileError::InvalidPattern { reason } => write!(f, "invalid pattern: {}", reason),
        }
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub(crate) fn from_regex(err: regex::Error, limit: usize) -> Self {
        match err {
            regex::Error::CompiledTooBig(_) => CompileError::PatternTooLarge { limit },
            other => CompileError::InvalidPattern {
                reason: other.to_string(),
            },
        }
    }
}

/// Failure writing a text grammar file
#[derive(Debug)]
pub struct IoFailure {
    /// Target path
    pub path: PathBuf,
    /// Underlying error
    pub source: io::Error,
}

impl fmt::Display for IoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to write {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for IoFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
