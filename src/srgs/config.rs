//! Grammar compilation and matching configuration

/// Default maximum input size for matching: 1 KiB
pub const DEFAULT_MAX_INPUT_LEN: usize = 1024;

/// Default compiled regex size limit: 10 MiB
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Default maximum element nesting in a grammar document
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Default word separator
pub const DEFAULT_WORD_SEPARATOR: char = ' ';

/// How words are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalization {
    /// Compare words case-insensitively
    pub case_insensitive: bool,
    /// Fold accented Latin letters to their base letter
    pub strip_diacritics: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            strip_diacritics: false,
        }
    }
}

impl Normalization {
    /// Compare words exactly as written
    pub fn exact() -> Self {
        Self {
            case_insensitive: false,
            strip_diacritics: false,
        }
    }
}

/// Configuration shared by every grammar of a parser handle
///
/// Use [`GrammarConfig::default()`] for sensible defaults, or customize:
///
/// ```
/// use speechgram::srgs::GrammarConfig;
///
/// let config = GrammarConfig::new()
///     .with_word_separator(',')
///     .with_max_input_len(256);
/// assert_eq!(config.word_separator, ',');
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Separator between words in voice input and compiled patterns
    pub word_separator: char,

    /// Word comparison rules
    pub normalization: Normalization,

    /// Inputs longer than this many bytes never match
    pub max_input_len: usize,

    /// Size limit handed to the regex compiler
    pub regex_size_limit: usize,

    /// Deepest element nesting a grammar document may use
    pub max_nesting_depth: usize,

    /// Reuse the compiled grammar when the same document is parsed again
    pub cache_documents: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            word_separator: DEFAULT_WORD_SEPARATOR,
            normalization: Normalization::default(),
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            cache_documents: true,
        }
    }
}

impl GrammarConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the word separator
    pub fn with_word_separator(mut self, separator: char) -> Self {
        self.word_separator = separator;
        self
    }

    /// Set the word normalization
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the maximum input length
    pub fn with_max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }

    /// Set the regex size limit
    pub fn with_regex_size_limit(mut self, bytes: usize) -> Self {
        self.regex_size_limit = bytes;
        self
    }

    /// Set the maximum element nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Enable or disable the document cache
    pub fn with_document_cache(mut self, enabled: bool) -> Self {
        self.cache_documents = enabled;
        self
    }
}
