use miette::Diagnostic;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error types for the transcoder
///
/// Every variant is fatal: a conversion run either produces the full output
/// text or one of these.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum Error {
    #[error("I/O error: {0}")]
    #[diagnostic(code(js2ts::io_error))]
    Io(String),

    #[error("Invalid input: {message}")]
    #[diagnostic(code(js2ts::invalid_input))]
    InvalidInput { message: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(js2ts::config_error))]
    Config { message: String },

    #[error("Instruction is not terminated by ';': {snippet}")]
    #[diagnostic(
        code(js2ts::unterminated_instruction),
        help("every top-level statement must end with a semicolon")
    )]
    UnterminatedInstruction { snippet: String },

    #[error("Unterminated {literal} starting at offset {offset}")]
    #[diagnostic(code(js2ts::unterminated_literal))]
    UnterminatedLiteral { literal: &'static str, offset: usize },

    #[error("Unbalanced '{bracket}' at offset {offset}")]
    #[diagnostic(code(js2ts::unbalanced_bracket))]
    UnbalancedBracket { bracket: char, offset: usize },

    #[error("Ambiguous lexeme at offset {offset}: {message}")]
    #[diagnostic(code(js2ts::ambiguous_lexeme))]
    AmbiguousLexeme { offset: usize, message: String },

    #[error("Unsupported syntax: {message}")]
    #[diagnostic(code(js2ts::unsupported_syntax))]
    UnsupportedSyntax { message: String },

    #[error("Unresolved reference '{name}' in '{path}'")]
    #[diagnostic(code(js2ts::unresolved_reference))]
    UnresolvedReference { name: String, path: String },

    #[error("Cannot assign members on '{segment}' in '{path}': it is neither an object nor a function")]
    #[diagnostic(code(js2ts::invalid_member_target))]
    InvalidMemberTarget { segment: String, path: String },

    #[error("Malformed factory registration: {message}")]
    #[diagnostic(code(js2ts::malformed_factory))]
    MalformedFactory { message: String },

    #[error("Could not find any export statement; is this module not exporting anything?")]
    #[diagnostic(code(js2ts::missing_export))]
    MissingExport,

    #[error("Unsupported export '{token}': {reason}")]
    #[diagnostic(code(js2ts::unsupported_export_shape))]
    UnsupportedExportShape { token: String, reason: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(js2ts::internal_error))]
    Internal { message: String },
}

impl Error {
    /// Create an unsupported syntax error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedSyntax {
            message: message.into(),
        }
    }

    /// Create a malformed factory error
    pub fn malformed_factory(message: impl Into<String>) -> Self {
        Error::MalformedFactory {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Whether the input was rejected as outside the recognized grammar,
    /// as opposed to failing on broken input or I/O.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedSyntax { .. }
                | Error::MalformedFactory { .. }
                | Error::MissingExport
                | Error::UnsupportedExportShape { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

