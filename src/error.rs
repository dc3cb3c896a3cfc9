//! Error types for the sysyc compiler

use thiserror::Error;

/// Compiler errors
///
/// Every stage reports its first failure through this type; nothing in the
/// library aborts the process. The hosting tool decides how to terminate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Front-end errors
    /// Lexical or syntactic error
    ///
    /// **Triggered by:** stray characters, malformed literals, unterminated comments
    /// **Example:** `return 1 $ 2;`
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// Unexpected token encountered during parsing
    #[error("Unexpected token at line {line}, column {col}: expected {expected}, got {got}")]
    UnexpectedToken {
        /// Expected token description
        expected: String,
        /// Actual token received
        got: String,
        /// Line of the offending token
        line: usize,
        /// Column of the offending token
        col: usize,
    },

    /// Unexpected end of file during parsing
    #[error("Unexpected end of file")]
    UnexpectedEof,

    // Unsupported-construct errors
    /// Construct outside the supported language fragment
    ///
    /// **Triggered by:** a function other than `main`, a non-`int` return type,
    /// `return;` without a value, a variable without initializer
    #[error("Unsupported construct at line {line}, column {col}: {construct}")]
    Unsupported {
        /// Description of the rejected construct
        construct: String,
        /// Line of the construct
        line: usize,
        /// Column of the construct
        col: usize,
    },

    /// Reference to an identifier that was never declared in scope
    #[error("Undefined identifier '{name}' at line {line}, column {col}")]
    UndefinedIdentifier {
        /// Identifier name
        name: String,
        /// Line of the reference
        line: usize,
        /// Column of the reference
        col: usize,
    },

    /// Identifier declared twice in the same block
    #[error("Redeclaration of '{name}' at line {line}, column {col}")]
    Redeclaration {
        /// Identifier name
        name: String,
        /// Line of the second declaration
        line: usize,
        /// Column of the second declaration
        col: usize,
    },

    /// Constant initializer reads a variable
    #[error("Constant initializer references non-constant '{name}' at line {line}, column {col}")]
    NonConstantInitializer {
        /// Name of the variable that was referenced
        name: String,
        /// Line of the reference
        line: usize,
        /// Column of the reference
        col: usize,
    },

    // IR errors
    /// IR text that the reconstruction step cannot accept
    #[error("Malformed IR at line {line}: {message}")]
    MalformedIr {
        /// 1-indexed line in the IR text
        line: usize,
        /// Error description
        message: String,
    },

    /// Division or remainder by zero while interpreting IR
    #[error("Division by zero")]
    DivisionByZero,

    /// IR that parses but cannot be interpreted
    ///
    /// **Triggered by:** evaluating a missing function, a declaration, or a
    /// block that never returns a value
    #[error("Evaluation error: {0}")]
    EvalError(String),

    // Backend errors
    /// Code generator invariant violated
    #[error("Codegen error: {0}")]
    CodegenError(String),

    /// Compile options outside their valid range
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Error class, following the translator's error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Source text could not be tokenized or parsed
    Syntax,
    /// Well-formed source using something outside the supported fragment
    UnsupportedConstruct,
    /// IR text rejected by reconstruction
    MalformedIr,
    /// Evaluation, backend or configuration failure
    Internal,
}

impl Error {
    /// Create a codegen error with a message
    pub fn codegen(msg: impl Into<String>) -> Self {
        Error::CodegenError(msg.into())
    }

    /// Create a malformed-IR error for a given IR line
    pub fn malformed_ir(line: usize, msg: impl Into<String>) -> Self {
        Error::MalformedIr {
            line,
            message: msg.into(),
        }
    }

    /// Classify the error
    pub fn classify(&self) -> ErrorClass {
        match self {
            Error::SyntaxError { .. } | Error::UnexpectedToken { .. } | Error::UnexpectedEof => {
                ErrorClass::Syntax
            }

            Error::Unsupported { .. }
            | Error::UndefinedIdentifier { .. }
            | Error::Redeclaration { .. }
            | Error::NonConstantInitializer { .. } => ErrorClass::UnsupportedConstruct,

            Error::MalformedIr { .. } => ErrorClass::MalformedIr,

            Error::DivisionByZero
            | Error::EvalError(_)
            | Error::CodegenError(_)
            | Error::InvalidOptions(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Source location (line, column) of the error, if it has one
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            Error::SyntaxError { line, col, .. }
            | Error::UnexpectedToken { line, col, .. }
            | Error::Unsupported { line, col, .. }
            | Error::UndefinedIdentifier { line, col, .. }
            | Error::Redeclaration { line, col, .. }
            | Error::NonConstantInitializer { line, col, .. } => Some((*line, *col)),
            Error::MalformedIr { line, .. } => Some((*line, 1)),
            _ => None,
        }
    }
}

/// Result type for sysyc operations
pub type Result<T> = std::result::Result<T, Error>;
