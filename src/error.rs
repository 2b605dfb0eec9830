use thiserror::Error;

use crate::term::VarId;

/// A syntax error in rule-file or query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending input
    pub line: usize,
    /// 1-based column of the offending input
    pub column: usize,
    /// What the parser expected or rejected
    pub message: String,
}

impl ParseError {
    /// Builds an error at `offset` bytes into `source`.
    pub fn at_offset(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let consumed = &source[..offset.min(source.len())];
        let line = consumed.matches('\n').count() + 1;
        let line_start = consumed.rfind('\n').map_or(0, |nl| nl + 1);
        let column = consumed[line_start..].chars().count() + 1;
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Builds an error at column 1 of a 1-based `line`.
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: 1,
            message: message.into(),
        }
    }
}

/// Errors raised by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Rule or query text did not parse
    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    /// A substitution binds a variable to a term containing itself. Unification
    /// performs no occurs check, so this surfaces only when the bindings are
    /// fully applied.
    #[error("cyclic binding through variable {var}")]
    CyclicBinding {
        /// The variable found on its own expansion path
        var: VarId,
    },
}

/// Result alias for engine operations.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_maps_to_line_and_column() {
        let source = "Foo a.\nBar b c\n  Baz";
        let err = ParseError::at_offset(source, source.find("Baz").unwrap(), "expected '.'");
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 3);
        assert_eq!(err.to_string(), "3:3: expected '.'");
    }

    #[test]
    fn test_offset_on_first_line() {
        let err = ParseError::at_offset("Foo x", 4, "oops");
        assert_eq!((err.line, err.column), (1, 5));
    }
}
