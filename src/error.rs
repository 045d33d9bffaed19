//! Error types shared by the tokenizer, the encoder and the resolution pass.
//!
//! Every failure is fatal to the assembly run: the value travels up to the
//! driver, which prints the single-line diagnostic and sets the exit status.
//! The library itself never prints or exits.

use std::fmt;

use itertools::Itertools;

use crate::tokenizer::Position;

/// Any error an assembly run can produce.
///
/// Lexical errors carry the position of the offending character, syntax
/// errors the position of the offending token. Resolution errors carry the
/// symbol name instead, since the referencing statement is no longer known
/// by the time the resolution pass runs.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyError {
    /// A character no token can start with.
    UnexpectedCharacter { position: Position },

    /// A numeric literal whose digits do not parse in the selected radix or
    /// that overflows 64 bits.
    InvalidNumber { position: Position },

    /// A string literal interrupted by a raw line break.
    UnterminatedString { position: Position },

    /// A token of the wrong kind where specific kinds were required.
    UnexpectedToken {
        position: Position,
        expected: &'static [&'static str],
    },

    /// A bare identifier in statement position that is not followed by the
    /// `:` of a label definition.
    UnexpectedIdentifier { name: String, position: Position },

    /// An operand form that is not a valid addressing mode in its position.
    InvalidAddressing { position: Position },

    /// A `+` offset that is neither a register nor a numeric literal.
    InvalidOffset { position: Position },

    /// A `%` directive the preprocessor does not know.
    UnknownDirective { name: String, position: Position },

    /// A deferred reference whose symbol was never defined.
    UndefinedSymbol {
        symbol: String,
        suggestion: Option<String>,
    },

    /// An included file that could not be read.
    MissingFile { path: String, position: Position },

    /// An included file that is already on the include stack.
    CircularInclude { path: String, position: Position },

    /// A source construct the architecture reserves but the assembler does
    /// not support.
    UnsupportedFeature {
        feature: &'static str,
        position: Position,
    },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblyError::UnexpectedCharacter { position } => {
                write!(f, "error at {}: unexpected character", position)
            }
            AssemblyError::InvalidNumber { position } => {
                write!(f, "error at {}: invalid numeric literal", position)
            }
            AssemblyError::UnterminatedString { position } => {
                write!(f, "error at {}: unexpected newline in string", position)
            }
            AssemblyError::UnexpectedToken { position, expected } => {
                write!(
                    f,
                    "error at {}: unexpected token, expected {}",
                    position,
                    expected.iter().join(" or "),
                )
            }
            AssemblyError::UnexpectedIdentifier { name, position } => {
                write!(f, "error at {}: unexpected identifier `{}`", position, name)
            }
            AssemblyError::InvalidAddressing { position } => {
                write!(f, "error at {}: invalid addressing", position)
            }
            AssemblyError::InvalidOffset { position } => {
                write!(f, "error at {}: invalid offset", position)
            }
            AssemblyError::UnknownDirective { name, position } => {
                write!(f, "error at {}: unknown directive `%{}`", position, name)
            }
            AssemblyError::UndefinedSymbol { symbol, suggestion } => {
                write!(f, "undefined symbol `{}`", symbol)?;

                if let Some(suggestion) = suggestion {
                    write!(f, ", did you mean `{}`?", suggestion)?;
                }

                Ok(())
            }
            AssemblyError::MissingFile { path, position } => {
                write!(f, "error at {}: cannot open included file `{}`", position, path)
            }
            AssemblyError::CircularInclude { path, position } => {
                write!(f, "error at {}: circular include of `{}`", position, path)
            }
            AssemblyError::UnsupportedFeature { feature, position } => {
                write!(f, "error at {}: unsupported feature: {}", position, feature)
            }
        }
    }
}

impl std::error::Error for AssemblyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_are_single_line() {
        let errors = vec![
            AssemblyError::UnexpectedCharacter {
                position: Position { line: 3, column: 7 },
            },
            AssemblyError::UnexpectedToken {
                position: Position { line: 1, column: 1 },
                expected: &["`]`", "`+`"],
            },
            AssemblyError::UndefinedSymbol {
                symbol: "stort".into(),
                suggestion: Some("start".into()),
            },
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.contains('\n'), "{:?}", rendered);
        }
    }

    #[test]
    fn expected_alternatives_are_joined() {
        let error = AssemblyError::UnexpectedToken {
            position: Position { line: 2, column: 5 },
            expected: &["a number", "a label"],
        };

        assert_eq!(
            error.to_string(),
            "error at 2:5: unexpected token, expected a number or a label",
        );
    }
}
