/// Scanner related errors
#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
	/// Internal compiler error, should never happen
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	/// Errors encountered during scanning
	#[error(transparent)]
	ScanError(#[from] ScanError),
}

/// A specific scanning error with line number and type.
#[derive(thiserror::Error, Debug)]
#[error("line {line}: {type}")]
pub struct ScanError {
	/// The line number where the error occurred.
	pub line:   u32,
	/// The type of scanning error.
	pub r#type: ScanErrorType,
}

impl ScanError {
	pub fn new(line: u32, r#type: ScanErrorType) -> Self { Self { line, r#type } }
}

/// Types of scanning errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanErrorType {
	/// Error for unterminated block comments.
	UnterminatedBlockComment,
	/// Error for unexpected characters.
	UnexpectedCharacter(char),
	/// Error for unterminated strings.
	UnterminatedString,
	/// Backslash followed by an unsupported character.
	InvalidEscape(char),
	/// `\u` not followed by four hex digits.
	InvalidUnicodeEscape,
	/// `\u` escape naming a surrogate.
	InvalidCodePoint(u32),
	/// `%` in a string not followed by `(`.
	InterpolationWithoutParen,
	/// `%(` inside an interpolated expression.
	NestedInterpolation,
	/// Numeric literal whose digits do not fit its radix.
	InvalidNumber(String),
}

impl std::fmt::Display for ScanErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ScanErrorType::*;
		match self {
			UnterminatedBlockComment => {
				write!(f, "Unterminated block comment")
			}
			UnexpectedCharacter(c) => {
				write!(f, "Unexpected character '{c}'")
			}
			UnterminatedString => {
				write!(f, "Unterminated string")
			}
			InvalidEscape(c) => {
				write!(f, "Unsupported escape '\\{c}'")
			}
			InvalidUnicodeEscape => {
				write!(f, "Expected four hex digits after '\\u'")
			}
			InvalidCodePoint(code) => {
				write!(f, "Invalid unicode code point {code:#06x}")
			}
			InterpolationWithoutParen => {
				write!(f, "Expected '(' after '%'")
			}
			NestedInterpolation => {
				write!(f, "Interpolation can not be nested")
			}
			InvalidNumber(literal) => {
				write!(f, "Invalid number literal '{literal}'")
			}
		}
	}
}
