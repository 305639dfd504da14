use crate::object::Value;

/// A token produced by the scanner
#[derive(Debug, Clone)]
pub(crate) struct Token<'a> {
	pub r#type: TokenType,
	pub lexeme: &'a str,
	pub line:   u32,
	/// Decoded literal for numbers, strings and interpolation segments.
	pub value:  Value,
}

impl<'a> Token<'a> {
	pub fn new(r#type: TokenType, lexeme: &'a str, line: u32) -> Self { Self { r#type, lexeme, line, value: Value::Null } }

	pub fn with_value(r#type: TokenType, lexeme: &'a str, line: u32, value: Value) -> Self {
		Self { r#type, lexeme, line, value }
	}
}

/// The kinds of tokens in sparrow, used to index the binding rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TokenType {
	/// Number literal, decimal, `0x` hex or leading-zero octal.
	Num,
	/// String literal, or the tail of an interpolated string.
	String,
	/// Identifier, e.g. variable or method name.
	Id,
	/// String segment before a `%(` interpolation.
	Interpolation,
	Var,
	Fun,
	If,
	Else,
	True,
	False,
	While,
	For,
	Break,
	Continue,
	Return,
	Null,
	Class,
	This,
	Static,
	Is,
	Super,
	Import,
	/// Comma `,`.
	Comma,
	/// Colon `:`.
	Colon,
	/// Optional statement terminator `;`.
	Semicolon,
	LeftParen,
	RightParen,
	LeftBracket,
	RightBracket,
	LeftBrace,
	RightBrace,
	/// Member access `.`.
	Dot,
	/// Range `..`.
	DotDot,
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	/// Assignment `=`.
	Assign,
	BitAnd,
	BitOr,
	BitNot,
	BitShiftRight,
	BitShiftLeft,
	LogicAnd,
	LogicOr,
	LogicNot,
	Equal,
	NotEqual,
	Greater,
	GreaterEqual,
	Less,
	LessEqual,
	Question,
	/// End of file/input.
	Eof,
}

impl TokenType {
	pub fn keyword_or_identifier(value: &str) -> Self {
		match value {
			"var" => TokenType::Var,
			"fun" => TokenType::Fun,
			"if" => TokenType::If,
			"else" => TokenType::Else,
			"true" => TokenType::True,
			"false" => TokenType::False,
			"while" => TokenType::While,
			"for" => TokenType::For,
			"break" => TokenType::Break,
			"continue" => TokenType::Continue,
			"return" => TokenType::Return,
			"null" => TokenType::Null,
			"class" => TokenType::Class,
			"this" => TokenType::This,
			"static" => TokenType::Static,
			"is" => TokenType::Is,
			"super" => TokenType::Super,
			"import" => TokenType::Import,
			_ => TokenType::Id,
		}
	}

	/// Tokens that begin a declaration or statement, where error recovery may resume.
	pub fn starts_statement(self) -> bool {
		matches!(
			self,
			TokenType::Class
				| TokenType::Fun | TokenType::Var
				| TokenType::Import
				| TokenType::If | TokenType::While
				| TokenType::For | TokenType::Return
		)
	}
}
