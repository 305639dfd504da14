//! Turns sparrow source text into tokens, one at a time.
//!
//! The parser pulls tokens on demand and never holds more than `current` and
//! `previous`, so the scanner keeps all the lexical state itself: the cursor,
//! the line counter, and how many closing parentheses are still owed to an
//! open string interpolation.
//!
//! We can’t easily detect a `reserved word` until we’ve reached the end of what
//! might instead be an identifier, this is `maximal munch`. The same rule picks
//! `==` over `=` and `>>` over `>`.
//!
//! String interpolation `"a %(b) c"` is scanned as `Interpolation("a ")`, the
//! tokens of `b`, then `String(" c")`: the `)` matching `%(` resumes string
//! scanning instead of producing a `RightParen`.
mod token;

use std::{iter::Peekable, rc::Rc, str::CharIndices};

use TokenType::*;
use anyhow::Context;
pub(crate) use token::*;

use crate::{
	Diagnostic, DiagnosticKind, ScanError, ScanErrorType, ScannerError, SparrowError, object::Value,
};

/// A scanner for sparrow source code
pub(crate) struct Scanner<'a> {
	/// User input source code
	source:               &'a str,
	/// User input source code iterator
	source_iter:          Peekable<CharIndices<'a>>,
	/// Points at the beginning of the current lexeme
	start:                usize,
	/// Points at the character currently being considered
	cursor:               usize,
	/// Tracks what source line `current` is on so we can produce tokens that know
	/// their location.
	line:                 u32,
	/// Right parentheses still expected by the open interpolation, 0 outside one
	interpolation_parens: usize,
}

impl<'a> Scanner<'a> {
	pub fn new(source: &'a str) -> Self {
		let source_iter = source.char_indices().peekable();

		Self { source, source_iter, start: 0, cursor: 0, line: 1, interpolation_parens: 0 }
	}

	/// Scan all tokens from the source code, the last one is always `Eof`
	pub fn scan_tokens(&mut self, file: &str) -> Result<Vec<Token<'a>>, SparrowError> {
		let mut tokens = Vec::new();
		let mut diagnostics = Vec::new();
		loop {
			match self.next_token() {
				Ok(token) => {
					let eof = token.r#type == Eof;
					tokens.push(token);
					if eof {
						break;
					}
				}
				Err(ScannerError::ScanError(e)) => diagnostics.push(Diagnostic {
					file:          file.to_string(),
					line:          e.line,
					kind:          DiagnosticKind::Lex(e.r#type),
					imported_from: None,
				}),
				Err(ScannerError::InternalError(e)) => return Err(e.into()),
			}
		}
		if !diagnostics.is_empty() {
			return Err(SparrowError::CompileErrors(diagnostics));
		}
		Ok(tokens)
	}

	/// Scan the next token, returning `Eof` forever once the source is exhausted.
	///
	/// After an error the cursor has moved past the offending text, so calling
	/// again continues with the following token.
	pub fn next_token(&mut self) -> Result<Token<'a>, ScannerError> {
		self.skip_blanks()?;
		// We are at the beginning of the next lexeme.
		self.start = self.source_iter.peek().map_or(self.source.len(), |&(index, _)| index);
		self.cursor = self.start;
		let line = self.line;

		let Some(next_char) = self.advance() else { return Ok(Token::new(Eof, "", line)) };
		#[rustfmt::skip]
		let r#type = match next_char {
			',' => Comma,
			':' => Colon,
			';' => Semicolon,
			'[' => LeftBracket,
			']' => RightBracket,
			'{' => LeftBrace,
			'}' => RightBrace,
			'+' => Add,
			'-' => Sub,
			'*' => Mul,
			'/' => Div,
			'%' => Mod,
			'~' => BitNot,
			'?' => Question,
			'(' => {
				if self.interpolation_parens > 0 { self.interpolation_parens += 1; }
				LeftParen
			}
			')' => {
				if self.interpolation_parens > 0 {
					self.interpolation_parens -= 1;
					if self.interpolation_parens == 0 { return self.string(line); }
				}
				RightParen
			}
			'.' => if self.match_next('.') { DotDot } else { Dot },
			'=' => if self.match_next('=') { Equal } else { Assign },
			'&' => if self.match_next('&') { LogicAnd } else { BitAnd },
			'|' => if self.match_next('|') { LogicOr } else { BitOr },
			'!' => if self.match_next('=') { NotEqual } else { LogicNot },
			'>' => if self.match_next('=') { GreaterEqual } else if self.match_next('>') { BitShiftRight } else { Greater },
			'<' => if self.match_next('=') { LessEqual } else if self.match_next('<') { BitShiftLeft } else { Less },
			'"' => return self.string(line),
			c if c.is_ascii_digit() => return self.number(c, line),
			c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
			_ => return Err(ScanError::new(line, ScanErrorType::UnexpectedCharacter(next_char)).into()),
		};

		Ok(Token::new(r#type, self.lexeme(), line))
	}

	/// Skip whitespace, `//` and `/* */` comments and `#!` lines
	fn skip_blanks(&mut self) -> Result<(), ScannerError> {
		loop {
			match self.peek() {
				Some('\n') => {
					self.line += 1;
					self.advance();
				}
				Some(c) if c.is_whitespace() => {
					self.advance();
				}
				Some('/') if self.peek_second() == Some('/') => self.skip_line(),
				Some('#') if self.peek_second() == Some('!') => self.skip_line(),
				Some('/') if self.peek_second() == Some('*') => {
					let line = self.line;
					self.advance(); // consume '/'
					self.advance(); // consume '*'
					let mut closed = false;
					while let Some(c) = self.advance() {
						if c == '*' && self.match_next('/') {
							closed = true;
							break;
						}
						if c == '\n' {
							self.line += 1;
						}
					}
					if !closed {
						return Err(ScanError::new(line, ScanErrorType::UnterminatedBlockComment).into());
					}
				}
				_ => return Ok(()),
			}
		}
	}

	/// Skip up to, not including, the next newline
	fn skip_line(&mut self) {
		while self.peek().is_some_and(|c| c != '\n') {
			self.advance();
		}
	}

	/// Match the next character if it is the expected one
	fn match_next(&mut self, expected: char) -> bool {
		matches!(self.peek(), Some(c) if c == expected && { self.advance(); true })
	}

	/// Advance to the next character
	fn advance(&mut self) -> Option<char> {
		let (i, c) = self.source_iter.next()?;
		self.cursor = i + c.len_utf8();
		Some(c)
	}

	/// Peek the current character
	fn peek(&mut self) -> Option<char> { self.source_iter.peek().map(|&(_, c)| c) }

	/// Peek the second character ahead
	fn peek_second(&mut self) -> Option<char> {
		let mut it = self.source_iter.clone();
		it.next()?;
		it.peek().map(|&(_, c)| c)
	}

	fn lexeme(&self) -> &'a str { &self.source[self.start..self.cursor] }

	/// Scan the body of a string literal up to the closing `"` or the next `%(`
	fn string(&mut self, line: u32) -> Result<Token<'a>, ScannerError> {
		let mut value = std::string::String::new();
		let r#type = loop {
			let Some(c) = self.advance() else {
				return Err(ScanError::new(line, ScanErrorType::UnterminatedString).into());
			};
			match c {
				'"' => break String,
				'%' => {
					if !self.match_next('(') {
						return Err(self.string_error(ScanErrorType::InterpolationWithoutParen));
					}
					if self.interpolation_parens > 0 {
						return Err(self.string_error(ScanErrorType::NestedInterpolation));
					}
					self.interpolation_parens = 1;
					break Interpolation;
				}
				'\\' => match self.escape() {
					Ok(escaped) => value.push(escaped),
					Err(r#type) => return Err(self.string_error(r#type)),
				},
				'\n' => {
					self.line += 1;
					value.push(c);
				}
				c => value.push(c),
			}
		};

		Ok(Token::with_value(r#type, self.lexeme(), line, Value::Str(Rc::from(value))))
	}

	/// Decode the character after a backslash
	fn escape(&mut self) -> Result<char, ScanErrorType> {
		let c = self.advance().ok_or(ScanErrorType::UnterminatedString)?;
		Ok(match c {
			'0' => '\0',
			'a' => '\x07',
			'b' => '\x08',
			'f' => '\x0c',
			'n' => '\n',
			'r' => '\r',
			't' => '\t',
			'"' => '"',
			'\\' => '\\',
			'u' => return self.unicode_escape(),
			c => return Err(ScanErrorType::InvalidEscape(c)),
		})
	}

	/// Decode exactly four hex digits following `\u`
	fn unicode_escape(&mut self) -> Result<char, ScanErrorType> {
		let mut code = 0;
		for _ in 0..4 {
			let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or(ScanErrorType::InvalidUnicodeEscape)?;
			self.advance();
			code = code * 16 + digit;
		}
		char::from_u32(code).ok_or(ScanErrorType::InvalidCodePoint(code))
	}

	/// Build a string error and skip what is left of the literal
	fn string_error(&mut self, r#type: ScanErrorType) -> ScannerError {
		let line = self.line;
		while let Some(c) = self.advance() {
			match c {
				'"' => break,
				'\\' => {
					if self.advance() == Some('\n') {
						self.line += 1;
					}
				}
				'\n' => self.line += 1,
				_ => {}
			}
		}
		ScanError::new(line, r#type).into()
	}

	/// Scan a number literal
	fn number(&mut self, first: char, line: u32) -> Result<Token<'a>, ScannerError> {
		let value = if first == '0' && self.match_next('x') {
			while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
				self.advance();
			}
			self.integer(2, 16, line)?
		} else if first == '0' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
			while self.peek().is_some_and(|c| c.is_ascii_digit()) {
				self.advance();
			}
			self.integer(1, 8, line)?
		} else {
			while self.peek().is_some_and(|c| c.is_ascii_digit()) {
				self.advance();
			}

			// Look for a fractional part.
			if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
				self.advance(); // consume '.'
				while self.peek().is_some_and(|c| c.is_ascii_digit()) {
					self.advance();
				}
			}

			self.lexeme().parse().context("Failed to parse number literal")?
		};

		Ok(Token::with_value(Num, self.lexeme(), line, Value::Num(value)))
	}

	/// Parse the digits of the current lexeme after `prefix` bytes in `radix`
	fn integer(&self, prefix: usize, radix: u32, line: u32) -> Result<f64, ScannerError> {
		let digits = &self.source[self.start + prefix..self.cursor];
		let value = i64::from_str_radix(digits, radix)
			.map_err(|_| ScanError::new(line, ScanErrorType::InvalidNumber(self.lexeme().to_string())))?;
		Ok(value as f64)
	}

	/// Scan an identifier or keyword
	fn identifier(&mut self) -> TokenType {
		while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
			self.advance();
		}
		TokenType::keyword_or_identifier(self.lexeme())
	}
}

#[cfg(test)]
mod tests {
	use std::f64::consts::PI;

	use super::*;

	fn scan(input: &str, ok: bool) {
		let mut scanner = Scanner::new(input);
		let result = scanner.scan_tokens("test.sp");
		assert!(result.is_ok() == ok, "{input:?}");
	}

	fn types(input: &str) -> Vec<TokenType> {
		let mut scanner = Scanner::new(input);
		scanner.scan_tokens("test.sp").unwrap().into_iter().map(|t| t.r#type).collect()
	}

	fn string_value(token: &Token) -> std::string::String {
		match &token.value {
			Value::Str(s) => s.to_string(),
			other => panic!("not a string: {other:?}"),
		}
	}

	fn first_error(input: &str) -> ScanErrorType {
		let mut scanner = Scanner::new(input);
		match scanner.scan_tokens("test.sp") {
			Err(SparrowError::CompileErrors(diagnostics)) => match &diagnostics[0].kind {
				DiagnosticKind::Lex(r#type) => r#type.clone(),
				other => panic!("unexpected {other:?}"),
			},
			_ => panic!("expected scan error for {input:?}"),
		}
	}

	#[test]
	fn scan_tokens() {
		scan("", true);
		scan("(", true);
		scan("(){}[]", true);
		scan(" ( ) ", true);
		scan("@", false);
		scan("你好", false);
		scan(r#""世界""#, true);
		scan("12345", true);
		scan("user", true);
		scan("return", true);
		scan("#!/usr/bin/env sparrow\nvar a = 1", true);
		scan("# comment", false);
	}

	#[test]
	fn scan_operators() {
		assert_eq!(types("= == ! != < <= << > >= >>"), vec![
			Assign,
			Equal,
			LogicNot,
			NotEqual,
			Less,
			LessEqual,
			BitShiftLeft,
			Greater,
			GreaterEqual,
			BitShiftRight,
			Eof
		]);
		assert_eq!(types("& && | || ~ ? : . .. ;"), vec![
			BitAnd, LogicAnd, BitOr, LogicOr, BitNot, Question, Colon, Dot, DotDot, Semicolon, Eof
		]);
		assert_eq!(types("+-*/%"), vec![Add, Sub, Mul, Div, Mod, Eof]);
		assert_eq!(types("a===b"), vec![Id, Equal, Assign, Id, Eof]);
	}

	#[test]
	fn scan_numbers() {
		let mut scanner = Scanner::new("0 42 3.14 0x1F 017 1..2");
		let tokens = scanner.scan_tokens("test.sp").unwrap();
		let values: Vec<_> = tokens
			.iter()
			.filter_map(|t| match t.value {
				Value::Num(n) => Some(n),
				_ => None,
			})
			.collect();
		assert_eq!(values, vec![0.0, 42.0, 3.14, 31.0, 15.0, 1.0, 2.0]);
		assert_eq!(tokens[6].r#type, DotDot);
		scan("0x", false);
		scan("09", false);
	}

	#[test]
	fn scan_number_precision() {
		let mut scanner = Scanner::new("3.14159265358979323846264338327950288");
		let tokens = scanner.scan_tokens("test.sp").unwrap();
		assert!(matches!(tokens[0].value, Value::Num(n) if n == PI));
	}

	#[test]
	fn scan_strings() {
		scan(r#""""#, true);
		scan(r#""hello world""#, true);
		scan(r#""unterminated string"#, false);
		scan(r#""bad \q escape""#, false);

		let mut scanner = Scanner::new(r#""a\tb\n\"c\"\\\0\u4e16""#);
		let tokens = scanner.scan_tokens("test.sp").unwrap();
		assert_eq!(string_value(&tokens[0]), "a\tb\n\"c\"\\\0世");
	}

	#[test]
	fn scan_unicode_escapes() {
		assert_eq!(first_error(r#""\u12""#), ScanErrorType::InvalidUnicodeEscape);
		assert_eq!(first_error(r#""\u12g4""#), ScanErrorType::InvalidUnicodeEscape);
		assert_eq!(first_error(r#""\ud800""#), ScanErrorType::InvalidCodePoint(0xd800));
		assert_eq!(first_error(r#""\x""#), ScanErrorType::InvalidEscape('x'));
	}

	#[test]
	fn scan_error_recovers_after_string() {
		let mut scanner = Scanner::new("\"bad \\q\" var");
		assert!(scanner.next_token().is_err());
		assert_eq!(scanner.next_token().unwrap().r#type, Var);
	}

	#[test]
	fn scan_interpolation() {
		let mut scanner = Scanner::new(r#""a %(f(1) + 2) b %(c) d""#);
		let tokens = scanner.scan_tokens("test.sp").unwrap();
		let kinds: Vec<_> = tokens.iter().map(|t| t.r#type).collect();
		assert_eq!(kinds, vec![
			Interpolation,
			Id,
			LeftParen,
			Num,
			RightParen,
			Add,
			Num,
			Interpolation,
			Id,
			String,
			Eof
		]);
		assert_eq!(string_value(&tokens[0]), "a ");
		assert_eq!(string_value(&tokens[7]), " b ");
		assert_eq!(string_value(&tokens[9]), " d");

		assert_eq!(first_error(r#""100% sure""#), ScanErrorType::InterpolationWithoutParen);
		assert_eq!(first_error(r#""a %("b %(c)")""#), ScanErrorType::NestedInterpolation);
	}

	#[test]
	fn scan_keywords() {
		assert_eq!(
			types("var fun if else true false while for break continue return null class this static is super import"),
			vec![
				Var, Fun, If, Else, True, False, While, For, Break, Continue, Return, Null, Class, This, Static, Is,
				Super, Import, Eof
			]
		);
	}

	#[test]
	fn scan_identifiers() {
		assert_eq!(types("x _name myVariable123 snake_case CamelCase import1"), vec![Id, Id, Id, Id, Id, Id, Eof]);
	}

	#[test]
	fn scan_comments() {
		scan("// single line comment", true);
		scan("// comment with ()[]{}", true);
		scan("/* block comment */", true);
		scan("/** nested ** comment **/", true);
		scan("/* unterminated", false);
		assert_eq!(types("a /* x */ b // c"), vec![Id, Id, Eof]);
	}

	#[test]
	fn scan_lines() {
		let mut scanner = Scanner::new("a\n/* one\ntwo */ b\n\n// c\n\"x\ny\" d");
		let tokens = scanner.scan_tokens("test.sp").unwrap();
		let lines: Vec<_> = tokens.iter().map(|t| t.line).collect();
		assert_eq!(lines, vec![1, 3, 6, 7, 7]);
	}
}
