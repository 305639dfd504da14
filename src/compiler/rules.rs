//! The binding rules driving the Pratt parser.
//!
//! Each token kind has a left binding power, a `nud` run when the token starts
//! an expression, a `led` run when it continues one, and a method signature
//! parser used when the token names a method in a class body.

use super::{CompileResult, Compiler, signature::Signature};
use crate::{CompileErrorType, scanner::TokenType};

/// Binding powers from loosest to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum BindPower {
	None,
	Lowest,
	Assign,
	Condition,
	LogicOr,
	LogicAnd,
	Equal,
	Is,
	Cmp,
	BitOr,
	BitAnd,
	BitShift,
	Range,
	Term,
	Factor,
	Unary,
	Call,
}

/// `nud` or `led`, the flag tells whether the position may be assigned to.
pub(crate) type DenotationFn<'a> = fn(&mut Compiler<'a>, bool) -> CompileResult;
pub(crate) type MethodSignatureFn<'a> = fn(&mut Compiler<'a>, &mut Signature<'a>) -> CompileResult;

pub(crate) struct SymbolBindRule<'a> {
	/// Method name of an operator token.
	pub id:          Option<&'static str>,
	pub lbp:         BindPower,
	pub nud:         Option<DenotationFn<'a>>,
	pub led:         Option<DenotationFn<'a>>,
	pub method_sign: Option<MethodSignatureFn<'a>>,
}

impl<'a> SymbolBindRule<'a> {
	fn unused() -> Self { Self { id: None, lbp: BindPower::None, nud: None, led: None, method_sign: None } }

	fn prefix(nud: DenotationFn<'a>) -> Self { Self { nud: Some(nud), ..Self::unused() } }

	fn infix(lbp: BindPower, led: DenotationFn<'a>) -> Self { Self { lbp, led: Some(led), ..Self::unused() } }

	fn prefix_operator(id: &'static str) -> Self {
		Self {
			id: Some(id),
			nud: Some(Compiler::unary_operator),
			method_sign: Some(Compiler::unary_method_signature),
			..Self::unused()
		}
	}

	fn infix_operator(id: &'static str, lbp: BindPower) -> Self {
		Self {
			id: Some(id),
			lbp,
			led: Some(Compiler::infix_operator),
			method_sign: Some(Compiler::infix_method_signature),
			..Self::unused()
		}
	}

	/// Both a prefix and an infix operator, like `-`.
	fn mix_operator(id: &'static str) -> Self {
		Self {
			id: Some(id),
			lbp: BindPower::Term,
			nud: Some(Compiler::unary_operator),
			led: Some(Compiler::infix_operator),
			method_sign: Some(Compiler::mix_method_signature),
		}
	}
}

#[rustfmt::skip]
pub(crate) fn rule<'a>(r#type: TokenType) -> SymbolBindRule<'a> {
	use BindPower as Bp;
	use TokenType::*;
	match r#type {
		Num | String => SymbolBindRule::prefix(Compiler::literal),
		Id => SymbolBindRule { method_sign: Some(Compiler::id_method_signature), ..SymbolBindRule::prefix(Compiler::id) },
		Interpolation => SymbolBindRule::prefix(Compiler::string_interpolation),
		True | False => SymbolBindRule::prefix(Compiler::boolean),
		Null => SymbolBindRule::prefix(Compiler::null),
		This => SymbolBindRule::prefix(Compiler::this),
		Super => SymbolBindRule::prefix(Compiler::super_call),
		Is => SymbolBindRule::infix_operator("is", Bp::Is),
		LeftParen => SymbolBindRule::prefix(Compiler::parentheses),
		LeftBracket => SymbolBindRule {
			id:          None,
			lbp:         Bp::Call,
			nud:         Some(Compiler::list_literal),
			led:         Some(Compiler::subscript),
			method_sign: Some(Compiler::subscript_method_signature),
		},
		LeftBrace => SymbolBindRule::prefix(Compiler::map_literal),
		Dot => SymbolBindRule::infix(Bp::Call, Compiler::call_entry),
		DotDot => SymbolBindRule::infix_operator("..", Bp::Range),
		Add => SymbolBindRule::infix_operator("+", Bp::Term),
		Sub => SymbolBindRule::mix_operator("-"),
		Mul => SymbolBindRule::infix_operator("*", Bp::Factor),
		Div => SymbolBindRule::infix_operator("/", Bp::Factor),
		Mod => SymbolBindRule::infix_operator("%", Bp::Factor),
		BitAnd => SymbolBindRule::infix_operator("&", Bp::BitAnd),
		BitOr => SymbolBindRule::infix_operator("|", Bp::BitOr),
		BitNot => SymbolBindRule::prefix_operator("~"),
		BitShiftRight => SymbolBindRule::infix_operator(">>", Bp::BitShift),
		BitShiftLeft => SymbolBindRule::infix_operator("<<", Bp::BitShift),
		LogicAnd => SymbolBindRule::infix(Bp::LogicAnd, Compiler::logic_and),
		LogicOr => SymbolBindRule::infix(Bp::LogicOr, Compiler::logic_or),
		LogicNot => SymbolBindRule::prefix_operator("!"),
		Equal => SymbolBindRule::infix_operator("==", Bp::Equal),
		NotEqual => SymbolBindRule::infix_operator("!=", Bp::Equal),
		Greater => SymbolBindRule::infix_operator(">", Bp::Cmp),
		GreaterEqual => SymbolBindRule::infix_operator(">=", Bp::Cmp),
		Less => SymbolBindRule::infix_operator("<", Bp::Cmp),
		LessEqual => SymbolBindRule::infix_operator("<=", Bp::Cmp),
		Question => SymbolBindRule::infix(Bp::Condition, Compiler::condition),
		_ => SymbolBindRule::unused(),
	}
}

impl<'a> Compiler<'a> {
	/// Compile an expression binding tighter than `rbp`.
	pub(crate) fn expression(&mut self, rbp: BindPower) -> CompileResult {
		let Some(nud) = rule(self.current.r#type).nud else {
			return Err(self.error_at_current(CompileErrorType::ExpectedExpression(self.found())));
		};
		self.advance()?;
		let can_assign = rbp < BindPower::Assign;
		nud(self, can_assign)?;

		while rbp < rule(self.current.r#type).lbp {
			self.advance()?;
			if let Some(led) = rule(self.previous.r#type).led {
				led(self, can_assign)?;
			}
		}

		// An `=` left over here followed something that can not be assigned.
		if can_assign && self.check(TokenType::Assign) {
			return Err(self.error_at_current(CompileErrorType::InvalidAssignment));
		}
		Ok(())
	}
}
