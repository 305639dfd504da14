//! Class definitions: fields, static fields and methods.

use std::collections::HashSet;

use tracing::trace;

use super::{
	CompileResult, Compiler,
	rules::{BindPower, rule},
	signature::{Signature, SignatureKind},
	unit::{LocalName, UnitKind},
};
use crate::{CompileErrorType, Value, opcode::OpCode, scanner::TokenType, symbol_table::SymbolTable};

/// What the compiler knows about the class whose body it is in.
#[derive(Debug)]
pub(crate) struct ClassBookKeep<'a> {
	pub name:             &'a str,
	pub fields:           SymbolTable<&'a str>,
	/// The method being compiled is static.
	pub in_static:        bool,
	pub instance_methods: HashSet<usize>,
	pub static_methods:   HashSet<usize>,
	/// Signature of the method being compiled, for a bare `super(...)`.
	pub signature:        Option<Signature<'a>>,
}

impl<'a> ClassBookKeep<'a> {
	fn new(name: &'a str) -> Self {
		Self {
			name,
			fields: SymbolTable::new(),
			in_static: false,
			instance_methods: HashSet::new(),
			static_methods: HashSet::new(),
			signature: None,
		}
	}
}

impl<'a> Compiler<'a> {
	/// Depth of the unit holding the innermost class body being compiled.
	pub(crate) fn enclosing_class_depth(&self) -> Option<usize> {
		(0..=self.units.len()).rev().find(|depth| self.unit_at(*depth).class_bk.is_some())
	}

	pub(crate) fn class_bk(&self) -> Option<&ClassBookKeep<'a>> {
		self.enclosing_class_depth().and_then(|depth| self.unit_at(depth).class_bk.as_ref())
	}

	fn class_bk_mut(&mut self) -> CompileResult<&mut ClassBookKeep<'a>> {
		let depth = self.enclosing_class_depth().ok_or_else(|| anyhow::anyhow!("Not inside a class body"))?;
		self.unit_at_mut(depth).class_bk.as_mut().ok_or_else(|| anyhow::anyhow!("Not inside a class body").into())
	}

	/// `class Name [< Super] { members }`, the `class` keyword already consumed.
	pub(crate) fn compile_class_definition(&mut self) -> CompileResult {
		if !self.units.is_empty() || self.cu().scope_depth != -1 {
			return Err(self.error(CompileErrorType::ClassNotInModuleScope));
		}
		self.consume(TokenType::Id, "class name")?;
		let name = self.previous.lexeme;
		let class_var = self.declare_variable(name)?;

		self.emit_load_constant(Value::Str(name.into()))?;
		if self.match_token(TokenType::Less)? {
			self.expression(BindPower::Call)?;
		} else {
			self.emit_load_core_var("Object")?;
		}
		// The field count is only known once the body is compiled.
		let field_count = self.write_op_byte(OpCode::CreateClass, 255);
		self.define_variable(class_var);
		trace!(class = name, "compiling class");

		self.cu_mut().class_bk = Some(ClassBookKeep::new(name));
		self.consume(TokenType::LeftBrace, "'{' after class name")?;
		// Static fields are locals of this scope, released at the closing brace.
		self.enter_scope();
		while !self.match_token(TokenType::RightBrace)? {
			if self.check(TokenType::Eof) {
				let found = self.found();
				return Err(self.error_at_current(CompileErrorType::Expected { expected: "'}' after class body", found }));
			}
			self.compile_class_member(class_var)?;
			self.match_token(TokenType::Semicolon)?;
		}

		self.leave_scope();
		let fields = self.class_bk_mut()?.fields.len();
		self.cu_mut().function.instr_stream[field_count] = fields as u8;
		self.cu_mut().class_bk = None;
		Ok(())
	}

	fn compile_class_member(&mut self, class_var: usize) -> CompileResult {
		let is_static = self.match_token(TokenType::Static)?;
		match (is_static, self.match_token(TokenType::Var)?) {
			(true, true) => self.compile_static_field(),
			(false, true) => self.compile_instance_field(),
			(_, false) => self.compile_method(class_var, is_static),
		}
	}

	fn compile_instance_field(&mut self) -> CompileResult {
		self.consume(TokenType::Id, "field name")?;
		let name = self.previous.lexeme;
		self.check_identifier(name)?;
		let max = self.limits.max_fields;
		let bk = self.class_bk_mut()?;
		if bk.fields.index_of(&name).is_some() {
			return Err(self.error(CompileErrorType::FieldRedefinition(name.to_string())));
		}
		if bk.fields.len() >= max {
			return Err(self.error(CompileErrorType::LimitExceeded { what: "fields", max }));
		}
		bk.fields.add(name);
		if self.check(TokenType::Assign) {
			return Err(self.error_at_current(CompileErrorType::InstanceFieldInitializer(name.to_string())));
		}
		Ok(())
	}

	/// A static field lives in a slot of the class body scope keyed by class and field.
	fn compile_static_field(&mut self) -> CompileResult {
		self.consume(TokenType::Id, "static field name")?;
		let field = self.previous.lexeme;
		self.check_identifier(field)?;
		let class = self.class_bk_mut()?.name;
		let name = LocalName::StaticField { class, field };
		if self.cu().find_local(&name).is_some() {
			return Err(self.error(CompileErrorType::StaticFieldRedefinition(field.to_string())));
		}

		if self.match_token(TokenType::Assign)? {
			self.expression(BindPower::Lowest)?;
		} else {
			self.write_op(OpCode::PushNull);
		}
		self.add_local(name)?;
		Ok(())
	}

	fn compile_method(&mut self, class_var: usize, is_static: bool) -> CompileResult {
		let Some(method_sign) = rule(self.current.r#type).method_sign else {
			return Err(self.error_at_current(CompileErrorType::MissingMethodSignature(self.found())));
		};
		self.class_bk_mut()?.in_static = is_static;
		self.advance()?;
		let mut sign = Signature::new(SignatureKind::Getter, self.previous.lexeme, 0);

		self.push_unit(UnitKind::Method);
		method_sign(self, &mut sign)?;
		if is_static && sign.kind == SignatureKind::Construct {
			return Err(self.error(CompileErrorType::StaticConstructor));
		}
		self.cu_mut().function.arg_count = sign.arg_count;
		self.consume(TokenType::LeftBrace, "'{' before method body")?;

		let index = self.declare_method(&sign, is_static)?;
		self.class_bk_mut()?.signature = Some(sign);
		self.compile_body(sign.kind == SignatureKind::Construct)?;
		trace!(signature = %sign, is_static, "compiled method");
		self.end_compile_unit(sign.to_string())?;
		self.class_bk_mut()?.signature = None;
		self.define_method(class_var, is_static, index);

		if sign.kind == SignatureKind::Construct {
			self.emit_create_instance(&sign, class_var, index)?;
		}
		Ok(())
	}

	/// Intern the method's signature, rejecting a second method with it.
	fn declare_method(&mut self, sign: &Signature<'a>, is_static: bool) -> CompileResult<usize> {
		let signature = sign.to_string();
		let index = self.intern_method(&signature)?;
		let bk = self.class_bk_mut()?;
		let methods = if is_static { &mut bk.static_methods } else { &mut bk.instance_methods };
		if !methods.insert(index) {
			let class = bk.name.to_string();
			return Err(self.error(CompileErrorType::MethodRedefinition { class, signature }));
		}
		Ok(index)
	}

	/// Bind the closure on top of the stack to the class as method `index`.
	fn define_method(&mut self, class_var: usize, is_static: bool, index: usize) {
		self.write_op_short(OpCode::LoadModuleVar, class_var);
		let op = if is_static { OpCode::StaticMethod } else { OpCode::InstanceMethod };
		self.write_op_short(op, index);
	}

	/// The static method behind a constructor: allocate, run the initializer, return the instance.
	fn emit_create_instance(&mut self, sign: &Signature<'a>, class_var: usize, index: usize) -> CompileResult {
		self.push_unit(UnitKind::Method);
		let cu = self.cu_mut();
		cu.function.arg_count = sign.arg_count;
		cu.adjust_stack(sign.arg_count as i32);

		self.write_op(OpCode::Construct);
		self.write_op_short(OpCode::Call0.with_args(sign.arg_count)?, index);
		self.write_op(OpCode::Return);
		self.end_compile_unit(format!("{sign} constructor"))?;
		self.define_method(class_var, true, index);
		Ok(())
	}

	/// `=(value)` after a setter name, returning whether it was there.
	fn try_setter(&mut self, sign: &mut Signature<'a>) -> CompileResult<bool> {
		if !self.match_token(TokenType::Assign)? {
			return Ok(false);
		}
		sign.kind = match sign.kind {
			SignatureKind::Subscript => SignatureKind::SubscriptSetter,
			_ => SignatureKind::Setter,
		};
		self.consume(TokenType::LeftParen, "'(' after '='")?;
		self.consume(TokenType::Id, "setter parameter name")?;
		self.declare_parameter(self.previous.lexeme)?;
		self.count_argument(sign)?;
		self.consume(TokenType::RightParen, "')' after setter parameter")?;
		Ok(true)
	}

	pub(crate) fn id_method_signature(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		sign.kind = SignatureKind::Getter;
		if sign.name == "new" {
			if !self.check(TokenType::LeftParen) {
				return Err(self.error_at_current(CompileErrorType::ConstructorNeedsParens));
			}
			sign.kind = SignatureKind::Construct;
		} else if self.try_setter(sign)? {
			return Ok(());
		}

		if self.match_token(TokenType::LeftParen)? {
			if sign.kind == SignatureKind::Getter {
				sign.kind = SignatureKind::Method;
			}
			if !self.match_token(TokenType::RightParen)? {
				self.process_para_list(sign)?;
				self.consume(TokenType::RightParen, "')' after parameter list")?;
			}
		}
		Ok(())
	}

	/// `!`, `~`: a getter on the operand.
	pub(crate) fn unary_method_signature(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		sign.kind = SignatureKind::Getter;
		Ok(())
	}

	/// `+(other)` and the other binary operators.
	pub(crate) fn infix_method_signature(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		sign.kind = SignatureKind::Method;
		self.consume(TokenType::LeftParen, "'(' after infix operator")?;
		self.consume(TokenType::Id, "parameter name")?;
		self.declare_parameter(self.previous.lexeme)?;
		self.consume(TokenType::RightParen, "')' after parameter")?;
		sign.arg_count = 1;
		Ok(())
	}

	/// `-` as negation without a parameter, subtraction with one.
	pub(crate) fn mix_method_signature(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		if self.check(TokenType::LeftParen) {
			self.infix_method_signature(sign)
		} else {
			self.unary_method_signature(sign)
		}
	}

	/// `[index]` or `[index]=(value)`.
	pub(crate) fn subscript_method_signature(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		sign.kind = SignatureKind::Subscript;
		sign.name = "";
		self.process_para_list(sign)?;
		self.consume(TokenType::RightBracket, "']' after subscript parameters")?;
		self.try_setter(sign)?;
		Ok(())
	}
}
