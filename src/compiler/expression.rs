use super::{
	CompileResult, Compiler,
	rules::{BindPower, rule},
	signature::{Signature, SignatureKind},
	unit::{LocalName, UnitKind, VarScope, Variable},
};
use crate::{CompileErrorType, ModuleVarName, opcode::OpCode, scanner::TokenType};

impl<'a> Compiler<'a> {
	pub(crate) fn literal(&mut self, _can_assign: bool) -> CompileResult {
		let value = self.previous.value.clone();
		self.emit_load_constant(value)
	}

	pub(crate) fn boolean(&mut self, _can_assign: bool) -> CompileResult {
		let op = if self.previous.r#type == TokenType::True { OpCode::PushTrue } else { OpCode::PushFalse };
		self.write_op(op);
		Ok(())
	}

	pub(crate) fn null(&mut self, _can_assign: bool) -> CompileResult {
		self.write_op(OpCode::PushNull);
		Ok(())
	}

	pub(crate) fn parentheses(&mut self, _can_assign: bool) -> CompileResult {
		self.expression(BindPower::Lowest)?;
		self.consume(TokenType::RightParen, "')' after expression")
	}

	/// `"a %(b) c"` becomes `List.new()` filled with every part, then `join()`.
	pub(crate) fn string_interpolation(&mut self, _can_assign: bool) -> CompileResult {
		self.emit_load_core_var("List")?;
		self.emit_call(0, "new()")?;
		loop {
			self.literal(false)?;
			self.emit_call(1, "addCore_(_)")?;
			self.expression(BindPower::Lowest)?;
			self.emit_call(1, "addCore_(_)")?;
			if !self.match_token(TokenType::Interpolation)? {
				break;
			}
		}
		self.consume(TokenType::String, "string at the end of interpolation")?;
		self.literal(false)?;
		self.emit_call(1, "addCore_(_)")?;
		self.emit_call(0, "join()")
	}

	pub(crate) fn list_literal(&mut self, _can_assign: bool) -> CompileResult {
		self.emit_load_core_var("List")?;
		self.emit_call(0, "new()")?;
		loop {
			if self.check(TokenType::RightBracket) {
				break;
			}
			self.expression(BindPower::Lowest)?;
			self.emit_call(1, "addCore_(_)")?;
			if !self.match_token(TokenType::Comma)? {
				break;
			}
		}
		self.consume(TokenType::RightBracket, "']' after list elements")
	}

	pub(crate) fn map_literal(&mut self, _can_assign: bool) -> CompileResult {
		self.emit_load_core_var("Map")?;
		self.emit_call(0, "new()")?;
		loop {
			if self.check(TokenType::RightBrace) {
				break;
			}
			self.expression(BindPower::Unary)?;
			self.consume(TokenType::Colon, "':' after map key")?;
			self.expression(BindPower::Lowest)?;
			self.emit_call(2, "addCore_(_,_)")?;
			if !self.match_token(TokenType::Comma)? {
				break;
			}
		}
		self.consume(TokenType::RightBrace, "'}' after map entries")
	}

	/// `recv[args]` or `recv[args] = value`.
	pub(crate) fn subscript(&mut self, can_assign: bool) -> CompileResult {
		let mut sign = Signature::new(SignatureKind::Subscript, "", 0);
		self.process_arg_list(&mut sign)?;
		self.consume(TokenType::RightBracket, "']' after subscript arguments")?;
		if can_assign && self.match_token(TokenType::Assign)? {
			sign.kind = SignatureKind::SubscriptSetter;
			self.count_argument(&mut sign)?;
			self.expression(BindPower::Lowest)?;
		}
		self.emit_call_by_signature(&sign, OpCode::Call0)
	}

	/// `recv.name`, `recv.name(args)` or `recv.name = value`.
	pub(crate) fn call_entry(&mut self, can_assign: bool) -> CompileResult {
		self.consume(TokenType::Id, "method name after '.'")?;
		let name = self.previous.lexeme;
		self.emit_method_call(name, OpCode::Call0, can_assign)
	}

	pub(crate) fn infix_operator(&mut self, _can_assign: bool) -> CompileResult {
		let rule = rule(self.previous.r#type);
		let Some(id) = rule.id else {
			return Err(anyhow::anyhow!("Token {:?} is not an infix operator", self.previous.r#type).into());
		};
		self.expression(rule.lbp)?;
		self.emit_call_by_signature(&Signature::new(SignatureKind::Method, id, 1), OpCode::Call0)
	}

	pub(crate) fn unary_operator(&mut self, _can_assign: bool) -> CompileResult {
		let Some(id) = rule(self.previous.r#type).id else {
			return Err(anyhow::anyhow!("Token {:?} is not a prefix operator", self.previous.r#type).into());
		};
		self.expression(BindPower::Unary)?;
		self.emit_call(0, id)
	}

	pub(crate) fn logic_or(&mut self, _can_assign: bool) -> CompileResult {
		let placeholder = self.emit_placeholder(OpCode::Or);
		self.expression(BindPower::LogicOr)?;
		self.patch_placeholder(placeholder)
	}

	pub(crate) fn logic_and(&mut self, _can_assign: bool) -> CompileResult {
		let placeholder = self.emit_placeholder(OpCode::And);
		self.expression(BindPower::LogicAnd)?;
		self.patch_placeholder(placeholder)
	}

	/// `cond ? then : else`, the condition is already on the stack.
	pub(crate) fn condition(&mut self, _can_assign: bool) -> CompileResult {
		let false_branch = self.emit_placeholder(OpCode::JumpIfFalse);
		self.expression(BindPower::Lowest)?;
		self.consume(TokenType::Colon, "':' after true branch")?;
		let end = self.emit_placeholder(OpCode::Jump);
		self.patch_placeholder(false_branch)?;
		self.expression(BindPower::Lowest)?;
		self.patch_placeholder(end)
	}

	pub(crate) fn this(&mut self, _can_assign: bool) -> CompileResult {
		if self.enclosing_class_depth().is_none() {
			return Err(self.error(CompileErrorType::ThisOutsideMethod));
		}
		self.emit_load_this()
	}

	/// `super.name(args)`, or `super(args)` for the method being compiled.
	pub(crate) fn super_call(&mut self, can_assign: bool) -> CompileResult {
		let signature = self.class_bk().and_then(|bk| bk.signature);
		let Some(signature) = signature else {
			return Err(self.error(CompileErrorType::SuperOutsideMethod));
		};
		self.emit_load_this()?;
		if self.match_token(TokenType::Dot)? {
			self.consume(TokenType::Id, "method name after 'super.'")?;
			let name = self.previous.lexeme;
			self.emit_method_call(name, OpCode::Super0, can_assign)
		} else {
			self.emit_getter_method_call(&signature, OpCode::Super0)
		}
	}

	pub(crate) fn emit_load_this(&mut self) -> CompileResult {
		match self.resolve_local_or_upvalue(&LocalName::Receiver)? {
			Some(variable) => {
				self.emit_load_variable(variable);
				Ok(())
			}
			None => Err(self.error(CompileErrorType::ThisOutsideMethod)),
		}
	}

	/// Resolve a bare identifier: function call, local or upvalue, instance
	/// field, static field, implicit `this` method call, then module variable.
	pub(crate) fn id(&mut self, can_assign: bool) -> CompileResult {
		let name = self.previous.lexeme;
		let line = self.previous.line;
		let local = self.resolve_local_or_upvalue(&LocalName::Plain(name))?;

		if local.is_none() && self.check(TokenType::LeftParen) {
			let key = ModuleVarName::Function(name.to_string());
			let function = match self.module.var_index(&key) {
				Some(index) => Some(index),
				None if self.units.is_empty() => {
					return Err(self.error(CompileErrorType::UndefinedFunction(name.to_string())));
				}
				None if self.enclosing_class_depth().is_none() => Some(self.declare_forward(key, line)?),
				None => None,
			};
			if let Some(index) = function {
				self.write_op_short(OpCode::LoadModuleVar, index);
				self.advance()?;
				let mut sign = Signature::new(SignatureKind::Method, "call", 0);
				if !self.match_token(TokenType::RightParen)? {
					self.process_arg_list(&mut sign)?;
					self.consume(TokenType::RightParen, "')' after argument list")?;
				}
				return self.emit_call_by_signature(&sign, OpCode::Call0);
			}
		}

		if let Some(variable) = local {
			return self.emit_load_or_store_variable(can_assign, variable);
		}

		if let Some(class_depth) = self.enclosing_class_depth() {
			let (field, in_static, class) = match &self.unit_at(class_depth).class_bk {
				Some(bk) => (bk.fields.index_of(&name), bk.in_static, bk.name),
				None => (None, false, ""),
			};

			if let Some(field) = field {
				if in_static {
					return Err(self.error(CompileErrorType::FieldInStaticMethod(name.to_string())));
				}
				let is_read = !(can_assign && self.match_token(TokenType::Assign)?);
				if !is_read {
					self.expression(BindPower::Lowest)?;
				}
				// A method body reaches its receiver's fields directly.
				if self.units.len() == class_depth + 1 {
					let op = if is_read { OpCode::LoadThisField } else { OpCode::StoreThisField };
					self.write_op_byte(op, field);
				} else {
					self.emit_load_this()?;
					let op = if is_read { OpCode::LoadField } else { OpCode::StoreField };
					self.write_op_byte(op, field);
				}
				return Ok(());
			}

			let static_field = LocalName::StaticField { class, field: name };
			if let Some(variable) = self.resolve_local_or_upvalue(&static_field)? {
				return self.emit_load_or_store_variable(can_assign, variable);
			}

			if name.starts_with(|c: char| c.is_ascii_lowercase()) {
				self.emit_load_this()?;
				return self.emit_method_call(name, OpCode::Call0, can_assign);
			}
		}

		let index = match self.module.var_index(&ModuleVarName::Plain(name.to_string())) {
			Some(index) => index,
			None => match self.module.var_index(&ModuleVarName::Function(name.to_string())) {
				Some(index) => index,
				None => self.declare_forward(ModuleVarName::Plain(name.to_string()), line)?,
			},
		};
		self.emit_load_or_store_variable(can_assign, Variable { scope: VarScope::Module, index })
	}

	/// Count one more argument of `sign` against the argument limit.
	pub(crate) fn count_argument(&self, sign: &mut Signature<'a>) -> CompileResult {
		sign.arg_count += 1;
		if sign.arg_count > self.limits.max_args {
			let max = self.limits.max_args;
			return Err(self.error(CompileErrorType::LimitExceeded { what: "arguments", max }));
		}
		Ok(())
	}

	/// Compile comma separated arguments, counting them into `sign`.
	pub(crate) fn process_arg_list(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		loop {
			self.count_argument(sign)?;
			self.expression(BindPower::Lowest)?;
			if !self.match_token(TokenType::Comma)? {
				return Ok(());
			}
		}
	}

	/// Declare comma separated parameters in the current unit, counting them into `sign`.
	pub(crate) fn process_para_list(&mut self, sign: &mut Signature<'a>) -> CompileResult {
		loop {
			self.count_argument(sign)?;
			self.consume(TokenType::Id, "parameter name")?;
			self.declare_parameter(self.previous.lexeme)?;
			if !self.match_token(TokenType::Comma)? {
				return Ok(());
			}
		}
	}

	pub(crate) fn emit_call_by_signature(&mut self, sign: &Signature<'a>, op: OpCode) -> CompileResult {
		let index = self.intern_method(&sign.to_string())?;
		self.write_op_short(op.with_args(sign.arg_count)?, index);
		if op.is_super() {
			// Filled with the superclass when the class is created.
			let slot = self.add_constant(crate::Value::Null)?;
			self.write_short(slot);
		}
		Ok(())
	}

	/// Call `name` as a getter or method, with optional argument list and block argument.
	pub(crate) fn emit_getter_method_call(&mut self, sign: &Signature<'a>, op: OpCode) -> CompileResult {
		let mut new_sign = Signature::new(SignatureKind::Getter, sign.name, 0);

		if self.match_token(TokenType::LeftParen)? {
			new_sign.kind = SignatureKind::Method;
			if !self.match_token(TokenType::RightParen)? {
				self.process_arg_list(&mut new_sign)?;
				self.consume(TokenType::RightParen, "')' after argument list")?;
			}
		}

		if self.match_token(TokenType::LeftBrace)? {
			self.count_argument(&mut new_sign)?;
			new_sign.kind = SignatureKind::Method;
			self.push_unit(UnitKind::Function);
			let mut block_sign = Signature::new(SignatureKind::Method, "", 0);
			if !self.match_token(TokenType::LogicOr)? && self.match_token(TokenType::BitOr)? {
				self.process_para_list(&mut block_sign)?;
				self.consume(TokenType::BitOr, "'|' after block parameters")?;
			}
			self.cu_mut().function.arg_count = block_sign.arg_count;
			self.compile_body(false)?;
			self.end_compile_unit(format!("{new_sign} block"))?;
		}

		if sign.kind == SignatureKind::Construct {
			if new_sign.kind != SignatureKind::Method {
				return Err(self.error(CompileErrorType::SuperCallForm));
			}
			new_sign.kind = SignatureKind::Construct;
		}

		self.emit_call_by_signature(&new_sign, op)
	}

	/// Call `name` as a setter when followed by `=` in an assignable position.
	pub(crate) fn emit_method_call(&mut self, name: &'a str, op: OpCode, can_assign: bool) -> CompileResult {
		let mut sign = Signature::new(SignatureKind::Getter, name, 0);
		if can_assign && self.match_token(TokenType::Assign)? {
			sign.kind = SignatureKind::Setter;
			sign.arg_count = 1;
			self.expression(BindPower::Lowest)?;
			return self.emit_call_by_signature(&sign, op);
		}
		self.emit_getter_method_call(&sign, op)
	}
}
