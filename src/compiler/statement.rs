//! Declarations and statements, compiled by recursive descent.

use tracing::warn;

use super::{
	CompileResult, Compiler,
	rules::BindPower,
	signature::{Signature, SignatureKind},
	unit::{LocalName, Loop, UnitKind},
};
use crate::{CompileErrorType, ModuleVarName, Value, opcode::OpCode, scanner::TokenType};

impl<'a> Compiler<'a> {
	/// One declaration or statement, with its optional `;`.
	pub(crate) fn compile_program(&mut self) -> CompileResult {
		if self.match_token(TokenType::Class)? {
			self.compile_class_definition()?;
		} else if self.match_token(TokenType::Fun)? {
			self.compile_function_definition()?;
		} else if self.match_token(TokenType::Var)? {
			self.compile_var_definition()?;
		} else if self.match_token(TokenType::Import)? {
			self.compile_import()?;
		} else {
			self.compile_statement()?;
		}
		self.match_token(TokenType::Semicolon)?;
		Ok(())
	}

	fn compile_statement(&mut self) -> CompileResult {
		if self.match_token(TokenType::If)? {
			self.compile_if_statement()
		} else if self.match_token(TokenType::While)? {
			self.compile_while_statement()
		} else if self.match_token(TokenType::For)? {
			self.compile_for_statement()
		} else if self.match_token(TokenType::Return)? {
			self.compile_return()
		} else if self.match_token(TokenType::Break)? {
			self.compile_break()
		} else if self.match_token(TokenType::Continue)? {
			self.compile_continue()
		} else if self.match_token(TokenType::LeftBrace)? {
			self.enter_scope();
			self.compile_block()?;
			self.leave_scope();
			Ok(())
		} else {
			self.expression(BindPower::Lowest)?;
			self.write_op(OpCode::Pop);
			Ok(())
		}
	}

	/// Statements up to the closing `}`, the `{` already consumed.
	fn compile_block(&mut self) -> CompileResult {
		while !self.match_token(TokenType::RightBrace)? {
			if self.check(TokenType::Eof) {
				let found = self.found();
				return Err(self.error_at_current(CompileErrorType::Expected { expected: "'}' after block", found }));
			}
			self.compile_program()?;
		}
		Ok(())
	}

	/// A function or method body, returning `this` from a constructor and null otherwise.
	pub(crate) fn compile_body(&mut self, is_construct: bool) -> CompileResult {
		self.compile_block()?;
		if is_construct {
			self.write_op_byte(OpCode::LoadLocalVar, 0);
		} else {
			self.write_op(OpCode::PushNull);
		}
		self.write_op(OpCode::Return);
		Ok(())
	}

	fn compile_var_definition(&mut self) -> CompileResult {
		self.consume(TokenType::Id, "variable name")?;
		let name = self.previous.lexeme;
		if self.check(TokenType::Comma) {
			return Err(self.error_at_current(CompileErrorType::SingleVariableOnly));
		}

		if self.match_token(TokenType::Assign)? {
			self.expression(BindPower::Lowest)?;
		} else {
			self.write_op(OpCode::PushNull);
		}
		let index = self.declare_variable(name)?;
		self.define_variable(index);
		Ok(())
	}

	fn compile_function_definition(&mut self) -> CompileResult {
		if !self.units.is_empty() || self.cu().scope_depth != -1 {
			return Err(self.error(CompileErrorType::FunNotInModuleScope));
		}
		self.consume(TokenType::Id, "function name")?;
		let name = self.previous.lexeme;
		// Bound before the body so the function can call itself.
		let index = self.define_module_var(ModuleVarName::Function(name.to_string()))?;

		self.push_unit(UnitKind::Function);
		let mut sign = Signature::new(SignatureKind::Method, name, 0);
		self.consume(TokenType::LeftParen, "'(' after function name")?;
		if !self.match_token(TokenType::RightParen)? {
			self.process_para_list(&mut sign)?;
			self.consume(TokenType::RightParen, "')' after parameter list")?;
		}
		self.cu_mut().function.arg_count = sign.arg_count;
		self.consume(TokenType::LeftBrace, "'{' before function body")?;
		self.compile_body(false)?;
		self.end_compile_unit(format!("fun {name}"))?;
		self.define_variable(index);
		Ok(())
	}

	/// `import name [for a, b]`, loaded at run time through `System`.
	fn compile_import(&mut self) -> CompileResult {
		self.consume(TokenType::Id, "module name after 'import'")?;
		let module = self.previous.lexeme;
		if self.check(TokenType::Dot) {
			self.advance()?;
			self.consume(TokenType::Id, "file extension")?;
			warn!(module, extension = self.previous.lexeme, "imported module needs no extension, ignoring it");
		}
		let module_constant = self.add_constant(Value::Str(module.into()))?;

		self.emit_load_core_var("System")?;
		self.write_op_short(OpCode::LoadConstant, module_constant);
		self.emit_call(1, "importModule(_)")?;
		self.write_op(OpCode::Pop);

		if !self.match_token(TokenType::For)? {
			return Ok(());
		}
		loop {
			self.consume(TokenType::Id, "variable name after 'for' in import")?;
			let name = self.previous.lexeme;
			let var_constant = self.add_constant(Value::Str(name.into()))?;
			self.emit_load_core_var("System")?;
			self.write_op_short(OpCode::LoadConstant, module_constant);
			self.write_op_short(OpCode::LoadConstant, var_constant);
			self.emit_call(2, "getModuleVariable(_,_)")?;
			let index = self.declare_variable(name)?;
			self.define_variable(index);
			if !self.match_token(TokenType::Comma)? {
				return Ok(());
			}
		}
	}

	fn compile_if_statement(&mut self) -> CompileResult {
		self.consume(TokenType::LeftParen, "'(' after 'if'")?;
		self.expression(BindPower::Lowest)?;
		self.consume(TokenType::RightParen, "')' after if condition")?;

		let false_branch = self.emit_placeholder(OpCode::JumpIfFalse);
		self.compile_statement()?;
		if self.match_token(TokenType::Else)? {
			let end = self.emit_placeholder(OpCode::Jump);
			self.patch_placeholder(false_branch)?;
			self.compile_statement()?;
			self.patch_placeholder(end)
		} else {
			self.patch_placeholder(false_branch)
		}
	}

	fn enter_loop(&mut self) {
		let cond_start = self.code_len();
		let scope_depth = self.cu().scope_depth;
		let entered = Loop { cond_start, scope_depth, exit_index: 0, break_jumps: Vec::new() };
		self.cu_mut().loops.push(entered);
	}

	fn compile_loop_body(&mut self, exit_index: usize) -> CompileResult {
		if let Some(current) = self.cu_mut().loops.last_mut() {
			current.exit_index = exit_index;
		}
		self.compile_statement()
	}

	/// Jump back to the condition, then point the exit and every `break` past the loop.
	fn leave_loop(&mut self) -> CompileResult {
		let Some(current) = self.cu_mut().loops.pop() else {
			return Err(anyhow::anyhow!("Leaving a loop that was never entered").into());
		};
		self.emit_loop_back(current.cond_start)?;
		self.patch_placeholder(current.exit_index)?;
		for jump in current.break_jumps {
			self.patch_placeholder(jump)?;
		}
		Ok(())
	}

	fn emit_loop_back(&mut self, cond_start: usize) -> CompileResult {
		let offset = self.code_len() + 3 - cond_start;
		if offset > u16::MAX as usize {
			return Err(self.error(CompileErrorType::JumpTooFar));
		}
		self.write_op_short(OpCode::Loop, offset);
		Ok(())
	}

	fn compile_while_statement(&mut self) -> CompileResult {
		self.enter_loop();
		self.consume(TokenType::LeftParen, "'(' after 'while'")?;
		self.expression(BindPower::Lowest)?;
		self.consume(TokenType::RightParen, "')' after while condition")?;

		let exit = self.emit_placeholder(OpCode::JumpIfFalse);
		self.compile_loop_body(exit)?;
		self.leave_loop()
	}

	/// `for i (sequence) body`, driven by `sequence.iterate(iter)` and
	/// `sequence.iteratorValue(iter)`.
	fn compile_for_statement(&mut self) -> CompileResult {
		self.enter_scope();
		self.consume(TokenType::Id, "loop variable after 'for'")?;
		let name = self.previous.lexeme;
		self.check_identifier(name)?;

		self.consume(TokenType::LeftParen, "'(' before sequence")?;
		self.expression(BindPower::Lowest)?;
		self.consume(TokenType::RightParen, "')' after sequence")?;
		let seq = self.add_local(LocalName::Hidden("seq"))?;
		self.write_op(OpCode::PushNull);
		let iter = self.add_local(LocalName::Hidden("iter"))?;

		self.enter_loop();
		self.write_op_byte(OpCode::LoadLocalVar, seq);
		self.write_op_byte(OpCode::LoadLocalVar, iter);
		self.emit_call(1, "iterate(_)")?;
		self.write_op_byte(OpCode::StoreLocalVar, iter);
		let exit = self.emit_placeholder(OpCode::JumpIfFalse);

		self.write_op_byte(OpCode::LoadLocalVar, seq);
		self.write_op_byte(OpCode::LoadLocalVar, iter);
		self.emit_call(1, "iteratorValue(_)")?;

		self.enter_scope();
		self.add_local(LocalName::Plain(name))?;
		self.compile_loop_body(exit)?;
		self.leave_scope();

		self.leave_loop()?;
		self.leave_scope();
		Ok(())
	}

	fn compile_return(&mut self) -> CompileResult {
		if matches!(self.current.r#type, TokenType::RightBrace | TokenType::Semicolon | TokenType::Eof) {
			self.write_op(OpCode::PushNull);
		} else {
			self.expression(BindPower::Lowest)?;
		}
		self.write_op(OpCode::Return);
		Ok(())
	}

	/// Locals declared inside the loop body are dropped before jumping out.
	fn compile_break(&mut self) -> CompileResult {
		let Some(depth) = self.cu().loops.last().map(|current| current.scope_depth + 1) else {
			return Err(self.error(CompileErrorType::BreakOutsideLoop));
		};
		self.discard_locals(depth);
		let jump = self.emit_placeholder(OpCode::Jump);
		if let Some(current) = self.cu_mut().loops.last_mut() {
			current.break_jumps.push(jump);
		}
		Ok(())
	}

	fn compile_continue(&mut self) -> CompileResult {
		let Some((depth, cond_start)) =
			self.cu().loops.last().map(|current| (current.scope_depth + 1, current.cond_start))
		else {
			return Err(self.error(CompileErrorType::ContinueOutsideLoop));
		};
		self.discard_locals(depth);
		self.emit_loop_back(cond_start)
	}
}
