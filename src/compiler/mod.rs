//! A single-pass compiler from sparrow source to stack bytecode.
//!
//! There is no syntax tree: the Pratt parser in [`rules`] and the recursive
//! descent statement compiler emit instructions into the innermost
//! [`unit::CompileUnit`] as soon as each construct is recognized. Forward
//! jumps are emitted with placeholder offsets and patched once their target
//! is known.
//!
//! |Binding power|Operators|Associates
//! --|--|--
//! Assign|= ?:|Right
//! LogicOr|\|\||Left
//! LogicAnd|&&|Left
//! Equal|== !=|Left
//! Is|is|Left
//! Cmp|< > <= >=|Left
//! BitOr|\||Left
//! BitAnd|&|Left
//! BitShift|<< >>|Left
//! Range|..|Left
//! Term|+ -|Left
//! Factor|* / %|Left
//! Unary|! - ~|Right
//! Call|. [] ()|Left
//!
//! Every operator compiles to a method call on its left operand, so `1 + 2`
//! is the call `1.+(2)` and the interpreter resolves it by signature.

mod class;
mod expression;
mod rules;
pub mod signature;
mod statement;
mod unit;

use std::rc::Rc;

use anyhow::anyhow;
use tracing::debug;
use unit::{CompileUnit, UnitKind};

use crate::{
	CompileErrorType, Diagnostic, DiagnosticKind, Limits, ModuleVar, ModuleVarName, ScannerError, SparrowError,
	error::compiler::{CompileError, ParserError},
	object::{FnObject, Module, Value},
	opcode::OpCode,
	scanner::{Scanner, Token, TokenType},
	symbol_table::SymbolTable,
	vm::Vm,
};

pub(crate) type CompileResult<T = ()> = Result<T, ParserError>;

/// File name reported for diagnostics in the core module.
pub(crate) const CORE_MODULE_FILE: &str = "core.script.inc";

/// Compile `source` into the body function of `module`.
///
/// Module variables the source declares are added to `module`; every
/// diagnostic found in the pass is returned together.
pub fn compile_module(vm: &mut Vm, module: &mut Module, source: &str) -> Result<Rc<FnObject>, SparrowError> {
	let file = module.name.clone().unwrap_or_else(|| CORE_MODULE_FILE.to_string());
	let imported_from = vm.compiling.last().cloned();
	vm.compiling.push(file.clone());
	let compiler = Compiler::new(source, file, imported_from, module, &mut vm.method_names, &vm.limits);
	let result = compiler.compile();
	vm.compiling.pop();
	result
}

/// Parser state for compiling one module.
pub(crate) struct Compiler<'a> {
	scanner:       Scanner<'a>,
	current:       Token<'a>,
	previous:      Token<'a>,
	file:          String,
	imported_from: Option<String>,
	module:        &'a mut Module,
	method_names:  &'a mut SymbolTable,
	limits:        &'a Limits,
	module_unit:   CompileUnit<'a>,
	/// Function and method units nested in the module, innermost last.
	units:         Vec<CompileUnit<'a>>,
	diagnostics:   Vec<Diagnostic>,
	/// Braces consumed and not yet closed, used to resynchronize after an error.
	open_braces:   usize,
}

impl<'a> Compiler<'a> {
	fn new(
		source: &'a str,
		file: String,
		imported_from: Option<String>,
		module: &'a mut Module,
		method_names: &'a mut SymbolTable,
		limits: &'a Limits,
	) -> Self {
		let module_unit = CompileUnit::new(UnitKind::Module, module.name.clone());
		Self {
			scanner: Scanner::new(source),
			current: Token::new(TokenType::Eof, "", 1),
			previous: Token::new(TokenType::Eof, "", 1),
			file,
			imported_from,
			module,
			method_names,
			limits,
			module_unit,
			units: Vec::new(),
			diagnostics: Vec::new(),
			open_braces: 0,
		}
	}

	fn compile(mut self) -> Result<Rc<FnObject>, SparrowError> {
		debug!(module = %self.file, "compiling module");
		let vars_before = self.module.var_count();

		let result = self.compile_declarations(vars_before);
		debug!(module = %self.file, diagnostics = self.diagnostics.len(), "compiled module");
		match result {
			Ok(()) if self.diagnostics.is_empty() => {
				let mut function = std::mem::take(&mut self.module_unit.function);
				function.name = "(script)".to_string();
				Ok(Rc::new(function))
			}
			// The module keeps nothing a failed compile declared, no code refers to it.
			Ok(()) => {
				self.module.truncate_vars(vars_before);
				Err(SparrowError::CompileErrors(self.diagnostics))
			}
			Err(e) => {
				self.module.truncate_vars(vars_before);
				Err(e.into())
			}
		}
	}

	fn compile_declarations(&mut self, vars_before: usize) -> anyhow::Result<()> {
		self.advance()?;
		while !self.match_token(TokenType::Eof)? {
			match self.compile_program() {
				Ok(()) => {}
				Err(ParserError::InternalError(e)) => return Err(e),
				Err(ParserError::CompileError(e)) => {
					self.report(e.line, DiagnosticKind::Compile(e.r#type));
					self.recover()?;
				}
			}
		}
		self.write_op(OpCode::PushNull);
		self.write_op(OpCode::Return);
		self.check_forward_declarations(vars_before);
		self.write_op(OpCode::End);
		Ok(())
	}

	/// Report module variables that were referenced but never declared.
	fn check_forward_declarations(&mut self, vars_before: usize) {
		let undefined: Vec<_> = (vars_before..self.module.var_count())
			.filter_map(|index| match (self.module.var_name(index), self.module.var(index)) {
				(Some(name), Some(ModuleVar::Forward { line })) => Some((name.clone(), *line)),
				_ => None,
			})
			.collect();
		for (name, line) in undefined {
			let r#type = match name {
				ModuleVarName::Plain(name) => CompileErrorType::UndefinedVariable(name),
				ModuleVarName::Function(name) => CompileErrorType::UndefinedFunction(name),
			};
			self.report(line, DiagnosticKind::Compile(r#type));
		}
	}

	fn report(&mut self, line: u32, kind: DiagnosticKind) {
		let diagnostic =
			Diagnostic { file: self.file.clone(), line, kind, imported_from: self.imported_from.clone() };
		debug!(%diagnostic, "compile error");
		self.diagnostics.push(diagnostic);
	}

	/// Drop the state of the item that failed and skip to where the next one starts.
	fn recover(&mut self) -> anyhow::Result<()> {
		self.units.clear();
		let unit = &mut self.module_unit;
		unit.class_bk = None;
		unit.loops.clear();
		unit.scope_depth = -1;
		unit.locals.clear();
		self.synchronize()
	}

	/// Skip to the next declaration or statement at module level. A statement
	/// keyword the error stopped on starts the next item itself.
	fn synchronize(&mut self) -> anyhow::Result<()> {
		while !self.check(TokenType::Eof) {
			if self.open_braces == 0 && self.current.r#type.starts_statement() {
				break;
			}
			self.advance()?;
			let closed = matches!(self.previous.r#type, TokenType::RightBrace | TokenType::Semicolon);
			if self.open_braces == 0 && closed {
				break;
			}
		}
		Ok(())
	}

	/// Move to the next token, recording lexical errors and skipping past them.
	fn advance(&mut self) -> anyhow::Result<()> {
		let next = loop {
			match self.scanner.next_token() {
				Ok(token) => break token,
				Err(ScannerError::ScanError(e)) => self.report(e.line, DiagnosticKind::Lex(e.r#type)),
				Err(ScannerError::InternalError(e)) => return Err(e),
			}
		};
		self.previous = std::mem::replace(&mut self.current, next);
		match self.previous.r#type {
			TokenType::LeftBrace => self.open_braces += 1,
			TokenType::RightBrace => self.open_braces = self.open_braces.saturating_sub(1),
			_ => {}
		}
		Ok(())
	}

	fn check(&self, r#type: TokenType) -> bool { self.current.r#type == r#type }

	fn match_token(&mut self, r#type: TokenType) -> anyhow::Result<bool> {
		if !self.check(r#type) {
			return Ok(false);
		}
		self.advance()?;
		Ok(true)
	}

	fn consume(&mut self, r#type: TokenType, expected: &'static str) -> CompileResult {
		if !self.match_token(r#type)? {
			return Err(self.error_at_current(CompileErrorType::Expected { expected, found: self.found() }));
		}
		Ok(())
	}

	/// The current lexeme, for error messages.
	fn found(&self) -> String {
		match self.current.r#type {
			TokenType::Eof => "end of file".to_string(),
			_ => self.current.lexeme.to_string(),
		}
	}

	fn error(&self, r#type: CompileErrorType) -> ParserError { CompileError::new(self.previous.line, r#type).into() }

	fn error_at_current(&self, r#type: CompileErrorType) -> ParserError {
		CompileError::new(self.current.line, r#type).into()
	}

	fn cu(&self) -> &CompileUnit<'a> { self.units.last().unwrap_or(&self.module_unit) }

	fn cu_mut(&mut self) -> &mut CompileUnit<'a> {
		match self.units.last_mut() {
			Some(unit) => unit,
			None => &mut self.module_unit,
		}
	}

	/// The unit at nesting `depth`, 0 being the module.
	fn unit_at(&self, depth: usize) -> &CompileUnit<'a> {
		match depth {
			0 => &self.module_unit,
			_ => &self.units[depth - 1],
		}
	}

	fn unit_at_mut(&mut self, depth: usize) -> &mut CompileUnit<'a> {
		match depth {
			0 => &mut self.module_unit,
			_ => &mut self.units[depth - 1],
		}
	}

	fn code_len(&self) -> usize { self.cu().function.instr_stream.len() }

	/// Append a raw byte, returning its index.
	fn write_byte(&mut self, byte: u8) -> usize {
		let line = self.previous.line;
		let function = &mut self.cu_mut().function;
		function.instr_stream.push(byte);
		function.lines.push(line);
		function.instr_stream.len() - 1
	}

	fn write_op(&mut self, op: OpCode) -> usize {
		self.cu_mut().adjust_stack(op.stack_effect());
		self.write_byte(op as u8)
	}

	fn write_short(&mut self, operand: usize) -> usize {
		let index = self.write_byte((operand >> 8) as u8);
		self.write_byte(operand as u8);
		index
	}

	/// Write `op` and a one-byte operand, returning the operand's index.
	fn write_op_byte(&mut self, op: OpCode, operand: usize) -> usize {
		self.write_op(op);
		self.write_byte(operand as u8)
	}

	/// Write `op` and a two-byte operand, returning the operand's index.
	fn write_op_short(&mut self, op: OpCode, operand: usize) -> usize {
		self.write_op(op);
		self.write_short(operand)
	}

	fn emit_placeholder(&mut self, op: OpCode) -> usize { self.write_op_short(op, 0xffff) }

	/// Point the jump placeholder at `index` to the next instruction.
	fn patch_placeholder(&mut self, index: usize) -> CompileResult {
		let offset = self.code_len() - index - 2;
		if offset > u16::MAX as usize {
			return Err(self.error(CompileErrorType::JumpTooFar));
		}
		let code = &mut self.cu_mut().function.instr_stream;
		code[index] = (offset >> 8) as u8;
		code[index + 1] = offset as u8;
		Ok(())
	}

	fn add_constant(&mut self, value: Value) -> CompileResult<usize> {
		let max = self.limits.max_constants;
		if self.cu().function.constants.len() >= max {
			return Err(self.error(CompileErrorType::LimitExceeded { what: "constants", max }));
		}
		let constants = &mut self.cu_mut().function.constants;
		constants.push(value);
		Ok(constants.len() - 1)
	}

	fn emit_load_constant(&mut self, value: Value) -> CompileResult {
		let index = self.add_constant(value)?;
		self.write_op_short(OpCode::LoadConstant, index);
		Ok(())
	}

	/// Load a module variable the core module is expected to provide.
	fn emit_load_core_var(&mut self, name: &str) -> CompileResult {
		let index = self
			.module
			.var_index(&ModuleVarName::Plain(name.to_string()))
			.ok_or_else(|| anyhow!("Core module variable '{name}' is not defined"))?;
		self.write_op_short(OpCode::LoadModuleVar, index);
		Ok(())
	}

	/// Intern a method signature string, returning its dispatch index.
	fn intern_method(&mut self, signature: &str) -> CompileResult<usize> {
		let max = self.limits.max_signature_len();
		if signature.len() > max {
			return Err(self.error(CompileErrorType::SignatureTooLong { signature: signature.to_string(), max }));
		}
		let index = self.method_names.ensure(signature);
		if index > u16::MAX as usize {
			return Err(self.error(CompileErrorType::LimitExceeded { what: "method names", max: 1 << 16 }));
		}
		Ok(index)
	}

	/// Call the method spelled `signature` with `argc` arguments on the stack.
	fn emit_call(&mut self, argc: usize, signature: &str) -> CompileResult {
		let index = self.intern_method(signature)?;
		self.write_op_short(OpCode::Call0.with_args(argc)?, index);
		Ok(())
	}

	/// Finish the innermost nested unit and emit the closure creating it into
	/// the enclosing one.
	fn end_compile_unit(&mut self, name: String) -> CompileResult<Rc<FnObject>> {
		self.write_op(OpCode::End);
		let unit = self.units.pop().ok_or_else(|| anyhow!("No function unit to end for '{name}'"))?;
		let mut function = unit.function;
		function.name = name;
		function.upvalue_count = unit.upvalues.len();
		let function = Rc::new(function);

		let index = self.add_constant(Value::Fn(function.clone()))?;
		self.write_op_short(OpCode::CreateClosure, index);
		for upvalue in unit.upvalues {
			self.write_byte(upvalue.is_enclosing_local as u8);
			self.write_byte(upvalue.index as u8);
		}
		Ok(function)
	}
}

#[cfg(test)]
mod tests;
