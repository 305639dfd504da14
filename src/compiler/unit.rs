//! Compile units and the scope bookkeeping each one carries.

use super::{CompileResult, Compiler, class::ClassBookKeep};
use crate::{
	CompileErrorType, ModuleVarName, Value,
	object::{DefineVarError, FnObject},
	opcode::OpCode,
};

/// Name of a stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocalName<'a> {
	Plain(&'a str),
	/// Slot 0 of a method, the receiver `this`.
	Receiver,
	/// Slot 0 of a plain function, never visible to the source.
	Reserved,
	/// Iterator state of a `for` loop.
	Hidden(&'static str),
	/// A static field, a class body slot shared by all instances.
	StaticField { class: &'a str, field: &'a str },
}

#[derive(Debug, Clone)]
pub(crate) struct LocalVar<'a> {
	pub name:        LocalName<'a>,
	pub scope_depth: i32,
	/// Captured by a closure, so it must be closed instead of popped.
	pub is_upvalue:  bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Upvalue {
	/// Captured from a local of the directly enclosing unit, or else from one of its upvalues.
	pub is_enclosing_local: bool,
	pub index:              usize,
}

#[derive(Debug)]
pub(crate) struct Loop {
	/// First instruction of the condition, target of `continue` and the back jump.
	pub cond_start:  usize,
	/// Scope depth outside the loop body.
	pub scope_depth: i32,
	/// Placeholder of the jump taken when the condition fails.
	pub exit_index:  usize,
	/// Placeholders emitted by `break`, patched to the loop exit.
	pub break_jumps: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
	Module,
	Function,
	Method,
}

pub(crate) struct CompileUnit<'a> {
	pub function:    FnObject,
	pub locals:      Vec<LocalVar<'a>>,
	pub upvalues:    Vec<Upvalue>,
	/// -1 at module scope, 0 for the top of a function body.
	pub scope_depth: i32,
	pub stack_slots: i32,
	pub loops:       Vec<Loop>,
	pub class_bk:    Option<ClassBookKeep<'a>>,
}

impl<'a> CompileUnit<'a> {
	pub fn new(kind: UnitKind, module: Option<String>) -> Self {
		let slot = |name| LocalVar { name, scope_depth: -1, is_upvalue: false };
		let (locals, scope_depth) = match kind {
			UnitKind::Module => (Vec::new(), -1),
			UnitKind::Function => (vec![slot(LocalName::Reserved)], 0),
			UnitKind::Method => (vec![slot(LocalName::Receiver)], 0),
		};
		Self {
			function: FnObject::new(module, locals.len()),
			stack_slots: locals.len() as i32,
			locals,
			upvalues: Vec::new(),
			scope_depth,
			loops: Vec::new(),
			class_bk: None,
		}
	}

	pub fn find_local(&self, name: &LocalName<'a>) -> Option<usize> {
		self.locals.iter().rposition(|local| local.name == *name)
	}

	pub fn adjust_stack(&mut self, effect: i32) {
		self.stack_slots = (self.stack_slots + effect).max(0);
		self.function.max_stack_slots = self.function.max_stack_slots.max(self.stack_slots as usize);
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarScope {
	Local,
	Upvalue,
	Module,
}

/// Where an identifier resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Variable {
	pub scope: VarScope,
	pub index: usize,
}

impl<'a> Compiler<'a> {
	pub(crate) fn push_unit(&mut self, kind: UnitKind) {
		self.units.push(CompileUnit::new(kind, self.module.name.clone()));
	}

	pub(crate) fn enter_scope(&mut self) { self.cu_mut().scope_depth += 1; }

	/// Emit code dropping every local declared at `depth` or deeper, without
	/// forgetting them: code after a `break` still sees them in scope.
	pub(crate) fn discard_locals(&mut self, depth: i32) -> usize {
		let captured: Vec<bool> = self
			.cu()
			.locals
			.iter()
			.rev()
			.take_while(|local| local.scope_depth >= depth)
			.map(|local| local.is_upvalue)
			.collect();
		for is_upvalue in &captured {
			let op = if *is_upvalue { OpCode::CloseUpvalue } else { OpCode::Pop };
			self.write_byte(op as u8);
		}
		captured.len()
	}

	pub(crate) fn leave_scope(&mut self) {
		let depth = self.cu().scope_depth;
		let discarded = self.discard_locals(depth);
		let cu = self.cu_mut();
		cu.locals.truncate(cu.locals.len() - discarded);
		cu.adjust_stack(-(discarded as i32));
		cu.scope_depth -= 1;
	}

	pub(crate) fn check_identifier(&self, name: &str) -> CompileResult {
		if name.len() > self.limits.max_id_len {
			let max = self.limits.max_id_len;
			return Err(self.error(CompileErrorType::IdentifierTooLong { name: name.to_string(), max }));
		}
		Ok(())
	}

	/// Add a local in the current scope without checking for duplicates.
	pub(crate) fn add_local(&mut self, name: LocalName<'a>) -> CompileResult<usize> {
		if self.cu().locals.len() >= self.limits.max_locals {
			let max = self.limits.max_locals;
			return Err(self.error(CompileErrorType::LimitExceeded { what: "local variables", max }));
		}
		let cu = self.cu_mut();
		let scope_depth = cu.scope_depth;
		cu.locals.push(LocalVar { name, scope_depth, is_upvalue: false });
		Ok(cu.locals.len() - 1)
	}

	pub(crate) fn declare_local(&mut self, name: &'a str) -> CompileResult<usize> {
		let cu = self.cu();
		let redefined = cu
			.locals
			.iter()
			.rev()
			.take_while(|local| local.scope_depth >= cu.scope_depth)
			.any(|local| local.name == LocalName::Plain(name));
		if redefined {
			return Err(self.error(CompileErrorType::LocalRedefinition(name.to_string())));
		}
		self.add_local(LocalName::Plain(name))
	}

	fn check_module_var_room(&self, name: &ModuleVarName) -> CompileResult {
		if self.module.var_index(name).is_none() && self.module.var_count() >= self.limits.max_module_vars {
			let max = self.limits.max_module_vars;
			return Err(self.error(CompileErrorType::LimitExceeded { what: "module variables", max }));
		}
		Ok(())
	}

	/// Bind a module variable, resolving a pending forward reference to it.
	pub(crate) fn define_module_var(&mut self, name: ModuleVarName) -> CompileResult<usize> {
		self.check_identifier(name.name())?;
		self.check_module_var_room(&name)?;
		let display = name.name().to_string();
		self.module
			.define_var(name, Value::Null)
			.map_err(|DefineVarError::Redefined(_)| self.error(CompileErrorType::ModuleVarRedefinition(display)))
	}

	/// Record a module variable referenced before its declaration.
	pub(crate) fn declare_forward(&mut self, name: ModuleVarName, line: u32) -> CompileResult<usize> {
		self.check_identifier(name.name())?;
		self.check_module_var_room(&name)?;
		Ok(self.module.declare_var(name, crate::ModuleVar::Forward { line }))
	}

	/// Declare a variable in the current scope, a module variable at module scope.
	pub(crate) fn declare_variable(&mut self, name: &'a str) -> CompileResult<usize> {
		self.check_identifier(name)?;
		if self.cu().scope_depth == -1 {
			self.define_module_var(ModuleVarName::Plain(name.to_string()))
		} else {
			self.declare_local(name)
		}
	}

	/// Declare a parameter, whose slot the caller fills.
	pub(crate) fn declare_parameter(&mut self, name: &'a str) -> CompileResult {
		self.declare_variable(name)?;
		self.cu_mut().adjust_stack(1);
		Ok(())
	}

	/// Store the value on top of the stack into a module variable, locals already live there.
	pub(crate) fn define_variable(&mut self, index: usize) {
		if self.cu().scope_depth == -1 {
			self.write_op_short(OpCode::StoreModuleVar, index);
			self.write_op(OpCode::Pop);
		}
	}

	fn add_upvalue(&mut self, depth: usize, is_enclosing_local: bool, index: usize) -> CompileResult<usize> {
		let upvalue = Upvalue { is_enclosing_local, index };
		let max = self.limits.max_upvalues;
		let unit = self.unit_at_mut(depth);
		if let Some(existing) = unit.upvalues.iter().position(|u| *u == upvalue) {
			return Ok(existing);
		}
		if unit.upvalues.len() >= max {
			return Err(self.error(CompileErrorType::LimitExceeded { what: "upvalues", max }));
		}
		unit.upvalues.push(upvalue);
		Ok(unit.upvalues.len() - 1)
	}

	/// Find `name` in the units enclosing `depth`, threading an upvalue through
	/// every unit in between.
	fn find_upvalue(&mut self, depth: usize, name: &LocalName<'a>) -> CompileResult<Option<usize>> {
		if depth == 0 {
			return Ok(None);
		}
		let enclosing = depth - 1;
		// Only static fields of a class body are reachable from its methods.
		if !matches!(name, LocalName::StaticField { .. }) && self.unit_at(enclosing).class_bk.is_some() {
			return Ok(None);
		}
		if let Some(local) = self.unit_at(enclosing).find_local(name) {
			self.unit_at_mut(enclosing).locals[local].is_upvalue = true;
			return self.add_upvalue(depth, true, local).map(Some);
		}
		match self.find_upvalue(enclosing, name)? {
			Some(upvalue) => self.add_upvalue(depth, false, upvalue).map(Some),
			None => Ok(None),
		}
	}

	pub(crate) fn resolve_local_or_upvalue(&mut self, name: &LocalName<'a>) -> CompileResult<Option<Variable>> {
		if let Some(index) = self.cu().find_local(name) {
			return Ok(Some(Variable { scope: VarScope::Local, index }));
		}
		let depth = self.units.len();
		Ok(self.find_upvalue(depth, name)?.map(|index| Variable { scope: VarScope::Upvalue, index }))
	}

	pub(crate) fn emit_load_variable(&mut self, variable: Variable) {
		match variable.scope {
			VarScope::Local => self.write_op_byte(OpCode::LoadLocalVar, variable.index),
			VarScope::Upvalue => self.write_op_byte(OpCode::LoadUpvalue, variable.index),
			VarScope::Module => self.write_op_short(OpCode::LoadModuleVar, variable.index),
		};
	}

	pub(crate) fn emit_store_variable(&mut self, variable: Variable) {
		match variable.scope {
			VarScope::Local => self.write_op_byte(OpCode::StoreLocalVar, variable.index),
			VarScope::Upvalue => self.write_op_byte(OpCode::StoreUpvalue, variable.index),
			VarScope::Module => self.write_op_short(OpCode::StoreModuleVar, variable.index),
		};
	}

	/// Assign when an `=` follows in an assignable position, else load.
	pub(crate) fn emit_load_or_store_variable(&mut self, can_assign: bool, variable: Variable) -> CompileResult {
		if can_assign && self.match_token(crate::scanner::TokenType::Assign)? {
			self.expression(super::rules::BindPower::Lowest)?;
			self.emit_store_variable(variable);
		} else {
			self.emit_load_variable(variable);
		}
		Ok(())
	}
}
