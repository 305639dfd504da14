use std::fmt::Display;

use super::Value;
use crate::symbol_table::SymbolTable;

/// Key of a module-level binding.
///
/// Functions declared with `fun` live beside plain variables under their own
/// key, so `fun f` and `var f` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleVarName {
	Plain(String),
	Function(String),
}

impl ModuleVarName {
	pub fn name(&self) -> &str {
		match self {
			ModuleVarName::Plain(name) | ModuleVarName::Function(name) => name,
		}
	}
}

impl Display for ModuleVarName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ModuleVarName::Plain(name) => write!(f, "{name}"),
			ModuleVarName::Function(name) => write!(f, "fun {name}"),
		}
	}
}

/// Value slot of a module variable.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleVar {
	Defined(Value),
	/// Referenced before any declaration, `line` is the first reference.
	Forward { line: u32 },
}

/// The variable namespace of one compiled source unit.
#[derive(Debug, Clone, Default)]
pub struct Module {
	/// `None` for the core module.
	pub name:   Option<String>,
	var_names:  SymbolTable<ModuleVarName>,
	var_values: Vec<ModuleVar>,
}

/// Why `Module::define_var` refused a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineVarError {
	Redefined(usize),
}

impl Module {
	pub fn new(name: Option<&str>) -> Self { Self { name: name.map(str::to_string), ..Self::default() } }

	pub fn var_count(&self) -> usize { self.var_names.len() }

	pub fn var_index(&self, name: &ModuleVarName) -> Option<usize> { self.var_names.index_of(name) }

	pub fn var_name(&self, index: usize) -> Option<&ModuleVarName> { self.var_names.get(index) }

	pub fn var(&self, index: usize) -> Option<&ModuleVar> { self.var_values.get(index) }

	/// Look up a plain variable's value by name.
	pub fn value(&self, name: &str) -> Option<&ModuleVar> {
		self.var_index(&ModuleVarName::Plain(name.to_string())).and_then(|index| self.var(index))
	}

	pub fn vars(&self) -> impl Iterator<Item = (&ModuleVarName, &ModuleVar)> {
		self.var_names.iter().zip(self.var_values.iter())
	}

	/// Append a binding without checking for an existing one.
	pub fn declare_var(&mut self, name: ModuleVarName, value: ModuleVar) -> usize {
		self.var_values.push(value);
		self.var_names.add(name)
	}

	/// Bind `name`, filling in a forward declaration if one is pending.
	pub fn define_var(&mut self, name: ModuleVarName, value: Value) -> Result<usize, DefineVarError> {
		match self.var_names.index_of(&name) {
			None => Ok(self.declare_var(name, ModuleVar::Defined(value))),
			Some(index) => {
				if !matches!(self.var_values[index], ModuleVar::Forward { .. }) {
					return Err(DefineVarError::Redefined(index));
				}
				self.var_values[index] = ModuleVar::Defined(value);
				Ok(index)
			}
		}
	}

	/// Drop the variables declared from index `len` on.
	pub(crate) fn truncate_vars(&mut self, len: usize) {
		self.var_names.truncate(len);
		self.var_values.truncate(len);
	}

	/// Copy every defined variable of `core` into this module.
	pub(crate) fn inherit(&mut self, core: &Module) {
		for (name, value) in core.vars() {
			if let ModuleVar::Defined(value) = value {
				// A fresh module has nothing to collide with, an existing one keeps its own bindings.
				let _ = self.define_var(name.clone(), value.clone());
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn define_fills_forward_declaration() {
		let mut module = Module::new(Some("main"));
		let forward = module.declare_var(ModuleVarName::Plain("a".into()), ModuleVar::Forward { line: 3 });
		assert_eq!(module.define_var(ModuleVarName::Plain("a".into()), Value::Null), Ok(forward));
		assert_eq!(module.var(forward), Some(&ModuleVar::Defined(Value::Null)));
		assert_eq!(
			module.define_var(ModuleVarName::Plain("a".into()), Value::Null),
			Err(DefineVarError::Redefined(forward))
		);
	}

	#[test]
	fn function_and_plain_keys_are_distinct() {
		let mut module = Module::new(None);
		let plain = module.define_var(ModuleVarName::Plain("f".into()), Value::Null).unwrap();
		let function = module.define_var(ModuleVarName::Function("f".into()), Value::Null).unwrap();
		assert_ne!(plain, function);
		assert_eq!(module.var_count(), 2);
	}

	#[test]
	fn inherit_copies_core() {
		let mut core = Module::new(None);
		core.define_var(ModuleVarName::Plain("List".into()), Value::Native("List".into())).unwrap();
		let mut module = Module::new(Some("app"));
		module.inherit(&core);
		assert_eq!(module.value("List"), Some(&ModuleVar::Defined(Value::Native("List".into()))));
	}
}
