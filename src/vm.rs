//! Compile-time host state shared by every module compiled in one session.

use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use crate::{
	Limits, SparrowError, compile_module,
	object::{FnObject, Module, Value},
	symbol_table::SymbolTable,
};

/// Classes the core module binds before any user module is compiled.
pub const CORE_CLASSES: [&str; 12] =
	["Object", "Class", "Bool", "Num", "Null", "String", "List", "Map", "Range", "System", "Fn", "Thread"];

/// Method names, the module registry and the core module.
#[derive(Debug)]
pub struct Vm {
	/// Every method signature seen so far, its index is the dispatch key.
	pub(crate) method_names: SymbolTable,
	pub(crate) limits:       Limits,
	/// Files whose compile is in progress, innermost last. An importer
	/// stays here while the module it imports is compiled.
	pub(crate) compiling:    Vec<String>,
	core:                    Module,
	modules:                 HashMap<String, Module>,
}

impl Default for Vm {
	fn default() -> Self {
		let mut core = Module::new(None);
		for class in CORE_CLASSES {
			// A fresh module has nothing to collide with.
			let _ = core.define_var(crate::ModuleVarName::Plain(class.to_string()), Value::Native(class.into()));
		}
		Self {
			method_names: SymbolTable::new(),
			limits: Limits::default(),
			compiling: Vec::new(),
			core,
			modules: HashMap::new(),
		}
	}
}

impl Vm {
	pub fn new() -> Self { Self::default() }

	pub fn with_limits(limits: Limits) -> anyhow::Result<Self> {
		limits.validate()?;
		Ok(Self { limits, ..Self::default() })
	}

	pub fn limits(&self) -> &Limits { &self.limits }

	pub fn method_names(&self) -> &SymbolTable { &self.method_names }

	pub fn core(&self) -> &Module { &self.core }

	pub fn module(&self, name: &str) -> Option<&Module> { self.modules.get(name) }

	/// Files being compiled right now, the outermost first.
	pub fn compiling(&self) -> &[String] { &self.compiling }

	/// Bind a host object in the core module, visible to modules created afterwards.
	pub fn define_core_var(&mut self, name: &str, value: Value) -> anyhow::Result<usize> {
		self.core
			.define_var(crate::ModuleVarName::Plain(name.to_string()), value)
			.map_err(|_| anyhow::anyhow!("Core variable '{name}' is already defined"))
	}

	/// Compile `source` into the module `name`, creating it from the core
	/// module on first use. Declarations of earlier loads stay visible.
	pub fn load_module(&mut self, name: &str, source: &str) -> Result<Rc<FnObject>, SparrowError> {
		let mut module = match self.modules.remove(name) {
			Some(module) => module,
			None => {
				let mut module = Module::new(Some(name));
				module.inherit(&self.core);
				debug!(module = name, vars = module.var_count(), "created module");
				module
			}
		};
		let result = compile_module(self, &mut module, source);
		self.modules.insert(name.to_string(), module);
		result
	}

	/// Load `name` for a host resolving an `import` in `importer`, diagnostics
	/// of `name` then point back at the importing file.
	pub fn load_imported_module(
		&mut self,
		importer: &str,
		name: &str,
		source: &str,
	) -> Result<Rc<FnObject>, SparrowError> {
		self.compiling.push(importer.to_string());
		let result = self.load_module(name, source);
		self.compiling.pop();
		result
	}

	/// Compile source into the core module itself.
	pub fn load_core(&mut self, source: &str) -> Result<Rc<FnObject>, SparrowError> {
		let mut core = std::mem::take(&mut self.core);
		let result = compile_module(self, &mut core, source);
		self.core = core;
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{CompileErrorType, DiagnosticKind, ModuleVar};

	#[test]
	fn modules_start_with_core_classes() {
		let mut vm = Vm::new();
		vm.load_module("main", "var a = 1").unwrap();
		let module = vm.module("main").unwrap();
		for class in CORE_CLASSES {
			assert!(matches!(module.value(class), Some(ModuleVar::Defined(Value::Native(_)))));
		}
		assert!(module.value("a").is_some());
	}

	#[test]
	fn module_keeps_declarations_across_loads() {
		let mut vm = Vm::new();
		vm.load_module("repl", "var a = 1").unwrap();
		vm.load_module("repl", "a = a + 1").unwrap();
		let err = vm.load_module("repl", "var a = 2").unwrap_err();
		let kind = &err.diagnostics()[0].kind;
		assert!(matches!(kind, DiagnosticKind::Compile(CompileErrorType::ModuleVarRedefinition(_))));
	}

	#[test]
	fn failed_load_leaves_module_untouched() {
		let mut vm = Vm::new();
		vm.load_module("repl", "var a = 1").unwrap();
		let vars = vm.module("repl").unwrap().var_count();
		assert!(vm.load_module("repl", "x\nvar b = 2\nvar = 1").is_err());
		let module = vm.module("repl").unwrap();
		assert_eq!(module.var_count(), vars);
		assert!(module.value("b").is_none());

		let err = vm.load_module("repl", "System.print(x)").unwrap_err();
		let kind = &err.diagnostics()[0].kind;
		assert_eq!(kind, &DiagnosticKind::Compile(CompileErrorType::UndefinedVariable("x".to_string())));
		vm.load_module("repl", "var b = a").unwrap();
	}

	#[test]
	fn imported_module_names_its_importer() {
		let mut vm = Vm::new();
		let err = vm.load_imported_module("main", "shapes", "var = 1").unwrap_err();
		let diagnostic = &err.diagnostics()[0];
		assert_eq!(diagnostic.file, "shapes");
		assert_eq!(diagnostic.imported_from.as_deref(), Some("main"));
		assert!(vm.compiling().is_empty());

		let err = vm.load_module("shapes", "var = 1").unwrap_err();
		assert_eq!(err.diagnostics()[0].imported_from, None);
	}

	#[test]
	fn method_names_are_shared_between_modules() {
		let mut vm = Vm::new();
		vm.load_module("a", "1 + 2").unwrap();
		let count = vm.method_names().len();
		vm.load_module("b", "3 + 4").unwrap();
		assert_eq!(vm.method_names().len(), count);
		assert!(vm.method_names().index_of("+(_)").is_some());
	}

	#[test]
	fn core_vars_reach_new_modules_only() {
		let mut vm = Vm::new();
		vm.load_module("old", "").unwrap();
		vm.define_core_var("Host", Value::Native("Host".into())).unwrap();
		assert!(vm.define_core_var("Host", Value::Null).is_err());
		vm.load_module("new", "Host").unwrap();
		assert!(vm.module("old").unwrap().value("Host").is_none());
		assert!(vm.load_module("old", "Host").is_err());
	}

	#[test]
	fn core_module_reports_its_own_file() {
		let mut vm = Vm::new();
		let err = vm.load_core("var = 1").unwrap_err();
		assert_eq!(err.diagnostics()[0].file, "core.script.inc");
		assert!(vm.compiling().is_empty());
	}

	#[test]
	fn rejects_limits_above_operand_width() {
		let limits = Limits { max_locals: 1000, ..Limits::default() };
		assert!(Vm::with_limits(limits).is_err());
	}
}
