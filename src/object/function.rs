use super::Value;

/// A compiled function: bytecode, constants and the frame shape the
/// interpreter needs to call it.
#[derive(Debug, Clone, Default)]
pub struct FnObject {
	/// Debug name, the signature for methods and `(script)` for a module body.
	pub name:            String,
	/// Name of the module the function was compiled in, `None` for core.
	pub module:          Option<String>,
	pub instr_stream:    Vec<u8>,
	pub constants:       Vec<Value>,
	/// Source line of each byte in `instr_stream`.
	pub lines:           Vec<u32>,
	pub arg_count:       usize,
	pub upvalue_count:   usize,
	pub max_stack_slots: usize,
}

impl FnObject {
	pub fn new(module: Option<String>, max_stack_slots: usize) -> Self {
		Self { module, max_stack_slots, ..Self::default() }
	}

	/// Nested functions found in the constant pool.
	pub fn functions(&self) -> impl Iterator<Item = &FnObject> {
		self.constants.iter().filter_map(|constant| match constant {
			Value::Fn(function) => Some(function.as_ref()),
			_ => None,
		})
	}
}
