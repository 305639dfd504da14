//! Compile-time view of the runtime objects the compiler produces or refers to.
mod function;
mod module;

use std::{fmt::Display, rc::Rc};

pub use function::FnObject;
pub use module::{DefineVarError, Module, ModuleVar, ModuleVarName};

/// A constant or module variable value.
#[derive(Debug, Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Num(f64),
	Str(Rc<str>),
	/// A compiled function, stored in the constant pool of its enclosing function.
	Fn(Rc<FnObject>),
	/// An object owned by the host runtime, such as a core class.
	Native(Rc<str>),
}

impl Display for Value {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Null => write!(f, "null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Num(n) => {
				if n.is_finite() && n.fract() == 0.0 {
					write!(f, "{}", *n as i64)
				} else {
					write!(f, "{n}")
				}
			}
			Value::Str(s) => write!(f, "{s:?}"),
			Value::Fn(function) => write!(f, "<fn {}>", function.name),
			Value::Native(name) => write!(f, "<native {name}>"),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(l), Value::Bool(r)) => l == r,
			(Value::Num(l), Value::Num(r)) => l == r,
			(Value::Str(l), Value::Str(r)) | (Value::Native(l), Value::Native(r)) => l == r,
			(Value::Fn(l), Value::Fn(r)) => Rc::ptr_eq(l, r),
			_ => false,
		}
	}
}
