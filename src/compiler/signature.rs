use std::fmt::{Display, Write};

/// How a method is invoked, which decides how its signature is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
	/// `new(_)`, spelled like a method.
	Construct,
	/// `name(_,_)`
	Method,
	/// `name`
	Getter,
	/// `name=(_)`
	Setter,
	/// `[_,_]`
	Subscript,
	/// `[_]=(_)`, the assigned value counts as the last argument.
	SubscriptSetter,
}

/// The dispatch shape of a method: kind, name and arity.
///
/// Its `Display` form is the dispatch key interned into the method-name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature<'a> {
	pub kind:      SignatureKind,
	pub name:      &'a str,
	pub arg_count: usize,
}

impl<'a> Signature<'a> {
	pub fn new(kind: SignatureKind, name: &'a str, arg_count: usize) -> Self { Self { kind, name, arg_count } }
}

/// Writes `_,_,_` for `count` parameters.
fn write_params(f: &mut std::fmt::Formatter<'_>, count: usize) -> std::fmt::Result {
	for i in 0..count {
		if i > 0 {
			f.write_char(',')?;
		}
		f.write_char('_')?;
	}
	Ok(())
}

impl Display for Signature<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name)?;
		match self.kind {
			SignatureKind::Getter => Ok(()),
			SignatureKind::Setter => f.write_str("=(_)"),
			SignatureKind::Construct | SignatureKind::Method => {
				f.write_char('(')?;
				write_params(f, self.arg_count)?;
				f.write_char(')')
			}
			SignatureKind::Subscript => {
				f.write_char('[')?;
				write_params(f, self.arg_count)?;
				f.write_char(']')
			}
			SignatureKind::SubscriptSetter => {
				f.write_char('[')?;
				write_params(f, self.arg_count.saturating_sub(1))?;
				f.write_str("]=(_)")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{SignatureKind::*, *};

	#[test]
	fn signature_to_string() {
		assert_eq!(Signature::new(Getter, "count", 0).to_string(), "count");
		assert_eq!(Signature::new(Setter, "count", 1).to_string(), "count=(_)");
		assert_eq!(Signature::new(Method, "add", 0).to_string(), "add()");
		assert_eq!(Signature::new(Method, "add", 3).to_string(), "add(_,_,_)");
		assert_eq!(Signature::new(Construct, "new", 2).to_string(), "new(_,_)");
		assert_eq!(Signature::new(Subscript, "", 2).to_string(), "[_,_]");
		assert_eq!(Signature::new(SubscriptSetter, "", 2).to_string(), "[_]=(_)");
		assert_eq!(Signature::new(Method, "+", 1).to_string(), "+(_)");
		assert_eq!(Signature::new(Getter, "-", 0).to_string(), "-");
	}
}
