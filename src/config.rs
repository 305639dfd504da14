use anyhow::bail;

use crate::opcode::MAX_CALL_ARGS;

/// Sanity caps enforced while compiling, each reported as a diagnostic when exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
	/// Locals live in one function frame, indexed by a byte.
	pub max_locals:      usize,
	pub max_upvalues:    usize,
	/// Instance fields per class, the field count is a byte operand.
	pub max_fields:      usize,
	pub max_args:        usize,
	pub max_id_len:      usize,
	pub max_constants:   usize,
	pub max_module_vars: usize,
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_locals:      128,
			max_upvalues:    128,
			max_fields:      128,
			max_args:        MAX_CALL_ARGS,
			max_id_len:      128,
			max_constants:   1 << 16,
			max_module_vars: 1 << 16,
		}
	}
}

impl Limits {
	/// Longest signature string, a maximal name plus `(_,...)` for every argument.
	pub fn max_signature_len(&self) -> usize { self.max_id_len + self.max_args * 2 + 1 }

	/// Reject limits the operand encoding can not represent.
	pub fn validate(&self) -> anyhow::Result<()> {
		let ceilings = [
			("max_locals", self.max_locals, 256),
			("max_upvalues", self.max_upvalues, 256),
			("max_fields", self.max_fields, 255),
			("max_args", self.max_args, MAX_CALL_ARGS),
			("max_constants", self.max_constants, 1 << 16),
			("max_module_vars", self.max_module_vars, 1 << 16),
		];
		for (name, value, ceiling) in ceilings {
			if value > ceiling {
				bail!("{name} is {value}, the bytecode can address at most {ceiling}");
			}
		}
		if self.max_id_len == 0 {
			bail!("max_id_len must be positive");
		}
		Ok(())
	}
}
