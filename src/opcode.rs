//! The instruction set the compiler targets.
//!
//! Operands wider than a byte are big-endian. Every opcode has a fixed
//! operand width except `CreateClosure`, which carries two more bytes per
//! captured upvalue.

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
	LoadConstant,
	PushNull,
	PushFalse,
	PushTrue,
	LoadLocalVar,
	StoreLocalVar,
	LoadUpvalue,
	StoreUpvalue,
	LoadModuleVar,
	StoreModuleVar,
	LoadThisField,
	StoreThisField,
	LoadField,
	StoreField,
	Pop,
	Call0,
	Call1,
	Call2,
	Call3,
	Call4,
	Call5,
	Call6,
	Call7,
	Call8,
	Call9,
	Call10,
	Call11,
	Call12,
	Call13,
	Call14,
	Call15,
	Call16,
	Super0,
	Super1,
	Super2,
	Super3,
	Super4,
	Super5,
	Super6,
	Super7,
	Super8,
	Super9,
	Super10,
	Super11,
	Super12,
	Super13,
	Super14,
	Super15,
	Super16,
	Jump,
	Loop,
	JumpIfFalse,
	And,
	Or,
	CloseUpvalue,
	Return,
	CreateClosure,
	Construct,
	CreateClass,
	InstanceMethod,
	StaticMethod,
	End,
}

use OpCode::*;

/// Every opcode in discriminant order.
const OPCODES: [OpCode; 62] = [
	LoadConstant,
	PushNull,
	PushFalse,
	PushTrue,
	LoadLocalVar,
	StoreLocalVar,
	LoadUpvalue,
	StoreUpvalue,
	LoadModuleVar,
	StoreModuleVar,
	LoadThisField,
	StoreThisField,
	LoadField,
	StoreField,
	Pop,
	Call0,
	Call1,
	Call2,
	Call3,
	Call4,
	Call5,
	Call6,
	Call7,
	Call8,
	Call9,
	Call10,
	Call11,
	Call12,
	Call13,
	Call14,
	Call15,
	Call16,
	Super0,
	Super1,
	Super2,
	Super3,
	Super4,
	Super5,
	Super6,
	Super7,
	Super8,
	Super9,
	Super10,
	Super11,
	Super12,
	Super13,
	Super14,
	Super15,
	Super16,
	Jump,
	Loop,
	JumpIfFalse,
	And,
	Or,
	CloseUpvalue,
	Return,
	CreateClosure,
	Construct,
	CreateClass,
	InstanceMethod,
	StaticMethod,
	End,
];

/// The highest argument count a call opcode encodes.
pub const MAX_CALL_ARGS: usize = 16;

impl TryFrom<u8> for OpCode {
	type Error = anyhow::Error;

	fn try_from(byte: u8) -> Result<Self, Self::Error> {
		OPCODES.get(byte as usize).copied().ok_or_else(|| anyhow!("Unknown opcode {byte:#04x}"))
	}
}

impl OpCode {
	/// `Call0..Call16` or `Super0..Super16` for `argc` arguments, `self` being the zero form.
	pub fn with_args(self, argc: usize) -> anyhow::Result<OpCode> {
		if !matches!(self, Call0 | Super0) || argc > MAX_CALL_ARGS {
			return Err(anyhow!("{self:?} has no form taking {argc} arguments"));
		}
		OpCode::try_from(self as u8 + argc as u8)
	}

	/// Arguments consumed by a call opcode, excluding the receiver.
	pub fn call_args(self) -> Option<usize> {
		let byte = self as u8;
		if (Call0 as u8..=Call16 as u8).contains(&byte) {
			Some((byte - Call0 as u8) as usize)
		} else if (Super0 as u8..=Super16 as u8).contains(&byte) {
			Some((byte - Super0 as u8) as usize)
		} else {
			None
		}
	}

	pub fn is_super(self) -> bool { (Super0 as u8..=Super16 as u8).contains(&(self as u8)) }

	/// Net change in stack depth after the instruction runs.
	pub fn stack_effect(self) -> i32 {
		if let Some(argc) = self.call_args() {
			return -(argc as i32);
		}
		match self {
			LoadConstant | PushNull | PushFalse | PushTrue | LoadLocalVar | LoadUpvalue | LoadModuleVar
			| LoadThisField | CreateClosure => 1,
			StoreLocalVar | StoreUpvalue | StoreModuleVar | StoreThisField | LoadField | Jump | Loop | Return
			| Construct | End => 0,
			StoreField | Pop | JumpIfFalse | And | Or | CloseUpvalue | CreateClass => -1,
			InstanceMethod | StaticMethod => -2,
			_ => 0,
		}
	}

	/// Operand bytes following the opcode, not counting closure upvalue pairs.
	pub fn operand_width(self) -> usize {
		if self.is_super() {
			return 4;
		}
		if self.call_args().is_some() {
			return 2;
		}
		match self {
			LoadLocalVar | StoreLocalVar | LoadUpvalue | StoreUpvalue | LoadThisField | StoreThisField | LoadField
			| StoreField | CreateClass => 1,
			LoadConstant | LoadModuleVar | StoreModuleVar | Jump | Loop | JumpIfFalse | And | Or | CreateClosure
			| InstanceMethod | StaticMethod => 2,
			_ => 0,
		}
	}

	/// Whether the two-byte operand is a forward jump distance.
	pub fn is_forward_jump(self) -> bool { matches!(self, Jump | JumpIfFalse | And | Or) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn discriminants_match_table() {
		for (index, op) in OPCODES.iter().enumerate() {
			assert_eq!(*op as usize, index);
			assert_eq!(OpCode::try_from(index as u8).unwrap(), *op);
		}
		assert!(OpCode::try_from(OPCODES.len() as u8).is_err());
	}

	#[test]
	fn call_forms() {
		assert_eq!(Call0.with_args(3).unwrap(), Call3);
		assert_eq!(Super0.with_args(16).unwrap(), Super16);
		assert!(Call0.with_args(17).is_err());
		assert!(Call2.with_args(1).is_err());
		assert_eq!(Call5.stack_effect(), -5);
		assert_eq!(Super2.operand_width(), 4);
		assert_eq!(Call16.operand_width(), 2);
		assert_eq!(CreateClass.operand_width(), 1);
		assert_eq!(Pop.operand_width(), 0);
	}
}
