//! Decoding and disassembling compiled functions.

use std::fmt::Write;

use anyhow::{Context, anyhow};

use crate::{
	object::{FnObject, Value},
	opcode::OpCode,
	symbol_table::SymbolTable,
};

/// The operand bytes following an opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
	None,
	Byte(u8),
	Short(u16),
	/// Method index and the constant slot reserved for the superclass.
	Super { method: u16, superclass: u16 },
	/// Constant index of the function, then `(is_enclosing_local, index)` per upvalue.
	Closure { function: u16, upvalues: Vec<(bool, u8)> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub offset:  usize,
	pub op:      OpCode,
	pub operand: Operand,
}

impl Instruction {
	/// Where a jump lands, measured from the byte after its operand.
	pub fn jump_target(&self) -> Option<usize> {
		let Operand::Short(distance) = self.operand else {
			return None;
		};
		let next = self.offset + 3;
		if self.op.is_forward_jump() {
			Some(next + distance as usize)
		} else if self.op == OpCode::Loop {
			next.checked_sub(distance as usize)
		} else {
			None
		}
	}
}

fn read_short(code: &[u8], at: usize) -> anyhow::Result<u16> {
	match code.get(at..at + 2) {
		Some(&[high, low]) => Ok(u16::from_be_bytes([high, low])),
		_ => Err(anyhow!("Operand at {at} runs past the end of the code")),
	}
}

fn read_byte(code: &[u8], at: usize) -> anyhow::Result<u8> {
	code.get(at).copied().ok_or_else(|| anyhow!("Operand at {at} runs past the end of the code"))
}

/// Split `function`'s instruction stream into instructions.
pub fn decode(function: &FnObject) -> anyhow::Result<Vec<Instruction>> {
	let code = &function.instr_stream;
	let mut instructions = Vec::new();
	let mut offset = 0;
	while offset < code.len() {
		let op = OpCode::try_from(code[offset]).with_context(|| format!("Decoding '{}' at {offset}", function.name))?;
		let at = offset + 1;
		let (operand, width) = match op {
			OpCode::CreateClosure => {
				let index = read_short(code, at)?;
				let Some(Value::Fn(nested)) = function.constants.get(index as usize) else {
					return Err(anyhow!("Closure at {offset} does not refer to a function constant"));
				};
				let upvalues = (0..nested.upvalue_count)
					.map(|i| Ok((read_byte(code, at + 2 + i * 2)? != 0, read_byte(code, at + 3 + i * 2)?)))
					.collect::<anyhow::Result<Vec<_>>>()?;
				let width = 2 + upvalues.len() * 2;
				(Operand::Closure { function: index, upvalues }, width)
			}
			_ if op.is_super() => {
				let operand = Operand::Super { method: read_short(code, at)?, superclass: read_short(code, at + 2)? };
				(operand, 4)
			}
			_ => match op.operand_width() {
				0 => (Operand::None, 0),
				1 => (Operand::Byte(read_byte(code, at)?), 1),
				_ => (Operand::Short(read_short(code, at)?), 2),
			},
		};
		instructions.push(Instruction { offset, op, operand });
		offset = at + width;
	}
	Ok(instructions)
}

/// Render `function` and every function nested in it, resolving method names.
pub fn disassemble(function: &FnObject, method_names: &SymbolTable) -> anyhow::Result<String> {
	let mut out = String::new();
	disassemble_into(&mut out, function, method_names)?;
	Ok(out)
}

fn disassemble_into(out: &mut String, function: &FnObject, method_names: &SymbolTable) -> anyhow::Result<()> {
	writeln!(out, "== {} ==", function.name)?;
	let mut last_line = None;
	for instruction in decode(function)? {
		let line = function.lines.get(instruction.offset).copied();
		if line == last_line {
			write!(out, "{:04}    | ", instruction.offset)?;
		} else {
			write!(out, "{:04} {:4} ", instruction.offset, line.unwrap_or_default())?;
		}
		last_line = line;
		write!(out, "{:?}", instruction.op)?;

		let method = |index: u16| method_names.get(index as usize).map(String::as_str).unwrap_or("?");
		let constant = |index: u16| match function.constants.get(index as usize) {
			Some(Value::Fn(nested)) => format!("<fn {}>", nested.name),
			Some(value) => value.to_string(),
			None => "?".to_string(),
		};
		match &instruction.operand {
			Operand::None => {}
			Operand::Byte(byte) => write!(out, " {byte}")?,
			Operand::Short(short) if instruction.op.call_args().is_some()
				|| matches!(instruction.op, OpCode::InstanceMethod | OpCode::StaticMethod) =>
			{
				write!(out, " {short} '{}'", method(*short))?
			}
			Operand::Short(short) if instruction.op == OpCode::LoadConstant => {
				write!(out, " {short} {}", constant(*short))?
			}
			Operand::Short(short) => match instruction.jump_target() {
				Some(target) => write!(out, " {short} -> {target}")?,
				None => write!(out, " {short}")?,
			},
			Operand::Super { method: index, superclass } => {
				write!(out, " {index} '{}' super@{superclass}", method(*index))?
			}
			Operand::Closure { function: index, upvalues } => {
				write!(out, " {index} {}", constant(*index))?;
				for (is_local, slot) in upvalues {
					write!(out, " {}{slot}", if *is_local { "local:" } else { "upvalue:" })?;
				}
			}
		}
		out.push('\n');
	}
	for nested in function.functions() {
		out.push('\n');
		disassemble_into(out, nested, method_names)?;
	}
	Ok(())
}
