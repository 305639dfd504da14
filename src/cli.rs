use std::path::PathBuf;

use palc::{Parser, Subcommand};

use crate::Limits;

#[derive(Parser)]
#[command(name = "zsparrow", after_long_help = "A single-pass bytecode compiler for sparrow scripts.")]
pub struct Cli {
	#[command(subcommand)]
	pub mode:         Mode,
	/// Most local variables in one function
	#[arg(long)]
	pub max_locals:   Option<usize>,
	/// Most upvalues captured by one function
	#[arg(long)]
	pub max_upvalues: Option<usize>,
	/// Most instance fields in one class
	#[arg(long)]
	pub max_fields:   Option<usize>,
	/// Longest identifier
	#[arg(long)]
	pub max_id_len:   Option<usize>,
}

impl Cli {
	/// Default limits with the overrides given on the command line.
	pub fn limits(&self) -> Limits {
		let default = Limits::default();
		Limits {
			max_locals: self.max_locals.unwrap_or(default.max_locals),
			max_upvalues: self.max_upvalues.unwrap_or(default.max_upvalues),
			max_fields: self.max_fields.unwrap_or(default.max_fields),
			max_id_len: self.max_id_len.unwrap_or(default.max_id_len),
			..default
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Compile a file and print its bytecode
	Compile { path: PathBuf },
	/// Print the tokens of a file
	Tokens { path: PathBuf },
	/// Compile prompt input line by line
	Repl,
}
