use std::{fs::read_to_string, io::Write, path::Path, rc::Rc};

use anyhow::Context;

use crate::{Limits, SparrowError, Vm, debug::disassemble, object::FnObject, scanner::Scanner};

/// Module the REPL compiles every line into.
const REPL_MODULE: &str = "repl";

/// Sparrow drives the compiler over files and prompt input.
pub struct Sparrow {
	vm: Vm,
}

impl Sparrow {
	pub fn new(limits: Limits) -> anyhow::Result<Self> { Ok(Self { vm: Vm::with_limits(limits)? }) }

	pub fn vm(&self) -> &Vm { &self.vm }

	/// Compile a source file as the module named after its stem.
	pub fn compile_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Rc<FnObject>, SparrowError> {
		let path = path.as_ref();
		let name = path
			.file_stem()
			.and_then(|stem| stem.to_str())
			.with_context(|| format!("No module name in path {}", path.display()))?;
		let source = read_to_string(path).context("Failed open source file")?;
		self.vm.load_module(name, &source)
	}

	pub fn disassemble(&self, function: &FnObject) -> Result<String, SparrowError> {
		Ok(disassemble(function, self.vm.method_names())?)
	}

	/// One line per token of the file: line, kind and lexeme.
	pub fn tokens<P: AsRef<Path>>(&self, path: P) -> Result<String, SparrowError> {
		let path = path.as_ref();
		let source = read_to_string(path).context("Failed open source file")?;
		let tokens = Scanner::new(&source).scan_tokens(&path.display().to_string())?;
		let mut out = String::new();
		for token in tokens {
			out.push_str(&format!("{:4} {:?} {}\n", token.line, token.r#type, token.lexeme));
		}
		Ok(out)
	}

	/// Run the REPL prompt, printing the bytecode of every line.
	pub fn run_prompt(&mut self) {
		let mut input = String::new();
		let stdin = std::io::stdin();
		loop {
			input.clear();
			print!("> ");
			if let Err(e) = std::io::stdout().flush() {
				eprintln!("Failed flush: {e}");
			}
			match stdin.read_line(&mut input) {
				Ok(0) => {
					println!("\nExited zsparrow repl");
					break;
				}
				Ok(_) => {}
				Err(e) => {
					eprintln!("Failed read line: {e}");
					continue;
				}
			}
			match self.vm.load_module(REPL_MODULE, input.trim()).and_then(|function| self.disassemble(&function)) {
				Ok(listing) => print!("{listing}"),
				Err(e) => eprintln!("{e}"),
			}
		}
	}
}
