use palc::Parser;
use tracing_subscriber::EnvFilter;
use zsparrow::{Sparrow, cli::*};

fn main() {
	let filter = EnvFilter::try_from_env("SPARROW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let cli = Cli::parse();
	let mut sparrow = match Sparrow::new(cli.limits()) {
		Ok(sparrow) => sparrow,
		Err(e) => {
			eprintln!("Invalid limits: {e}");
			std::process::exit(2);
		}
	};

	match cli.mode {
		Mode::Compile { path } => {
			match sparrow.compile_file(&path).and_then(|function| sparrow.disassemble(&function)) {
				Ok(listing) => print!("{listing}"),
				Err(e) => {
					eprintln!("Failed compile file: {e}");
					std::process::exit(1);
				}
			}
		}
		Mode::Tokens { path } => match sparrow.tokens(&path) {
			Ok(tokens) => print!("{tokens}"),
			Err(e) => {
				eprintln!("Failed scan file: {e}");
				std::process::exit(1);
			}
		},
		Mode::Repl => sparrow.run_prompt(),
	}
}
