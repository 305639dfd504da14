#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use zsparrow::{DiagnosticKind, Limits, ModuleVar, Sparrow, SparrowError, Vm};

	fn fixture() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("test.sp") }

	#[test]
	fn test_sparrow_file() {
		let mut sparrow = Sparrow::new(Limits::default()).unwrap();
		let function = match sparrow.compile_file(fixture()) {
			Ok(function) => function,
			Err(e) => panic!("{e}"),
		};
		let listing = sparrow.disassemble(&function).unwrap();
		assert!(listing.contains("== (script) =="));
		assert!(listing.contains("== fun fib =="));
		assert!(listing.contains("== new(_) constructor =="));
		assert!(listing.contains("'describe()'"));

		let module = sparrow.vm().module("test").unwrap();
		for name in ["Shape", "Circle", "shapes", "total", "lookup", "counter", "helper"] {
			assert!(matches!(module.value(name), Some(ModuleVar::Defined(_))), "{name}");
		}
	}

	#[test]
	fn test_sparrow_tokens() {
		let sparrow = Sparrow::new(Limits::default()).unwrap();
		let tokens = sparrow.tokens(fixture()).unwrap();
		assert!(tokens.lines().next().unwrap().contains("Import"));
		assert!(tokens.contains("Interpolation"));
		assert!(tokens.trim_end().ends_with("Eof"));
	}

	#[test]
	fn missing_file_is_internal_error() {
		let mut sparrow = Sparrow::new(Limits::default()).unwrap();
		let result = sparrow.compile_file("does/not/exist.sp");
		assert!(matches!(result, Err(SparrowError::InternalError(_))));
	}

	#[test]
	fn diagnostics_name_the_module() {
		let mut vm = Vm::new();
		let err = vm.load_module("broken", "var = 1\nclass {}\nvar s = \"%x\"").unwrap_err();
		let diagnostics = err.diagnostics();
		assert_eq!(diagnostics.len(), 4);
		assert!(diagnostics.iter().all(|d| d.file == "broken" && d.imported_from.is_none()));
		assert!(matches!(diagnostics[2].kind, DiagnosticKind::Lex(_)));
		assert!(matches!(diagnostics[3].kind, DiagnosticKind::Compile(_)));
		assert!(err.to_string().contains("broken:2: "));
	}

	#[test]
	fn invalid_limits_are_rejected() {
		assert!(Sparrow::new(Limits { max_fields: 300, ..Limits::default() }).is_err());
	}
}
