pub mod compiler;
pub mod scanner;

use std::fmt::Display;

use compiler::CompileErrorType;
use scanner::ScanErrorType;

/// SparrowError is the top-level error type for the sparrow compiler.
#[derive(thiserror::Error, Debug)]
pub enum SparrowError {
	/// Internal compiler or host error, not caused by the compiled source
	#[error("CompilerInternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	/// Every diagnostic collected while compiling one module
	#[error("Generated {} compile errors:\n{}", .0.len(), DiagnosticList(.0))]
	CompileErrors(Vec<Diagnostic>),
}

impl SparrowError {
	/// The collected diagnostics, empty for internal errors.
	pub fn diagnostics(&self) -> &[Diagnostic] {
		match self {
			SparrowError::CompileErrors(diagnostics) => diagnostics,
			SparrowError::InternalError(_) => &[],
		}
	}
}

/// A located error reported against a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
	pub file:          String,
	pub line:          u32,
	pub kind:          DiagnosticKind,
	/// The file whose compile was in progress when this one started.
	pub imported_from: Option<String>,
}

impl std::error::Error for Diagnostic {}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}: {}", self.file, self.line, self.kind)?;
		if let Some(parent) = &self.imported_from {
			write!(f, " (imported from {parent})")?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
	Lex(ScanErrorType),
	Compile(CompileErrorType),
}

impl Display for DiagnosticKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DiagnosticKind::Lex(kind) => kind.fmt(f),
			DiagnosticKind::Compile(kind) => kind.fmt(f),
		}
	}
}

struct DiagnosticList<'a>(&'a [Diagnostic]);

impl Display for DiagnosticList<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, diagnostic) in self.0.iter().enumerate() {
			if i > 0 {
				writeln!(f)?;
			}
			write!(f, "{diagnostic}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn diagnostic_display() {
		let diagnostic = Diagnostic {
			file:          "main.sp".into(),
			line:          3,
			kind:          DiagnosticKind::Lex(ScanErrorType::UnterminatedString),
			imported_from: Some("app.sp".into()),
		};
		assert_eq!(diagnostic.to_string(), "main.sp:3: Unterminated string (imported from app.sp)");

		let error = SparrowError::CompileErrors(vec![diagnostic.clone(), diagnostic]);
		assert!(error.to_string().starts_with("Generated 2 compile errors:\nmain.sp:3"));
		assert_eq!(error.diagnostics().len(), 2);
	}
}
