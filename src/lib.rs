//! # From sparrow source to bytecode in one pass
//!
//! User's source code: `var average = (min + max) / 2`

//! ## Scanning
//!
//! The scanner turns characters into tokens on demand, the compiler pulls one
//! token at a time and never sees the whole stream. Whitespace and comments
//! (`//`, `/* */` and a leading `#!` line) are skipped. String literals are
//! decoded while scanning, so an interpolated string `"a %(b) c"` arrives as
//! an `Interpolation` token `"a "`, the tokens of `b`, then a `String` token
//! `" c"`.

//! ## Parsing is code generation
//!
//! There is no syntax tree. Each token kind has binding rules, and the Pratt
//! parser runs a rule's action as soon as the token is recognized:
//!
//! ``` markdown
//! LOAD_MODULE_VAR min
//! LOAD_MODULE_VAR max
//! CALL1 +(_)
//! LOAD_CONSTANT 2
//! CALL1 /(_)
//! STORE_MODULE_VAR average
//! POP
//! ```
//!
//! Operators are method calls on their left operand, so the interpreter
//! dispatches `+` the same way as any other method, by its signature.

//! ## Scopes
//!
//! Each function, method or block argument is compiled into its own unit
//! with its own locals. A name is looked up in the current unit, then in the
//! enclosing units, where finding it turns it into an upvalue, then among
//! the fields of the enclosing class, and at last in the module. A module
//! variable referenced before its declaration gets a placeholder that must be
//! filled before the module ends.

//! ## Back-patching
//!
//! Forward jumps are written with a placeholder offset and patched once the
//! target is reached. The same goes for `break`, whose target is only known
//! when the loop ends, and for a class's field count, known at its closing
//! brace.

//! ## Errors
//!
//! A compile error abandons the declaration it happened in, then the parser
//! skips to the next one, so one pass reports every error it finds.

pub mod cli;
mod compiler;
mod config;
pub mod debug;
mod error;
mod object;
pub mod opcode;
mod scanner;
mod sparrow;
mod symbol_table;
mod vm;

pub use compiler::{
	compile_module,
	signature::{Signature, SignatureKind},
};
pub use config::Limits;
pub use error::{
	Diagnostic, DiagnosticKind, SparrowError,
	compiler::{CompileError, CompileErrorType, ParserError},
	scanner::{ScanError, ScanErrorType, ScannerError},
};
pub use object::{DefineVarError, FnObject, Module, ModuleVar, ModuleVarName, Value};
pub use opcode::OpCode;
pub use sparrow::Sparrow;
pub use symbol_table::SymbolTable;
pub use vm::{CORE_CLASSES, Vm};
