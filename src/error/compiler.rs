#[derive(thiserror::Error, Debug)]
pub enum ParserError {
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	#[error(transparent)]
	CompileError(#[from] CompileError),
}

#[derive(thiserror::Error, Debug)]
#[error("line {line}: {type}")]
pub struct CompileError {
	pub line:   u32,
	pub r#type: CompileErrorType,
}

impl CompileError {
	pub fn new(line: u32, r#type: CompileErrorType) -> Self { Self { line, r#type } }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorType {
	/// A specific token was required, `found` is the lexeme seen instead.
	Expected { expected: &'static str, found: String },
	ExpectedExpression(String),
	InvalidAssignment,
	IdentifierTooLong { name: String, max: usize },
	SignatureTooLong { signature: String, max: usize },
	LimitExceeded { what: &'static str, max: usize },
	LocalRedefinition(String),
	ModuleVarRedefinition(String),
	FieldRedefinition(String),
	StaticFieldRedefinition(String),
	MethodRedefinition { class: String, signature: String },
	UndefinedVariable(String),
	UndefinedFunction(String),
	BreakOutsideLoop,
	ContinueOutsideLoop,
	ThisOutsideMethod,
	SuperOutsideMethod,
	SuperCallForm,
	FieldInStaticMethod(String),
	InstanceFieldInitializer(String),
	ClassNotInModuleScope,
	FunNotInModuleScope,
	ConstructorNeedsParens,
	StaticConstructor,
	MissingMethodSignature(String),
	SingleVariableOnly,
	JumpTooFar,
}

impl std::fmt::Display for CompileErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use CompileErrorType::*;
		match self {
			Expected { expected, found } => write!(f, "Expected {expected}, found '{found}'"),
			ExpectedExpression(found) => write!(f, "Expected expression, found '{found}'"),
			InvalidAssignment => write!(f, "Invalid assignment target"),
			IdentifierTooLong { name, max } => write!(f, "Length of identifier '{name}' should be no more than {max}"),
			SignatureTooLong { signature, max } => {
				write!(f, "Signature '{signature}' is longer than {max} characters")
			}
			LimitExceeded { what, max } => write!(f, "The max number of {what} is {max}"),
			LocalRedefinition(name) => write!(f, "Local variable '{name}' redefinition"),
			ModuleVarRedefinition(name) => write!(f, "Module variable '{name}' redefinition"),
			FieldRedefinition(name) => write!(f, "Instance field '{name}' redefinition"),
			StaticFieldRedefinition(name) => write!(f, "Static field '{name}' redefinition"),
			MethodRedefinition { class, signature } => {
				write!(f, "Method '{class}.{signature}' redefinition")
			}
			UndefinedVariable(name) => write!(f, "Variable '{name}' is not defined"),
			UndefinedFunction(name) => write!(f, "Function '{name}' is not defined"),
			BreakOutsideLoop => write!(f, "'break' should be used inside a loop"),
			ContinueOutsideLoop => write!(f, "'continue' should be used inside a loop"),
			ThisOutsideMethod => write!(f, "'this' should be used inside a method"),
			SuperOutsideMethod => write!(f, "'super' should be used inside a method"),
			SuperCallForm => write!(f, "The form of super call is 'super()' or 'super(arguments)'"),
			FieldInStaticMethod(name) => write!(f, "Instance field '{name}' can not be used in a static method"),
			InstanceFieldInitializer(name) => write!(f, "Instance field '{name}' can not be initialized in the class body"),
			ClassNotInModuleScope => write!(f, "Class definition must be in the module scope"),
			FunNotInModuleScope => write!(f, "'fun' should be in the module scope"),
			ConstructorNeedsParens => write!(f, "Constructor 'new' must be declared as 'new(...)'"),
			StaticConstructor => write!(f, "Constructor is not allowed to be static"),
			MissingMethodSignature(found) => write!(f, "'{found}' can not start a method signature"),
			SingleVariableOnly => write!(f, "'var' only supports declaring a single variable"),
			JumpTooFar => write!(f, "Too much code to jump over"),
		}
	}
}
