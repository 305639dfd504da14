use std::rc::Rc;

use crate::{
	CompileErrorType, DiagnosticKind, FnObject, Limits, ModuleVar, SparrowError, Value, Vm,
	debug::{Instruction, Operand, decode},
	opcode::OpCode,
};

fn compile_with(vm: &mut Vm, source: &str) -> Result<Rc<FnObject>, SparrowError> { vm.load_module("test", source) }

fn ok(source: &str) -> (Vm, Rc<FnObject>) {
	let mut vm = Vm::new();
	match compile_with(&mut vm, source) {
		Ok(function) => (vm, function),
		Err(e) => panic!("{source:?} failed: {e}"),
	}
}

fn errors_with(vm: &mut Vm, source: &str) -> Vec<CompileErrorType> {
	match compile_with(vm, source) {
		Ok(_) => panic!("{source:?} compiled"),
		Err(e) => e
			.diagnostics()
			.iter()
			.filter_map(|d| match &d.kind {
				DiagnosticKind::Compile(r#type) => Some(r#type.clone()),
				DiagnosticKind::Lex(_) => None,
			})
			.collect(),
	}
}

fn errors(source: &str) -> Vec<CompileErrorType> { errors_with(&mut Vm::new(), source) }

fn ops(function: &FnObject) -> Vec<OpCode> { decode(function).unwrap().into_iter().map(|i| i.op).collect() }

/// Depth first search for a nested function by name.
fn find_fn<'f>(function: &'f FnObject, name: &str) -> &'f FnObject {
	fn search<'f>(function: &'f FnObject, name: &str) -> Option<&'f FnObject> {
		if function.name == name {
			return Some(function);
		}
		function.functions().find_map(|nested| search(nested, name))
	}
	search(function, name).unwrap_or_else(|| panic!("no function named {name:?}"))
}

fn called_methods(vm: &Vm, function: &FnObject) -> Vec<String> {
	decode(function)
		.unwrap()
		.into_iter()
		.filter_map(|i| match i.operand {
			Operand::Short(index) if i.op.call_args().is_some() => Some(index),
			Operand::Super { method, .. } => Some(method),
			_ => None,
		})
		.map(|index| vm.method_names().get(index as usize).unwrap().clone())
		.collect()
}

fn find_op(function: &FnObject, op: OpCode) -> Vec<Instruction> {
	decode(function).unwrap().into_iter().filter(|i| i.op == op).collect()
}

#[test]
fn operators_are_method_calls_by_precedence() {
	let (vm, function) = ok("1 + 2 * 3");
	use OpCode::*;
	assert_eq!(ops(&function), [LoadConstant, LoadConstant, LoadConstant, Call1, Call1, Pop, PushNull, Return, End]);
	assert_eq!(called_methods(&vm, &function), ["*(_)", "+(_)"]);

	let (vm, function) = ok("(1 + 2) * 3");
	assert_eq!(called_methods(&vm, &function), ["+(_)", "*(_)"]);

	let (vm, function) = ok("-1 .. 2 is Num == !true");
	assert_eq!(called_methods(&vm, &function), ["-", "..(_)", "is(_)", "!", "==(_)"]);
}

#[test]
fn constants_and_literals() {
	let (_, function) = ok("var a = 1.5\nvar b = \"hi\"\nvar c = true\nvar d = null");
	assert_eq!(function.constants[0], Value::Num(1.5));
	assert_eq!(function.constants[1], Value::Str("hi".into()));
	assert!(ops(&function).contains(&OpCode::PushTrue));
	assert!(ops(&function).contains(&OpCode::PushNull));
	assert_eq!(function.name, "(script)");
	assert_eq!(function.module.as_deref(), Some("test"));
}

#[test]
fn invalid_assignment_target() {
	assert_eq!(errors("var a\nvar b\nvar c\na + b = c"), [CompileErrorType::InvalidAssignment]);
	assert_eq!(errors("class A { f() { this = 1 } }"), [CompileErrorType::InvalidAssignment]);
	ok("var a\nvar b\na = b = 1");
}

#[test]
fn local_redefinition_and_shadowing() {
	assert_eq!(errors("{ var a = 1\nvar a = 2 }"), [CompileErrorType::LocalRedefinition("a".to_string())]);
	ok("{ var a = 1\n{ var a = 2 } }");
	assert_eq!(errors("var a\nvar a"), [CompileErrorType::ModuleVarRedefinition("a".to_string())]);
	assert_eq!(errors("var a, b"), [CompileErrorType::SingleVariableOnly]);
}

#[test]
fn upvalues_are_captured_once() {
	let (_, function) = ok("fun outer() {\nvar x = 1\nvar f = Fn.new { x + x }\n}");
	let block = find_fn(&function, "new(_) block");
	assert_eq!(block.upvalue_count, 1);
	assert_eq!(find_op(block, OpCode::LoadUpvalue).len(), 2);

	let outer = find_fn(&function, "fun outer");
	let closure = find_op(outer, OpCode::CreateClosure);
	assert_eq!(closure[0].operand, Operand::Closure { function: 1, upvalues: vec![(true, 1)] });
}

#[test]
fn upvalues_thread_through_intermediate_functions() {
	let (_, function) = ok("fun outer() {\nvar x = 1\nFn.new { Fn.new { x } }\n}");
	let inner = find_op(find_fn(&function, "fun outer"), OpCode::CreateClosure);
	assert!(matches!(&inner[0].operand, Operand::Closure { upvalues, .. } if upvalues == &[(true, 1)]));
	let middle = find_fn(&function, "new(_) block");
	let innermost = find_op(middle, OpCode::CreateClosure);
	assert!(matches!(&innermost[0].operand, Operand::Closure { upvalues, .. } if upvalues == &[(false, 0)]));
}

#[test]
fn captured_local_is_closed_at_scope_end() {
	let (_, function) = ok("{\nvar x = 1\nFn.new { x }\n}");
	let code = ops(&function);
	assert!(code.contains(&OpCode::CloseUpvalue));
}

#[test]
fn break_only_discards_its_own_loop() {
	let (_, function) = ok(
		"fun f() {\nwhile (true) {\nvar a = 1\nwhile (true) {\nvar b = 2\nbreak\n}\n}\n}",
	);
	let f = find_fn(&function, "fun f");
	use OpCode::*;
	assert_eq!(
		ops(f),
		[
			PushTrue, JumpIfFalse, LoadConstant, PushTrue, JumpIfFalse, LoadConstant, Pop, Jump, Pop, Loop, Pop, Loop,
			PushNull, Return, End
		]
	);
	let instructions = decode(f).unwrap();
	let inner_exit = instructions[4].jump_target();
	assert_eq!(instructions[7].jump_target(), inner_exit);
	assert_eq!(inner_exit, Some(instructions[10].offset));
	assert_eq!(instructions[11].jump_target(), Some(0));
}

#[test]
fn break_in_for_discards_loop_variable() {
	let (vm, function) = ok("fun f(list) {\nfor item (list) {\nbreak\n}\n}");
	let f = find_fn(&function, "fun f");
	use OpCode::*;
	assert_eq!(
		ops(f),
		[
			LoadLocalVar, PushNull, LoadLocalVar, LoadLocalVar, Call1, StoreLocalVar, JumpIfFalse, LoadLocalVar,
			LoadLocalVar, Call1, Pop, Jump, Pop, Loop, Pop, Pop, PushNull, Return, End
		]
	);
	assert_eq!(called_methods(&vm, f), ["iterate(_)", "iteratorValue(_)"]);
	assert_eq!(f.arg_count, 1);
}

#[test]
fn continue_jumps_to_condition() {
	let (_, function) = ok("var a = 0\nwhile (a < 3) {\nvar b = a\ncontinue\n}");
	let instructions = decode(&function).unwrap();
	let cond_start = instructions[3].offset;
	let loops = find_op(&function, OpCode::Loop);
	assert_eq!(loops.len(), 2);
	assert!(loops.iter().all(|l| l.jump_target() == Some(cond_start)));
}

#[test]
fn loop_control_outside_loop() {
	assert_eq!(errors("break"), [CompileErrorType::BreakOutsideLoop]);
	assert_eq!(errors("fun f() { continue }"), [CompileErrorType::ContinueOutsideLoop]);
}

#[test]
fn while_exit_lands_after_back_jump() {
	let (_, function) = ok("var a = 1\nwhile (a < 3) { a = a + 1 }");
	let instructions = decode(&function).unwrap();
	let exit = instructions.iter().find(|i| i.op == OpCode::JumpIfFalse).unwrap();
	let back = instructions.iter().position(|i| i.op == OpCode::Loop).unwrap();
	assert_eq!(exit.jump_target(), Some(instructions[back + 1].offset));
	assert_eq!(instructions[back].jump_target(), Some(instructions[3].offset));
	assert_eq!(instructions[back + 1].op, OpCode::PushNull);
}

#[test]
fn if_else_and_conditional() {
	let (_, function) = ok("var a\nif (a) a = 1 else a = 2");
	let instructions = decode(&function).unwrap();
	let branch = instructions.iter().find(|i| i.op == OpCode::JumpIfFalse).unwrap();
	let skip = instructions.iter().position(|i| i.op == OpCode::Jump).unwrap();
	assert_eq!(branch.jump_target(), Some(instructions[skip + 1].offset));

	let (_, function) = ok("var a = true ? 1 : 2");
	assert_eq!(find_op(&function, OpCode::JumpIfFalse).len(), 1);
	assert_eq!(find_op(&function, OpCode::Jump).len(), 1);

	// `?:` binds looser than `||`, the whole disjunction is the condition.
	let (_, function) = ok("var a = false || true ? 1 : 2");
	use OpCode::*;
	assert_eq!(ops(&function)[..5], [PushFalse, Or, PushTrue, JumpIfFalse, LoadConstant]);

	let (_, function) = ok("var a = true && false || true");
	assert_eq!(find_op(&function, OpCode::And).len(), 1);
	assert_eq!(find_op(&function, OpCode::Or).len(), 1);
}

#[test]
fn point_class() {
	let (vm, function) = ok("class Point { var x; new(x) { this.x = x } getX() { return x } }");
	let class = find_op(&function, OpCode::CreateClass);
	assert_eq!(class[0].operand, Operand::Byte(1));
	assert_eq!(find_op(&function, OpCode::InstanceMethod).len(), 2);
	assert_eq!(find_op(&function, OpCode::StaticMethod).len(), 1);

	let get_x = find_fn(&function, "getX()");
	assert_eq!(ops(get_x), [OpCode::LoadThisField, OpCode::Return, OpCode::PushNull, OpCode::Return, OpCode::End]);
	let constructor = find_fn(&function, "new(_)");
	assert_eq!(constructor.arg_count, 1);
	assert_eq!(called_methods(&vm, constructor), ["x=(_)"]);
	let wrapper = find_fn(&function, "new(_) constructor");
	assert_eq!(ops(wrapper), [OpCode::Construct, OpCode::Call1, OpCode::Return, OpCode::End]);
	assert!(matches!(vm.module("test").unwrap().value("Point"), Some(ModuleVar::Defined(_))));
}

#[test]
fn fields_from_nested_functions_go_through_this() {
	let (_, function) = ok("class A { var x\n f() { return Fn.new { x } } }");
	let block = find_fn(&function, "new(_) block");
	assert_eq!(ops(block)[..2], [OpCode::LoadUpvalue, OpCode::LoadField]);
}

#[test]
fn class_member_errors() {
	use CompileErrorType::*;
	assert_eq!(errors("class C { var a = 1 }"), [InstanceFieldInitializer("a".to_string())]);
	assert_eq!(errors("class C { var a\nvar a }"), [FieldRedefinition("a".to_string())]);
	assert_eq!(errors("class C { static var a\nstatic var a }"), [StaticFieldRedefinition("a".to_string())]);
	assert_eq!(errors("class C { var a\nstatic f() { return a } }"), [FieldInStaticMethod("a".to_string())]);
	assert_eq!(
		errors("class C { f() {}\nf() {} }"),
		[MethodRedefinition { class: "C".to_string(), signature: "f()".to_string() }]
	);
	assert_eq!(errors("class C { static new() {} }"), [StaticConstructor]);
	assert_eq!(errors("class C { new {} }"), [ConstructorNeedsParens]);
	assert_eq!(errors("class C { , }"), [MissingMethodSignature(",".to_string())]);
	assert_eq!(errors("{ class A {} }"), [ClassNotInModuleScope]);
	assert_eq!(errors("this"), [ThisOutsideMethod]);
	ok("class C { f() {}\nstatic f() {} }");
}

#[test]
fn operator_and_accessor_methods() {
	let (vm, _) =
		ok("class V { +(other) { return this }\n-{ return this }\n-(o) { return o }\n[i] { return i }\n[i]=(v) { return v }\nname=(v) {}\nname {} }");
	for signature in ["+(_)", "-", "-(_)", "[_]", "[_]=(_)", "name=(_)", "name"] {
		assert!(vm.method_names().index_of(signature).is_some(), "{signature}");
	}
}

#[test]
fn static_fields_are_shared_slots() {
	let (_, function) = ok("class C { static var count = 0\nstatic inc() { count = count + 1 } }");
	let inc = find_fn(&function, "inc()");
	assert_eq!(inc.upvalue_count, 1);
	let code = ops(inc);
	assert!(code.contains(&OpCode::LoadUpvalue));
	assert!(code.contains(&OpCode::StoreUpvalue));
}

#[test]
fn static_fields_are_released_after_the_class_body() {
	let (_, function) = ok("class C { static var a = 1\nstatic var b = 2\nstatic get() { return a } }\nvar x = 1");
	let code = ops(&function);
	let end_of_class = code.iter().rposition(|op| *op == OpCode::StaticMethod).unwrap();
	use OpCode::*;
	assert_eq!(code[end_of_class + 1..], [Pop, CloseUpvalue, LoadConstant, StoreModuleVar, Pop, PushNull, Return, End]);

	let found = errors("class C { static var a\nstatic var a }\nclass D { static var a }");
	assert_eq!(found, [CompileErrorType::StaticFieldRedefinition("a".to_string())]);
}

#[test]
fn super_calls() {
	let (vm, function) = ok(
		"class A { foo(x) { return x } }\nclass B < A { foo(x) { return super.foo(x) }\nnew() { super() } }",
	);
	let foos: Vec<_> = function.functions().filter(|f| f.name == "foo(_)").collect();
	assert_eq!(foos.len(), 2);
	assert!(!ops(foos[0]).contains(&OpCode::Super1));
	assert!(ops(foos[1]).contains(&OpCode::Super1));
	assert_eq!(called_methods(&vm, foos[1]), ["foo(_)"]);
	let constructor = find_fn(&function, "new()");
	assert_eq!(called_methods(&vm, constructor), ["new()"]);
	assert!(ops(constructor).contains(&OpCode::Super0));

	assert_eq!(errors("var a = super.foo"), [CompileErrorType::SuperOutsideMethod]);
	assert_eq!(errors("class A { new(a) { super } }"), [CompileErrorType::SuperCallForm]);
}

#[test]
fn forward_references() {
	assert_eq!(errors("var a = b"), [CompileErrorType::UndefinedVariable("b".to_string())]);
	ok("fun f() { return b }\nvar b = 1");
	assert_eq!(errors("g()"), [CompileErrorType::UndefinedFunction("g".to_string())]);
	assert_eq!(errors("fun f() { return g() }"), [CompileErrorType::UndefinedFunction("g".to_string())]);
	ok("fun f() { return g() }\nfun g() { return 1 }");
	ok("fun f(n) { return f(n) }");

	let err = compile_with(&mut Vm::new(), "var a\n\nvar c = b").unwrap_err();
	assert_eq!(err.diagnostics()[0].line, 3);
}

#[test]
fn function_calls_use_call_signature() {
	let (vm, function) = ok("fun add(a, b) { return a + b }\nadd(1, 2)\nfun none() {}\nnone()");
	let methods = called_methods(&vm, &function);
	assert_eq!(methods, ["call(_,_)", "call()"]);
	assert_eq!(find_fn(&function, "fun add").arg_count, 2);
	assert_eq!(errors("{ fun f() {} }"), [CompileErrorType::FunNotInModuleScope]);
}

#[test]
fn collection_literals() {
	let (vm, function) = ok("var s = \"a %(1) b\"");
	assert_eq!(called_methods(&vm, &function), ["new()", "addCore_(_)", "addCore_(_)", "addCore_(_)", "join()"]);

	let (vm, function) = ok("var l = [1, 2]");
	assert_eq!(called_methods(&vm, &function), ["new()", "addCore_(_)", "addCore_(_)"]);

	let (vm, function) = ok("var m = {\"a\": 1}\nm[\"a\"] = 2\nm[\"a\"]");
	assert_eq!(called_methods(&vm, &function), ["new()", "addCore_(_,_)", "[_]=(_)", "[_]"]);
}

#[test]
fn block_arguments() {
	let (vm, function) = ok("var l = List.new()\nl.each { |x| x }\nl.map(1) { |a, b| a }\nl.run {}");
	assert_eq!(called_methods(&vm, &function), ["new()", "each(_)", "map(_,_)", "run(_)"]);
	assert_eq!(find_fn(&function, "each(_) block").arg_count, 1);
	assert_eq!(find_fn(&function, "map(_,_) block").arg_count, 2);
	assert_eq!(find_fn(&function, "run(_) block").arg_count, 0);
}

#[test]
fn import_binds_module_variables() {
	let (vm, function) = ok("import foo for bar, baz\nimport qux.sp");
	let methods = called_methods(&vm, &function);
	assert_eq!(methods, ["importModule(_)", "getModuleVariable(_,_)", "getModuleVariable(_,_)", "importModule(_)"]);
	assert!(vm.module("test").unwrap().value("baz").is_some());
}

#[test]
fn every_error_is_reported() {
	use CompileErrorType::*;
	let mut vm = Vm::new();
	let err = compile_with(&mut vm, "var = 1\nvar b = )\nvar c = 2\nbreak").unwrap_err();
	let lines: Vec<_> = err.diagnostics().iter().map(|d| d.line).collect();
	assert_eq!(lines, [1, 2, 4]);
	let kinds = errors_with(&mut Vm::new(), "var = 1\nvar b = )\nvar c = 2\nbreak");
	assert!(matches!(kinds[0], Expected { .. }));
	assert_eq!(kinds[1], ExpectedExpression(")".to_string()));
	assert_eq!(kinds[2], BreakOutsideLoop);
	assert!(vm.module("test").unwrap().value("c").is_none());
}

#[test]
fn recovery_resumes_at_the_statement_that_ended_the_error() {
	let found = errors("var a = 1 +\nvar b = 2\nvar c = b");
	assert_eq!(found, [CompileErrorType::ExpectedExpression("var".to_string())]);

	let found = errors("if (true) 1 +\nwhile (false) {}\nfun f() { return 1 }\nf()");
	assert_eq!(found, [CompileErrorType::ExpectedExpression("while".to_string())]);
}

#[test]
fn lexical_errors_do_not_stop_compiling() {
	let err = compile_with(&mut Vm::new(), "var a = 1 @ \nvar b = c").unwrap_err();
	let diagnostics = err.diagnostics();
	assert!(matches!(diagnostics[0].kind, DiagnosticKind::Lex(_)));
	assert_eq!(diagnostics[1].kind, DiagnosticKind::Compile(CompileErrorType::UndefinedVariable("c".to_string())));
}

#[test]
fn recovery_inside_class_and_function() {
	let found = errors("class A { f() { var = 1 } }\nfun g() { ) }\nvar ok = 1\nok +");
	assert_eq!(found.len(), 3);
	assert!(matches!(found[2], CompileErrorType::ExpectedExpression(_)));
}

#[test]
fn limits_are_diagnostics() {
	let mut vm = Vm::with_limits(Limits { max_locals: 2, ..Limits::default() }).unwrap();
	let found = errors_with(&mut vm, "fun f() { var a\nvar b }");
	assert_eq!(found, [CompileErrorType::LimitExceeded { what: "local variables", max: 2 }]);

	let mut vm = Vm::with_limits(Limits { max_id_len: 3, ..Limits::default() }).unwrap();
	let found = errors_with(&mut vm, "var long = 1");
	assert_eq!(found, [CompileErrorType::IdentifierTooLong { name: "long".to_string(), max: 3 }]);

	let mut vm = Vm::with_limits(Limits { max_fields: 1, ..Limits::default() }).unwrap();
	let found = errors_with(&mut vm, "class A { var a\nvar b }");
	assert_eq!(found, [CompileErrorType::LimitExceeded { what: "fields", max: 1 }]);

	let args = (1..=17).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
	let found = errors(&format!("System.print({args})"));
	assert_eq!(found, [CompileErrorType::LimitExceeded { what: "arguments", max: 16 }]);
}

#[test]
fn stack_high_water_mark() {
	let (_, function) = ok("fun f(a, b) { return a + b * 2 }");
	assert_eq!(find_fn(&function, "fun f").max_stack_slots, 6);
}
