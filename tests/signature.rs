//! Property tests for method dispatch keys.

use proptest::prelude::*;
use zsparrow::{Signature, SignatureKind};

fn kind() -> impl Strategy<Value = SignatureKind> {
	prop_oneof![
		Just(SignatureKind::Construct),
		Just(SignatureKind::Method),
		Just(SignatureKind::Getter),
		Just(SignatureKind::Setter),
		Just(SignatureKind::Subscript),
		Just(SignatureKind::SubscriptSetter),
	]
}

/// A (kind, name, arity) the compiler could produce.
fn signature() -> impl Strategy<Value = (SignatureKind, String, usize)> {
	(kind(), "[a-z][a-zA-Z0-9]{0,6}", 0usize..=16).prop_map(|(kind, name, argc)| match kind {
		SignatureKind::Getter => (kind, name, 0),
		SignatureKind::Setter => (kind, name, 1),
		SignatureKind::Subscript => (kind, String::new(), argc.max(1)),
		SignatureKind::SubscriptSetter => (kind, String::new(), argc.max(2)),
		SignatureKind::Construct | SignatureKind::Method => (kind, name, argc),
	})
}

/// Constructors dispatch like methods of the same shape.
fn identity((kind, name, argc): &(SignatureKind, String, usize)) -> (SignatureKind, &str, usize) {
	let kind = if *kind == SignatureKind::Construct { SignatureKind::Method } else { *kind };
	(kind, name, *argc)
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(500))]

	#[test]
	fn dispatch_key_is_stable((kind, name, argc) in signature()) {
		let key = Signature::new(kind, &name, argc).to_string();
		prop_assert_eq!(&key, &Signature::new(kind, &name, argc).to_string());
		prop_assert!(key.starts_with(name.as_str()));
		prop_assert_eq!(key.matches('_').count(), argc);
	}

	#[test]
	fn distinct_signatures_have_distinct_keys(a in signature(), b in signature()) {
		let key_a = Signature::new(a.0, &a.1, a.2).to_string();
		let key_b = Signature::new(b.0, &b.1, b.2).to_string();
		prop_assert_eq!(identity(&a) == identity(&b), key_a == key_b, "{} vs {}", key_a, key_b);
	}
}
