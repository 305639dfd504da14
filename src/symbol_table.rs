use std::borrow::Borrow;

/// Append-only table mapping names to dense indices.
///
/// Lookup scans every entry, tables stay small enough that hashing does not
/// pay for itself. An index never changes once assigned, and is only handed
/// out again after `truncate` dropped everything that referred to it.
#[derive(Debug, Clone)]
pub struct SymbolTable<K = String> {
	symbols: Vec<K>,
}

impl<K> Default for SymbolTable<K> {
	fn default() -> Self { Self { symbols: Vec::new() } }
}

impl<K> SymbolTable<K> {
	pub fn new() -> Self { Self::default() }

	pub fn len(&self) -> usize { self.symbols.len() }

	pub fn is_empty(&self) -> bool { self.symbols.is_empty() }

	pub fn get(&self, index: usize) -> Option<&K> { self.symbols.get(index) }

	pub fn iter(&self) -> impl Iterator<Item = &K> { self.symbols.iter() }

	/// Append without checking for duplicates, returning the new index.
	pub fn add(&mut self, name: K) -> usize {
		self.symbols.push(name);
		self.symbols.len() - 1
	}

	/// Forget every symbol from index `len` on.
	pub fn truncate(&mut self, len: usize) { self.symbols.truncate(len); }

	pub fn index_of<Q>(&self, name: &Q) -> Option<usize>
	where
		K: Borrow<Q>,
		Q: PartialEq + ?Sized,
	{
		self.symbols.iter().position(|symbol| symbol.borrow() == name)
	}

	/// The index of `name`, adding it first if it is missing.
	pub fn ensure<Q>(&mut self, name: &Q) -> usize
	where
		K: Borrow<Q>,
		Q: PartialEq + ToOwned<Owned = K> + ?Sized,
	{
		match self.index_of(name) {
			Some(index) => index,
			None => self.add(name.to_owned()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn indices_are_dense_and_stable() {
		let mut table = SymbolTable::new();
		assert!(table.is_empty());
		assert_eq!(table.add("x".to_string()), 0);
		assert_eq!(table.add("y".to_string()), 1);
		assert_eq!(table.ensure("x"), 0);
		assert_eq!(table.ensure("z"), 2);
		assert_eq!(table.index_of("y"), Some(1));
		assert_eq!(table.index_of("w"), None);
		assert_eq!(table.get(2).map(String::as_str), Some("z"));
		assert_eq!(table.len(), 3);

		table.truncate(1);
		assert_eq!(table.index_of("y"), None);
		assert_eq!(table.add("w".to_string()), 1);
	}

	#[test]
	fn composite_keys() {
		#[derive(Debug, Clone, PartialEq)]
		enum Key {
			Plain(&'static str),
			Tagged(&'static str),
		}
		let mut table = SymbolTable::new();
		table.add(Key::Plain("f"));
		table.add(Key::Tagged("f"));
		assert_eq!(table.index_of(&Key::Tagged("f")), Some(1));
		assert_eq!(table.index_of(&Key::Plain("f")), Some(0));
	}
}
