// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowflow_type::Value;
use smallvec::SmallVec;

/// Ordered, value-compared tuple of coerced stream values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LookupKey(SmallVec<[Value; 4]>);

impl LookupKey {
	pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
		Self(values.into_iter().collect())
	}

	pub fn values(&self) -> &[Value] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn has_null(&self) -> bool {
		self.0.iter().any(Value::is_null)
	}
}

impl FromIterator<Value> for LookupKey {
	fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
		Self::new(iter)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	#[test]
	fn test_key_equality_is_by_value() {
		let a = LookupKey::new([Value::string("NL"), Value::Integer(7), Value::number(1.5)]);
		let b: LookupKey = vec![Value::String("NL".to_string()), Value::integer(7), Value::number(1.5)].into_iter().collect();
		assert_eq!(a, b);

		let mut map = HashMap::new();
		map.insert(a, "hit");
		assert_eq!(map.get(&b), Some(&"hit"));
	}

	#[test]
	fn test_order_matters() {
		let a = LookupKey::new([Value::Integer(1), Value::Integer(2)]);
		let b = LookupKey::new([Value::Integer(2), Value::Integer(1)]);
		assert_ne!(a, b);
	}
}
