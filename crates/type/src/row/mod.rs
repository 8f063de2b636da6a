// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	ops::{Deref, DerefMut},
};

mod meta;

pub use meta::{FieldMeta, RowMeta};

use crate::value::Value;

/// An ordered, fixed-arity tuple of values. Its layout is described by a
/// separate [`RowMeta`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Row(pub Vec<Value>);

impl Row {
	pub fn new(values: Vec<Value>) -> Self {
		Self(values)
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self(Vec::with_capacity(capacity))
	}

	pub fn values(&self) -> &[Value] {
		&self.0
	}

	pub fn into_values(self) -> Vec<Value> {
		self.0
	}

	/// Append `other` after the values of this row.
	pub fn concat(mut self, other: impl IntoIterator<Item = Value>) -> Self {
		self.0.extend(other);
		self
	}
}

impl Deref for Row {
	type Target = Vec<Value>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Row {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl From<Vec<Value>> for Row {
	fn from(values: Vec<Value>) -> Self {
		Self(values)
	}
}

impl FromIterator<Value> for Row {
	fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for Row {
	type Item = Value;
	type IntoIter = std::vec::IntoIter<Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a Row {
	type Item = &'a Value;
	type IntoIter = std::slice::Iter<'a, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

impl Display for Row {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("[")?;
		for (i, value) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{}", value)?;
		}
		f.write_str("]")
	}
}

/// Build a [`Row`] from values convertible into [`Value`].
#[macro_export]
macro_rules! row {
	() => {
		$crate::row::Row::default()
	};
	($($value:expr),+ $(,)?) => {
		$crate::row::Row::new(vec![$($crate::value::Value::from($value)),+])
	};
}
