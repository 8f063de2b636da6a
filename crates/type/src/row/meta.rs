// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{
	Result,
	error::diagnostic::schema::{field_type_mismatch, row_arity_mismatch},
	return_error,
	row::Row,
	value::ValueType,
};

/// Descriptor of one field in a row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMeta {
	pub name: String,
	#[serde(rename = "type")]
	pub value_type: ValueType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub length: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub precision: Option<u32>,
}

impl FieldMeta {
	pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
		Self {
			name: name.into(),
			value_type,
			length: None,
			precision: None,
		}
	}

	pub fn with_length(mut self, length: u32) -> Self {
		self.length = Some(length);
		self
	}

	pub fn with_precision(mut self, precision: u32) -> Self {
		self.precision = Some(precision);
		self
	}
}

/// Ordered field descriptors of a row layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowMeta {
	pub fields: Vec<FieldMeta>,
}

impl RowMeta {
	pub fn new(fields: Vec<FieldMeta>) -> Self {
		Self {
			fields,
		}
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn field(&self, index: usize) -> Option<&FieldMeta> {
		self.fields.get(index)
	}

	pub fn index_of(&self, name: &str) -> Option<usize> {
		self.fields.iter().position(|f| f.name == name)
	}

	pub fn push(&mut self, field: FieldMeta) {
		self.fields.push(field);
	}

	pub fn extend(&mut self, fields: impl IntoIterator<Item = FieldMeta>) {
		self.fields.extend(fields);
	}

	/// Check that `row` has one value per field and that every non-null value
	/// has the declared type.
	pub fn validate(&self, row: &Row) -> Result<()> {
		if row.len() != self.fields.len() {
			return_error!(row_arity_mismatch(self.fields.len(), row.len()));
		}

		for (field, value) in self.fields.iter().zip(row.iter()) {
			if let Some(actual) = value.value_type() {
				if actual != field.value_type {
					return_error!(field_type_mismatch(&field.name, field.value_type, Some(actual)));
				}
			}
		}

		Ok(())
	}
}

impl FromIterator<FieldMeta> for RowMeta {
	fn from_iter<T: IntoIterator<Item = FieldMeta>>(iter: T) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

impl Display for RowMeta {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		for (i, field) in self.fields.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{}:{}", field.name, field.value_type)?;
		}
		Ok(())
	}
}
