// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::diagnostic::conversion::unknown_type, value::Value};

/// Semantic type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	String,
	Integer,
	Number,
	Boolean,
	Date,
	Binary,
	#[serde(alias = "big_number")]
	BigNumber,
}

impl ValueType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ValueType::String => "string",
			ValueType::Integer => "integer",
			ValueType::Number => "number",
			ValueType::Boolean => "boolean",
			ValueType::Date => "date",
			ValueType::Binary => "binary",
			ValueType::BigNumber => "bignumber",
		}
	}

	pub fn is_numeric(&self) -> bool {
		matches!(self, ValueType::Integer | ValueType::Number | ValueType::BigNumber)
	}
}

impl Display for ValueType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ValueType {
	type Err = crate::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"string" | "text" => Ok(ValueType::String),
			"integer" | "int" => Ok(ValueType::Integer),
			"number" | "float" => Ok(ValueType::Number),
			"boolean" | "bool" => Ok(ValueType::Boolean),
			"date" | "timestamp" => Ok(ValueType::Date),
			"binary" | "blob" => Ok(ValueType::Binary),
			"bignumber" | "big_number" | "decimal" => Ok(ValueType::BigNumber),
			other => crate::err!(unknown_type(other)),
		}
	}
}

impl Value {
	/// Semantic type of this value, `None` for null.
	pub fn value_type(&self) -> Option<ValueType> {
		match self {
			Value::Null => None,
			Value::String(_) => Some(ValueType::String),
			Value::Integer(_) => Some(ValueType::Integer),
			Value::Number(_) => Some(ValueType::Number),
			Value::Boolean(_) => Some(ValueType::Boolean),
			Value::Date(_) => Some(ValueType::Date),
			Value::Binary(_) => Some(ValueType::Binary),
			Value::BigNumber(_) => Some(ValueType::BigNumber),
		}
	}
}
