// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::fmt::{Display, Formatter};

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

mod compare;
mod convert;
mod ordered_f64;
mod r#type;

pub use convert::{DEFAULT_DATE_FORMAT, parse_date};
pub use ordered_f64::OrderedF64;
pub use r#type::ValueType;

/// A single field value, represented as a native Rust type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
	/// Value is not defined (think null in common programming languages)
	Null,
	/// UTF-8 text
	String(String),
	/// An 8-byte signed integer
	Integer(i64),
	/// An 8-byte floating point
	Number(OrderedF64),
	/// A boolean: true or false.
	Boolean(bool),
	/// A date and time without timezone, millisecond precision in practice
	Date(NaiveDateTime),
	/// Raw bytes
	Binary(Vec<u8>),
	/// An arbitrary-precision decimal
	BigNumber(BigDecimal),
}

impl Value {
	pub fn null() -> Self {
		Value::Null
	}

	pub fn string(v: impl Into<String>) -> Self {
		Value::String(v.into())
	}

	pub fn integer(v: impl Into<i64>) -> Self {
		Value::Integer(v.into())
	}

	pub fn number(v: impl Into<f64>) -> Self {
		Value::Number(OrderedF64::from(v.into()))
	}

	pub fn boolean(v: bool) -> Self {
		Value::Boolean(v)
	}

	pub fn date(v: NaiveDateTime) -> Self {
		Value::Date(v)
	}

	pub fn binary(v: impl Into<Vec<u8>>) -> Self {
		Value::Binary(v.into())
	}

	pub fn big_number(v: BigDecimal) -> Self {
		Value::BigNumber(v)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			Value::Integer(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Value::Number(v) => Some(v.value()),
			_ => None,
		}
	}

	pub fn as_boolean(&self) -> Option<bool> {
		match self {
			Value::Boolean(v) => Some(*v),
			_ => None,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::String(v) => f.write_str(v),
			Value::Integer(v) => write!(f, "{}", v),
			Value::Number(v) => write!(f, "{}", v),
			Value::Boolean(v) => f.write_str(if *v { "Y" } else { "N" }),
			Value::Date(v) => write!(f, "{}", v.format(DEFAULT_DATE_FORMAT)),
			Value::Binary(v) => write!(f, "<{} bytes>", v.len()),
			Value::BigNumber(v) => write!(f, "{}", v),
		}
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Integer(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Integer(v as i64)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::number(v)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Boolean(v)
	}
}

impl From<NaiveDateTime> for Value {
	fn from(v: NaiveDateTime) -> Self {
		Value::Date(v)
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		Value::Binary(v)
	}
}

impl From<BigDecimal> for Value {
	fn from(v: BigDecimal) -> Self {
		Value::BigNumber(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or(Value::Null)
	}
}
