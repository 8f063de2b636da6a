// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use num_traits::FromPrimitive;

use crate::value::Value;

impl Value {
	/// Semantic ordering used by lookup conditions and sorting.
	///
	/// Null sorts before everything else. Integer, number and big number
	/// values compare by magnitude across kinds. Values of the same kind
	/// compare naturally, and any other mix orders by kind.
	pub fn compare(&self, other: &Value) -> Ordering {
		match (self, other) {
			(Value::Null, Value::Null) => Ordering::Equal,
			(Value::Null, _) => Ordering::Less,
			(_, Value::Null) => Ordering::Greater,

			(Value::String(l), Value::String(r)) => l.cmp(r),
			(Value::Integer(l), Value::Integer(r)) => l.cmp(r),
			(Value::Number(l), Value::Number(r)) => l.cmp(r),
			(Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
			(Value::Date(l), Value::Date(r)) => l.cmp(r),
			(Value::Binary(l), Value::Binary(r)) => l.cmp(r),
			(Value::BigNumber(l), Value::BigNumber(r)) => l.cmp(r),

			(Value::Integer(l), Value::Number(r)) => (*l as f64).total_cmp(&r.value()),
			(Value::Number(l), Value::Integer(r)) => l.value().total_cmp(&(*r as f64)),

			(Value::Integer(l), Value::BigNumber(r)) => BigDecimal::from(*l).cmp(r),
			(Value::BigNumber(l), Value::Integer(r)) => l.cmp(&BigDecimal::from(*r)),

			(Value::Number(l), Value::BigNumber(r)) => compare_float_big(l.value(), r),
			(Value::BigNumber(l), Value::Number(r)) => compare_float_big(r.value(), l).reverse(),

			(l, r) => rank(l).cmp(&rank(r)),
		}
	}
}

fn compare_float_big(l: f64, r: &BigDecimal) -> Ordering {
	match BigDecimal::from_f64(l) {
		Some(l) => l.cmp(r),
		None if l.is_sign_negative() => Ordering::Less,
		None => Ordering::Greater,
	}
}

fn rank(value: &Value) -> u8 {
	match value {
		Value::Null => 0,
		Value::Boolean(_) => 1,
		Value::Integer(_) | Value::Number(_) | Value::BigNumber(_) => 2,
		Value::String(_) => 3,
		Value::Date(_) => 4,
		Value::Binary(_) => 5,
	}
}
