// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
};

use rowflow_type::Value;
use serde::{Deserialize, Serialize};

/// Comparison between a table column and zero, one or two stream values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
	#[default]
	#[serde(rename = "=")]
	Equal,
	#[serde(rename = "<>", alias = "!=")]
	NotEqual,
	#[serde(rename = "<")]
	Less,
	#[serde(rename = "<=")]
	LessOrEqual,
	#[serde(rename = ">")]
	Greater,
	#[serde(rename = ">=")]
	GreaterOrEqual,
	#[serde(rename = "LIKE", alias = "like")]
	Like,
	#[serde(rename = "BETWEEN", alias = "between")]
	Between,
	#[serde(rename = "IS NULL", alias = "is null")]
	IsNull,
	#[serde(rename = "IS NOT NULL", alias = "is not null")]
	IsNotNull,
}

impl Condition {
	/// Number of stream values the condition compares against.
	pub fn operands(&self) -> usize {
		match self {
			Condition::IsNull | Condition::IsNotNull => 0,
			Condition::Between => 2,
			_ => 1,
		}
	}

	pub fn as_sql(&self) -> &'static str {
		match self {
			Condition::Equal => "=",
			Condition::NotEqual => "<>",
			Condition::Less => "<",
			Condition::LessOrEqual => "<=",
			Condition::Greater => ">",
			Condition::GreaterOrEqual => ">=",
			Condition::Like => "LIKE",
			Condition::Between => "BETWEEN",
			Condition::IsNull => "IS NULL",
			Condition::IsNotNull => "IS NOT NULL",
		}
	}

	/// Evaluate against an in-memory column value with SQL null semantics:
	/// any comparison involving null is false.
	pub fn matches(&self, column: &Value, operands: &[Value]) -> bool {
		match self {
			Condition::IsNull => return column.is_null(),
			Condition::IsNotNull => return !column.is_null(),
			_ => {}
		}

		if column.is_null() || operands.len() < self.operands() || operands.iter().any(Value::is_null) {
			return false;
		}

		let cmp = |operand: &Value| column.compare(operand);
		match self {
			Condition::Equal => cmp(&operands[0]) == Ordering::Equal,
			Condition::NotEqual => cmp(&operands[0]) != Ordering::Equal,
			Condition::Less => cmp(&operands[0]) == Ordering::Less,
			Condition::LessOrEqual => cmp(&operands[0]) != Ordering::Greater,
			Condition::Greater => cmp(&operands[0]) == Ordering::Greater,
			Condition::GreaterOrEqual => cmp(&operands[0]) != Ordering::Less,
			Condition::Like => like(&column.to_string(), &operands[0].to_string()),
			Condition::Between => cmp(&operands[0]) != Ordering::Less && cmp(&operands[1]) != Ordering::Greater,
			Condition::IsNull | Condition::IsNotNull => false,
		}
	}
}

impl Display for Condition {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_sql())
	}
}

/// SQL `LIKE` matching where `%` matches any run of characters and `_`
/// matches exactly one. ASCII letters match regardless of case, as in SQLite.
pub fn like(text: &str, pattern: &str) -> bool {
	let text: Vec<char> = text.chars().collect();
	let pattern: Vec<char> = pattern.chars().collect();

	let (mut t, mut p) = (0usize, 0usize);
	let mut backtrack: Option<(usize, usize)> = None;

	while t < text.len() {
		if p < pattern.len() && (pattern[p] == '_' || pattern[p].eq_ignore_ascii_case(&text[t])) {
			t += 1;
			p += 1;
		} else if p < pattern.len() && pattern[p] == '%' {
			backtrack = Some((p, t));
			p += 1;
		} else if let Some((star, matched)) = backtrack {
			p = star + 1;
			t = matched + 1;
			backtrack = Some((star, matched + 1));
		} else {
			return false;
		}
	}

	pattern[p..].iter().all(|c| *c == '%')
}
