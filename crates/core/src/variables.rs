// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named string variables visible to a step or a job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables {
	values: BTreeMap<String, String>,
}

impl Variables {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.values.get(name).map(String::as_str)
	}

	pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.values.insert(name.into(), value.into());
	}

	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.values.remove(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Copy every variable of `other` into this scope, overwriting existing
	/// values with the same name.
	pub fn inherit(&mut self, other: &Variables) {
		for (name, value) in other.iter() {
			self.set(name, value);
		}
	}

	/// Replace `${NAME}` and `%%NAME%%` references with variable values.
	/// Unknown references are kept as written.
	pub fn substitute(&self, text: &str) -> String {
		let text = self.substitute_delimited(text, "${", "}");
		self.substitute_delimited(&text, "%%", "%%")
	}

	fn substitute_delimited(&self, text: &str, open: &str, close: &str) -> String {
		let mut out = String::with_capacity(text.len());
		let mut rest = text;

		while let Some(start) = rest.find(open) {
			out.push_str(&rest[..start]);
			let after_open = &rest[start + open.len()..];

			match after_open.find(close) {
				Some(end) => {
					let name = &after_open[..end];
					match self.get(name) {
						Some(value) if !name.is_empty() => out.push_str(value),
						_ => {
							out.push_str(open);
							out.push_str(name);
							out.push_str(close);
						}
					}
					rest = &after_open[end + close.len()..];
				}
				None => {
					out.push_str(&rest[start..]);
					rest = "";
				}
			}
		}

		out.push_str(rest);
		out
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		let mut variables = Variables::new();
		for (name, value) in iter {
			variables.set(name, value);
		}
		variables
	}
}
