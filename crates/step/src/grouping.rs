// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Accumulates input rows into groups.
//!
//! Size triggers are evaluated after the current row is appended. Field-change
//! and time triggers are evaluated against the rows buffered so far, before
//! the current row is appended, so the row that changes the value or arrives
//! late starts the next group. Time is only checked when a row arrives.

use std::{cmp::Ordering, sync::Arc};

use rowflow_core::StepError;
use rowflow_type::{Result, Row, RowMeta, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupPolicy {
	Size(usize),
	FieldChange(String),
	Time(i64),
}

impl GroupPolicy {
	/// A positive size wins over a group field, which wins over a positive
	/// time. Without any of them every row is its own group.
	pub fn select(size: usize, field: Option<&str>, time_millis: u64) -> GroupPolicy {
		if size > 0 {
			return GroupPolicy::Size(size);
		}

		if let Some(field) = field.map(str::trim).filter(|f| !f.is_empty()) {
			return GroupPolicy::FieldChange(field.to_string());
		}

		if time_millis > 0 {
			return GroupPolicy::Time(time_millis.min(i64::MAX as u64) as i64);
		}

		GroupPolicy::Size(1)
	}
}

/// Rows handed to one trigger, never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
	pub meta: Arc<RowMeta>,
	pub rows: Vec<Row>,
	/// Arrival time of the first row, in milliseconds
	pub started_at: i64,
}

impl Group {
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

pub struct GroupBuffer {
	step: String,
	policy: GroupPolicy,
	field_index: Option<usize>,
	previous: Option<Value>,
	meta: Option<Arc<RowMeta>>,
	rows: Vec<Row>,
	started_at: i64,
}

impl GroupBuffer {
	pub fn new(step: impl Into<String>, policy: GroupPolicy) -> Self {
		Self {
			step: step.into(),
			policy,
			field_index: None,
			previous: None,
			meta: None,
			rows: vec![],
			started_at: 0,
		}
	}

	pub fn policy(&self) -> &GroupPolicy {
		&self.policy
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Append `row`, arrived at `now`. Returns the group that this row
	/// completed, if any.
	pub fn push(&mut self, meta: &Arc<RowMeta>, row: Row, now: i64) -> Result<Option<Group>> {
		let mut completed = None;

		match &self.policy {
			GroupPolicy::FieldChange(field) => {
				let index = match self.field_index {
					Some(index) => index,
					None => {
						let Some(index) = meta.index_of(field) else {
							return Err(StepError::FieldNotFound {
								step: self.step.clone(),
								field: field.clone(),
							}
							.into());
						};
						self.field_index = Some(index);
						index
					}
				};

				let current = row.get(index).cloned().unwrap_or(Value::Null);
				if let Some(previous) = &self.previous {
					if previous.compare(&current) != Ordering::Equal {
						completed = self.take();
					}
				}
				self.previous = Some(current);
			}
			GroupPolicy::Time(millis) => {
				if !self.rows.is_empty() && now - self.started_at >= *millis {
					completed = self.take();
				}
			}
			GroupPolicy::Size(_) => {}
		}

		if self.rows.is_empty() {
			self.started_at = now;
			self.meta = Some(meta.clone());
		}
		self.rows.push(row);

		if let GroupPolicy::Size(size) = self.policy {
			if self.rows.len() >= size {
				completed = self.take();
			}
		}

		Ok(completed)
	}

	/// Flush whatever is buffered at end of input.
	pub fn finish(&mut self) -> Option<Group> {
		self.take()
	}

	/// Drop buffered rows without triggering.
	pub fn clear(&mut self) {
		self.rows.clear();
		self.meta = None;
	}

	fn take(&mut self) -> Option<Group> {
		if self.rows.is_empty() {
			return None;
		}

		let meta = self.meta.take()?;
		Some(Group {
			meta,
			rows: std::mem::take(&mut self.rows),
			started_at: self.started_at,
		})
	}
}
