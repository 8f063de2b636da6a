// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Row sets connecting a transformation to the code that runs it.

use std::{sync::Arc, time::Duration};

use rowflow_core::{RowPair, RowSet, StopFlag};
use rowflow_type::{Result, Row, RowMeta};

/// Feeds rows into every copy of one step, round-robin.
///
/// Dropping the producer marks its row sets done.
pub struct RowProducer {
	rowsets: Vec<Arc<RowSet>>,
	stop: StopFlag,
	timeout: Duration,
	cursor: usize,
}

impl RowProducer {
	pub(crate) fn new(rowsets: Vec<Arc<RowSet>>, stop: StopFlag, timeout: Duration) -> Self {
		Self {
			rowsets,
			stop,
			timeout,
			cursor: 0,
		}
	}

	/// Returns `false` once the execution is stopped.
	pub fn put_row(&mut self, meta: &Arc<RowMeta>, row: Row) -> Result<bool> {
		if self.rowsets.is_empty() {
			return Ok(false);
		}

		let index = self.cursor % self.rowsets.len();
		self.cursor = index + 1;
		self.rowsets[index].put_row(meta, row, &self.stop, self.timeout)
	}

	pub fn put_rows(&mut self, meta: &Arc<RowMeta>, rows: impl IntoIterator<Item = Row>) -> Result<usize> {
		let mut written = 0;
		for row in rows {
			if !self.put_row(meta, row)? {
				break;
			}
			written += 1;
		}
		Ok(written)
	}

	/// Signal that no more rows follow.
	pub fn finish(self) {}
}

impl Drop for RowProducer {
	fn drop(&mut self) {
		for rowset in &self.rowsets {
			rowset.set_done();
		}
	}
}

/// Receives what every copy of one step writes.
pub struct RowCollector {
	rowsets: Vec<Arc<RowSet>>,
	timeout: Duration,
	cursor: usize,
}

impl RowCollector {
	pub(crate) fn new(rowsets: Vec<Arc<RowSet>>, timeout: Duration) -> Self {
		Self {
			rowsets,
			timeout,
			cursor: 0,
		}
	}

	/// Next row from any copy, `None` once every copy is done and drained.
	pub fn next_row(&mut self) -> Option<RowPair> {
		loop {
			if self.is_finished() {
				return None;
			}

			let index = self.cursor % self.rowsets.len();
			self.cursor = index + 1;
			if let Some(pair) = self.rowsets[index].get_row(self.timeout) {
				return Some(pair);
			}
		}
	}

	/// Every remaining row, blocking until the step is done.
	pub fn collect_rows(&mut self) -> Vec<Row> {
		let mut rows = vec![];
		while let Some((_, row)) = self.next_row() {
			rows.push(row);
		}
		rows
	}

	/// Row meta of the first row that arrived, if any did.
	pub fn meta(&self) -> Option<Arc<RowMeta>> {
		self.rowsets.iter().find_map(|rs| rs.meta())
	}

	pub fn is_finished(&self) -> bool {
		self.rowsets.iter().all(|rs| rs.is_finished())
	}
}

#[cfg(test)]
mod tests {
	use rowflow_core::StepRef;
	use rowflow_type::{FieldMeta, ValueType, row};

	use super::*;

	const WAIT: Duration = Duration::from_millis(1);

	fn rowsets(n: usize) -> Vec<Arc<RowSet>> {
		(0..n).map(|copy| Arc::new(RowSet::new(StepRef::new("driver", 0), StepRef::new("step", copy), 10))).collect()
	}

	#[test]
	fn test_producer_spreads_rows_and_finishes_on_drop() {
		let rowsets = rowsets(2);
		let meta = Arc::new(RowMeta::new(vec![FieldMeta::new("n", ValueType::Integer)]));

		let mut producer = RowProducer::new(rowsets.clone(), StopFlag::new(), WAIT);
		assert_eq!(producer.put_rows(&meta, (0..5i64).map(|i| row![i])).unwrap(), 5);
		producer.finish();

		assert_eq!(rowsets[0].size(), 3);
		assert_eq!(rowsets[1].size(), 2);
		assert!(rowsets.iter().all(|rs| rs.is_done()));

		let mut collector = RowCollector::new(rowsets, WAIT);
		assert_eq!(collector.collect_rows().len(), 5);
		assert!(collector.is_finished());
	}

	#[test]
	fn test_stopped_producer_writes_nothing() {
		let stop = StopFlag::new();
		stop.stop();
		let rowsets = vec![Arc::new(RowSet::new(StepRef::new("driver", 0), StepRef::new("step", 0), 1))];
		let meta = Arc::new(RowMeta::new(vec![FieldMeta::new("n", ValueType::Integer)]));

		let mut producer = RowProducer::new(rowsets, stop, WAIT);
		assert!(producer.put_row(&meta, row![1i64]).unwrap());
		assert!(!producer.put_row(&meta, row![2i64]).unwrap());
	}
}
