// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Bounded row channel between one producing and one consuming step copy.

use std::{
	fmt::{Display, Formatter},
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use rowflow_type::{
	Result, Row, RowMeta,
	error::diagnostic::schema::row_meta_mismatch,
	return_error,
};
use tracing::trace;

use crate::stop::StopFlag;

/// Identity of one copy of a step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StepRef {
	pub name: String,
	pub copy: usize,
}

impl StepRef {
	pub fn new(name: impl Into<String>, copy: usize) -> Self {
		Self {
			name: name.into(),
			copy,
		}
	}
}

impl Display for StepRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}", self.name, self.copy)
	}
}

pub type RowPair = (Arc<RowMeta>, Row);

pub struct RowSet {
	origin: StepRef,
	destination: StepRef,
	sender: Mutex<Option<Sender<RowPair>>>,
	receiver: Receiver<RowPair>,
	meta: Mutex<Option<Arc<RowMeta>>>,
	done: AtomicBool,
	written: AtomicU64,
	read: AtomicU64,
}

impl RowSet {
	pub fn new(origin: StepRef, destination: StepRef, capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity.max(1));
		Self {
			origin,
			destination,
			sender: Mutex::new(Some(sender)),
			receiver,
			meta: Mutex::new(None),
			done: AtomicBool::new(false),
			written: AtomicU64::new(0),
			read: AtomicU64::new(0),
		}
	}

	pub fn origin(&self) -> &StepRef {
		&self.origin
	}

	pub fn destination(&self) -> &StepRef {
		&self.destination
	}

	/// Layout of the rows on this channel, fixed by the first row written.
	pub fn meta(&self) -> Option<Arc<RowMeta>> {
		self.meta.lock().clone()
	}

	/// Write one row, waiting `timeout` at a time for free capacity until the
	/// row is accepted. Returns `false` when the row was not delivered because
	/// `stop` was raised or the channel was closed.
	pub fn put_row(&self, meta: &Arc<RowMeta>, row: Row, stop: &StopFlag, timeout: Duration) -> Result<bool> {
		let meta = self.fix_meta(meta, &row)?;

		let Some(sender) = self.sender.lock().clone() else {
			return Ok(false);
		};

		let mut pair = (meta, row);
		loop {
			match sender.send_timeout(pair, timeout) {
				Ok(()) => {
					self.written.fetch_add(1, Ordering::Relaxed);
					return Ok(true);
				}
				Err(SendTimeoutError::Timeout(returned)) => {
					if stop.is_stopped() {
						trace!(rowset = %self, "stopped while waiting for capacity");
						return Ok(false);
					}
					pair = returned;
				}
				Err(SendTimeoutError::Disconnected(_)) => return Ok(false),
			}
		}
	}

	/// Wait up to `timeout` for the next row.
	pub fn get_row(&self, timeout: Duration) -> Option<RowPair> {
		let received = if timeout.is_zero() {
			self.receiver.try_recv().ok()
		} else {
			match self.receiver.recv_timeout(timeout) {
				Ok(pair) => Some(pair),
				Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
			}
		};

		if received.is_some() {
			self.read.fetch_add(1, Ordering::Relaxed);
		}
		received
	}

	/// Signal that the producer will not write any more rows.
	pub fn set_done(&self) {
		self.done.store(true, Ordering::SeqCst);
		self.sender.lock().take();
	}

	pub fn is_done(&self) -> bool {
		self.done.load(Ordering::SeqCst)
	}

	/// Done and every row written has been read.
	pub fn is_finished(&self) -> bool {
		self.is_done() && self.receiver.is_empty()
	}

	pub fn size(&self) -> usize {
		self.receiver.len()
	}

	pub fn rows_written(&self) -> u64 {
		self.written.load(Ordering::Relaxed)
	}

	pub fn rows_read(&self) -> u64 {
		self.read.load(Ordering::Relaxed)
	}

	fn fix_meta(&self, meta: &Arc<RowMeta>, row: &Row) -> Result<Arc<RowMeta>> {
		meta.validate(row)?;

		let mut fixed = self.meta.lock();
		match fixed.as_ref() {
			None => {
				*fixed = Some(meta.clone());
				Ok(meta.clone())
			}
			Some(existing) if Arc::ptr_eq(existing, meta) || **existing == **meta => Ok(existing.clone()),
			Some(existing) => return_error!(row_meta_mismatch(self.to_string(), existing, meta)),
		}
	}
}

impl Display for RowSet {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} - {}", self.origin, self.destination)
	}
}
