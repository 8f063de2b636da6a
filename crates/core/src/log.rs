// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Captured log text of one execution.
//!
//! Every step copy and every sub-execution writes into its own channel of the
//! [`LogContext`] it was handed. A channel lives until it is discarded, so a
//! long running parent must discard the channels of the sub-executions it has
//! finished reading.

use std::{
	collections::HashMap,
	fmt::{Display, Formatter},
	sync::Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogChannelId(Uuid);

impl LogChannelId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for LogChannelId {
	fn default() -> Self {
		Self::new()
	}
}

impl Display for LogChannelId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

#[derive(Clone, Debug, Default)]
pub struct LogContext {
	channels: Arc<Mutex<HashMap<LogChannelId, Vec<String>>>>,
}

impl LogContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn open_channel(&self) -> LogChannelId {
		let id = LogChannelId::new();
		self.channels.lock().insert(id, Vec::new());
		id
	}

	pub fn append_line(&self, channel: LogChannelId, line: impl Into<String>) {
		self.channels.lock().entry(channel).or_default().push(line.into());
	}

	/// All lines of `channel`, one per line, empty if the channel is unknown.
	pub fn read_all(&self, channel: LogChannelId) -> String {
		match self.channels.lock().get(&channel) {
			Some(lines) => lines.join("\n"),
			None => String::new(),
		}
	}

	pub fn discard(&self, channel: LogChannelId) {
		self.channels.lock().remove(&channel);
	}

	pub fn channel_count(&self) -> usize {
		self.channels.lock().len()
	}
}
