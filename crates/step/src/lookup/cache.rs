// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use rowflow_type::Row;

use super::key::LookupKey;

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
	/// Return values, or the defaults when nothing was found
	pub values: Row,
	pub found: bool,
	stamp: u64,
}

/// Per-step memo of lookup results, bounded by `max_size` (0 is unbounded).
///
/// Entries are stamped from a logical counter on insert and on every hit.
/// When full, the entry with the oldest stamp is evicted before inserting.
#[derive(Debug)]
pub struct LookupCache {
	entries: HashMap<LookupKey, CacheEntry>,
	max_size: usize,
	clock: u64,
	hits: u64,
	misses: u64,
	evictions: u64,
}

impl LookupCache {
	pub fn new(max_size: usize) -> Self {
		Self {
			entries: HashMap::new(),
			max_size,
			clock: 0,
			hits: 0,
			misses: 0,
			evictions: 0,
		}
	}

	pub fn get(&mut self, key: &LookupKey) -> Option<&CacheEntry> {
		self.clock += 1;
		let stamp = self.clock;

		match self.entries.get_mut(key) {
			Some(entry) => {
				self.hits += 1;
				entry.stamp = stamp;
				Some(entry)
			}
			None => {
				self.misses += 1;
				None
			}
		}
	}

	pub fn contains(&self, key: &LookupKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn insert(&mut self, key: LookupKey, values: Row, found: bool) {
		if self.max_size > 0 && self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
			self.evict_oldest();
		}

		self.clock += 1;
		self.entries.insert(
			key,
			CacheEntry {
				values,
				found,
				stamp: self.clock,
			},
		);
	}

	fn evict_oldest(&mut self) {
		let oldest = self.entries.iter().min_by_key(|(_, entry)| entry.stamp).map(|(key, _)| key.clone());
		if let Some(key) = oldest {
			self.entries.remove(&key);
			self.evictions += 1;
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn max_size(&self) -> usize {
		self.max_size
	}

	pub fn hits(&self) -> u64 {
		self.hits
	}

	pub fn misses(&self) -> u64 {
		self.misses
	}

	pub fn evictions(&self) -> u64 {
		self.evictions
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}
}
