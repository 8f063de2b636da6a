// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Enriches each row with fields looked up in an external table.

use std::{collections::HashMap, sync::Arc};

use rowflow_core::{Step, StepContext, StepError};
use rowflow_type::{Error, FieldMeta, IntoDiagnostic, Result, Row, RowMeta, Value, ValueType, internal_error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

mod cache;
mod condition;
mod key;
mod sqlite;
mod store;

pub use cache::{CacheEntry, LookupCache};
pub use condition::{Condition, like};
pub use key::LookupKey;
pub use sqlite::{SqliteConnector, SqliteStore};
pub use store::{LookupQuery, LookupStore, MemoryConnector, MemoryStore, MemoryTable, QueryKey, StoreConnector};

use crate::error::LookupError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyField {
	pub table_field: String,
	#[serde(default)]
	pub condition: Condition,
	#[serde(default)]
	pub stream_field: Option<String>,
	/// Upper bound of a `BETWEEN`
	#[serde(default)]
	pub stream_field2: Option<String>,
}

impl KeyField {
	pub fn new(table_field: impl Into<String>, condition: Condition) -> Self {
		Self {
			table_field: table_field.into(),
			condition,
			stream_field: None,
			stream_field2: None,
		}
	}

	pub fn with_stream_field(mut self, field: impl Into<String>) -> Self {
		self.stream_field = Some(field.into());
		self
	}

	pub fn with_stream_field2(mut self, field: impl Into<String>) -> Self {
		self.stream_field2 = Some(field.into());
		self
	}

	fn stream_fields(&self) -> Vec<Option<&str>> {
		let fields = [self.stream_field.as_deref(), self.stream_field2.as_deref()];
		fields.into_iter().take(self.condition.operands()).collect()
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnField {
	pub table_field: String,
	#[serde(default)]
	pub rename: Option<String>,
	#[serde(default)]
	pub default: Option<String>,
	#[serde(default = "default_return_type")]
	pub default_type: ValueType,
}

fn default_return_type() -> ValueType {
	ValueType::String
}

impl ReturnField {
	pub fn new(table_field: impl Into<String>) -> Self {
		Self {
			table_field: table_field.into(),
			rename: None,
			default: None,
			default_type: ValueType::String,
		}
	}

	pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
		self.rename = Some(rename.into());
		self
	}

	pub fn with_default(mut self, default: impl Into<String>, default_type: ValueType) -> Self {
		self.default = Some(default.into());
		self.default_type = default_type;
		self
	}

	pub fn output_name(&self) -> &str {
		self.rename.as_deref().filter(|r| !r.is_empty()).unwrap_or(&self.table_field)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseLookupConfig {
	pub connection: String,
	pub table: String,
	#[serde(default)]
	pub keys: Vec<KeyField>,
	pub returns: Vec<ReturnField>,
	#[serde(default)]
	pub order_by: Option<String>,

	#[serde(default)]
	pub cache: bool,
	/// Maximum cached keys, 0 is unbounded
	#[serde(default)]
	pub cache_size: usize,
	#[serde(default)]
	pub load_all_from_table: bool,

	#[serde(default)]
	pub fail_on_multiple_results: bool,
	#[serde(default)]
	pub eat_row_on_failure: bool,
}

impl DatabaseLookupConfig {
	pub fn new(connection: impl Into<String>, table: impl Into<String>) -> Self {
		Self {
			connection: connection.into(),
			table: table.into(),
			keys: vec![],
			returns: vec![],
			order_by: None,
			cache: false,
			cache_size: 0,
			load_all_from_table: false,
			fail_on_multiple_results: false,
			eat_row_on_failure: false,
		}
	}

	pub fn with_key(mut self, key: KeyField) -> Self {
		self.keys.push(key);
		self
	}

	pub fn with_return(mut self, field: ReturnField) -> Self {
		self.returns.push(field);
		self
	}

	fn query(&self) -> LookupQuery {
		LookupQuery {
			table: self.table.clone(),
			keys: self
				.keys
				.iter()
				.map(|k| QueryKey {
					column: k.table_field.clone(),
					condition: k.condition,
				})
				.collect(),
			returns: self.returns.iter().map(|r| r.table_field.clone()).collect(),
			order_by: self.order_by.clone(),
		}
	}
}

/// In-memory copy of the whole table.
enum LoadedTable {
	/// Every key term is `=`: exact match through a hash index, first row wins
	Indexed(HashMap<LookupKey, Row>),
	/// Key columns and return values of every row, matched by scanning
	Scan(Vec<(Row, Row)>),
}

/// Everything derived from the layout of the first input row.
struct Prepared {
	input_meta: Arc<RowMeta>,
	output_meta: Arc<RowMeta>,
	/// Input index and target type of every key operand, flattened
	key_sources: Vec<(usize, Option<ValueType>)>,
}

pub struct DatabaseLookupStep {
	config: DatabaseLookupConfig,
	connector: Arc<dyn StoreConnector>,
	store: Option<Box<dyn LookupStore>>,
	query: LookupQuery,
	key_types: Vec<Option<ValueType>>,
	/// Column type of every return field, the field's default type when the store has none
	return_types: Vec<ValueType>,
	defaults: Row,
	prepared: Option<Prepared>,
	cache: Option<LookupCache>,
	table: Option<LoadedTable>,
	queries: u64,
	not_found: u64,
}

impl DatabaseLookupStep {
	pub fn new(config: DatabaseLookupConfig, connector: Arc<dyn StoreConnector>) -> Self {
		let query = config.query();
		Self {
			config,
			connector,
			store: None,
			query,
			key_types: vec![],
			return_types: vec![],
			defaults: Row::default(),
			prepared: None,
			cache: None,
			table: None,
			queries: 0,
			not_found: 0,
		}
	}

	pub fn config(&self) -> &DatabaseLookupConfig {
		&self.config
	}

	pub fn cache(&self) -> Option<&LookupCache> {
		self.cache.as_ref()
	}

	/// Keyed queries sent to the store.
	pub fn queries(&self) -> u64 {
		self.queries
	}

	fn invalid(&self, ctx: &StepContext, reason: impl Into<String>) -> Error {
		StepError::InvalidConfiguration {
			step: ctx.name().to_string(),
			reason: reason.into(),
		}
		.into()
	}

	fn validate(&self, ctx: &StepContext) -> Result<()> {
		if self.config.connection.is_empty() {
			return Err(self.invalid(ctx, "no connection configured"));
		}
		if self.config.table.is_empty() {
			return Err(self.invalid(ctx, "no lookup table configured"));
		}
		if self.config.returns.is_empty() {
			return Err(self.invalid(ctx, "no return fields configured"));
		}

		for key in &self.config.keys {
			if key.stream_fields().iter().any(|f| f.is_none_or(str::is_empty)) {
				return Err(self.invalid(
					ctx,
					format!(
						"key on '{}' with condition {} needs {} stream field(s)",
						key.table_field,
						key.condition,
						key.condition.operands()
					),
				));
			}
		}
		Ok(())
	}

	/// Typed default for every return field, null where none is configured.
	fn typed_defaults(&self, ctx: &StepContext) -> Result<Row> {
		self.config
			.returns
			.iter()
			.zip(&self.return_types)
			.map(|(field, target)| match &field.default {
				Some(default) => {
					Value::string(ctx.variables().substitute(default)).convert_to(*target).map_err(|err| {
						Error::new(
							StepError::InvalidConfiguration {
								step: ctx.name().to_string(),
								reason: format!("invalid default for '{}'", field.output_name()),
							}
							.into_diagnostic()
							.with_cause(err.diagnostic()),
						)
					})
				}
				None => Ok(Value::Null),
			})
			.collect()
	}

	fn prepare(&mut self, ctx: &mut StepContext, meta: &Arc<RowMeta>) -> Result<()> {
		let mut key_sources = Vec::with_capacity(self.query.operand_count());
		for (key, key_type) in self.config.keys.iter().zip(&self.key_types) {
			for field in key.stream_fields().into_iter().flatten() {
				let Some(index) = meta.index_of(field) else {
					return Err(StepError::FieldNotFound {
						step: ctx.name().to_string(),
						field: field.to_string(),
					}
					.into());
				};
				key_sources.push((index, *key_type));
			}
		}

		let mut output = RowMeta::new(meta.fields.clone());
		for (field, value_type) in self.config.returns.iter().zip(&self.return_types) {
			output.push(FieldMeta::new(field.output_name(), *value_type));
		}

		if self.config.load_all_from_table {
			self.table = Some(self.load_table(ctx)?);
		}

		debug!(step = %ctx.step(), input = %meta, output = %output, "lookup prepared");
		self.prepared = Some(Prepared {
			input_meta: meta.clone(),
			output_meta: Arc::new(output),
			key_sources,
		});
		Ok(())
	}

	#[instrument(name = "lookup::load_all", level = "debug", skip_all, fields(step = %ctx.step(), table = %self.config.table))]
	fn load_table(&mut self, ctx: &mut StepContext) -> Result<LoadedTable> {
		let Some(store) = self.store.as_mut() else {
			return Err(rowflow_type::error!(internal_error!("lookup {} has no store", ctx.step())));
		};

		let mut columns: Vec<String> = self.query.keys.iter().map(|k| k.column.clone()).collect();
		columns.extend(self.query.returns.iter().cloned());

		let key_width = self.query.keys.len();
		let rows = store.load_all(&self.config.table, &columns)?;
		ctx.counters_mut().lines_input += rows.len() as u64;

		let mut loaded = Vec::with_capacity(rows.len());
		for row in rows {
			let mut values = row.into_values();
			let returns = values.split_off(key_width.min(values.len()));
			let keys = values
				.iter()
				.zip(&self.key_types)
				.map(|(value, key_type)| convert(value, *key_type))
				.collect::<Result<Row>>()?;
			let returns = self.conform_returns(Row::new(returns))?;
			loaded.push((keys, returns));
		}

		let indexed = self.query.keys.iter().all(|k| k.condition == Condition::Equal);
		debug!(rows = loaded.len(), indexed, "lookup table loaded");

		if !indexed {
			return Ok(LoadedTable::Scan(loaded));
		}

		let mut index = HashMap::with_capacity(loaded.len());
		for (keys, returns) in loaded {
			let key = LookupKey::new(keys.into_values());
			if !key.has_null() {
				index.entry(key).or_insert(returns);
			}
		}
		Ok(LoadedTable::Indexed(index))
	}

	/// Convert looked-up values to the declared column types.
	fn conform_returns(&self, row: Row) -> Result<Row> {
		row.into_iter().zip(&self.return_types).map(|(value, value_type)| value.convert_to(*value_type)).collect()
	}

	fn key_for(&self, ctx: &StepContext, prepared: &Prepared, row: &Row) -> Result<LookupKey> {
		prepared.key_sources
			.iter()
			.map(|(index, key_type)| {
				let value = row.get(*index).cloned().unwrap_or(Value::Null);
				convert(&value, *key_type).map_err(|err| {
					let field = prepared.input_meta.field(*index).map(|f| f.name.as_str()).unwrap_or("?");
					Error::new(
						StepError::RowProcessing {
							step: ctx.name().to_string(),
							reason: format!("cannot convert key field '{}'", field),
						}
						.into_diagnostic()
						.with_cause(err.diagnostic()),
					)
				})
			})
			.collect()
	}

	/// Return values for `key`, `None` when nothing matches.
	fn find(&mut self, ctx: &mut StepContext, key: &LookupKey) -> Result<Option<Row>> {
		if let Some(table) = &self.table {
			return Ok(self.find_loaded(table, key));
		}

		if let Some(entry) = self.cache.as_mut().and_then(|cache| cache.get(key)) {
			return Ok(entry.found.then(|| entry.values.clone()));
		}

		let Some(store) = self.store.as_mut() else {
			return Err(rowflow_type::error!(internal_error!("lookup {} has no store", ctx.step())));
		};

		let rows = store.lookup(&self.query, key.values())?;
		self.queries += 1;
		ctx.counters_mut().lines_input += 1;

		if rows.len() > 1 && self.config.fail_on_multiple_results {
			return Err(LookupError::MultipleResults {
				table: self.config.table.clone(),
			}
			.into());
		}

		let found = match rows.into_iter().next() {
			Some(row) => Some(self.conform_returns(row)?),
			None => None,
		};

		if let Some(cache) = self.cache.as_mut() {
			let values = found.clone().unwrap_or_else(|| self.defaults.clone());
			cache.insert(key.clone(), values, found.is_some());
		}
		Ok(found)
	}

	fn find_loaded(&self, table: &LoadedTable, key: &LookupKey) -> Option<Row> {
		match table {
			LoadedTable::Indexed(index) => {
				if key.has_null() {
					return None;
				}
				index.get(key).cloned()
			}
			LoadedTable::Scan(rows) => rows
				.iter()
				.find(|(columns, _)| {
					let mut offset = 0;
					self.query.keys.iter().zip(columns.iter()).all(|(k, column)| {
						let count = k.condition.operands();
						let operands = key.values().get(offset..offset + count).unwrap_or(&[]);
						offset += count;
						k.condition.matches(column, operands)
					})
				})
				.map(|(_, returns)| returns.clone()),
		}
	}
}

fn convert(value: &Value, target: Option<ValueType>) -> Result<Value> {
	match target {
		Some(target) => value.convert_to(target),
		None => Ok(value.clone()),
	}
}

impl Step for DatabaseLookupStep {
	fn init(&mut self, ctx: &mut StepContext) -> Result<()> {
		self.validate(ctx)?;

		let mut store = self.connector.connect(&self.config.connection).map_err(|err| {
			Error::new(
				StepError::InvalidConfiguration {
					step: ctx.name().to_string(),
					reason: format!("cannot connect to '{}'", self.config.connection),
				}
				.into_diagnostic()
				.with_cause(err.diagnostic()),
			)
		})?;

		let unresolvable = |err: Error| {
			Error::new(
				StepError::InvalidConfiguration {
					step: ctx.name().to_string(),
					reason: format!("cannot resolve lookup table '{}'", self.config.table),
				}
				.into_diagnostic()
				.with_cause(err.diagnostic()),
			)
		};
		let key_columns: Vec<String> = self.query.keys.iter().map(|k| k.column.clone()).collect();
		self.key_types = store.column_types(&self.config.table, &key_columns).map_err(unresolvable)?;
		let column_types = store.column_types(&self.config.table, &self.query.returns).map_err(unresolvable)?;
		self.return_types = self
			.config
			.returns
			.iter()
			.zip(column_types)
			.map(|(field, column_type)| column_type.unwrap_or(field.default_type))
			.collect();

		self.store = Some(store);
		self.defaults = self.typed_defaults(ctx)?;

		if self.config.cache && !self.config.load_all_from_table {
			self.cache = Some(LookupCache::new(self.config.cache_size));
		}

		debug!(
			step = %ctx.step(),
			connection = %self.config.connection,
			table = %self.config.table,
			cache = self.cache.is_some(),
			load_all = self.config.load_all_from_table,
			"lookup initialized"
		);
		Ok(())
	}

	fn process_row(&mut self, ctx: &mut StepContext) -> Result<bool> {
		let Some((meta, row)) = ctx.get_row() else {
			ctx.set_output_done();
			return Ok(false);
		};

		if self.prepared.is_none() {
			self.prepare(ctx, &meta)?;
		}
		let Some(prepared) = self.prepared.take() else {
			return Err(rowflow_type::error!(internal_error!("lookup {} is not prepared", ctx.step())));
		};

		let result = self.lookup_row(ctx, &prepared, row);
		self.prepared = Some(prepared);
		result?;
		Ok(true)
	}

	fn dispose(&mut self, ctx: &mut StepContext) {
		if let Some(mut store) = self.store.take() {
			store.close();
		}
		self.table = None;
		self.prepared = None;

		let (hits, misses) = self.cache.as_ref().map(|c| (c.hits(), c.misses())).unwrap_or_default();
		if let Some(cache) = self.cache.as_mut() {
			cache.clear();
		}

		info!(
			step = %ctx.step(),
			queries = self.queries,
			not_found = self.not_found,
			cache_hits = hits,
			cache_misses = misses,
			"lookup finished"
		);
		ctx.log_line(format!("{} queries, {} not found, {} cache hits", self.queries, self.not_found, hits));
	}
}

impl DatabaseLookupStep {
	fn lookup_row(&mut self, ctx: &mut StepContext, prepared: &Prepared, row: Row) -> Result<()> {
		let key = self.key_for(ctx, prepared, &row)?;

		let values = match self.find(ctx, &key)? {
			Some(values) => values,
			None => {
				self.not_found += 1;
				if self.config.eat_row_on_failure {
					return Ok(());
				}
				self.defaults.clone()
			}
		};

		ctx.put_row(&prepared.output_meta, row.concat(values))
	}
}
