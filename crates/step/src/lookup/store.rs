// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	cmp::Ordering,
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering as AtomicOrdering},
	},
};

use parking_lot::RwLock;
use rowflow_type::{FieldMeta, Result, Row, Value, ValueType};

use super::condition::Condition;
use crate::error::LookupError;

/// One `column <condition>` term of a lookup query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryKey {
	pub column: String,
	pub condition: Condition,
}

/// A keyed query against a single table.
///
/// Key values are passed flattened: the operands of every key term in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupQuery {
	pub table: String,
	pub keys: Vec<QueryKey>,
	pub returns: Vec<String>,
	pub order_by: Option<String>,
}

impl LookupQuery {
	pub fn operand_count(&self) -> usize {
		self.keys.iter().map(|k| k.condition.operands()).sum()
	}
}

/// A connected external store.
pub trait LookupStore: Send {
	/// Declared type of each column, `None` where the store cannot tell.
	fn column_types(&mut self, table: &str, columns: &[String]) -> Result<Vec<Option<ValueType>>>;

	/// Projected `returns` of at most two matching rows, in `order_by` order.
	fn lookup(&mut self, query: &LookupQuery, key: &[Value]) -> Result<Vec<Row>>;

	/// Every row of `table`, projected to `columns`.
	fn load_all(&mut self, table: &str, columns: &[String]) -> Result<Vec<Row>>;

	fn close(&mut self) {}
}

/// Opens stores by connection name.
pub trait StoreConnector: Send + Sync {
	fn connect(&self, connection: &str) -> Result<Box<dyn LookupStore>>;
}

/// Parses `col [ASC|DESC], ...` into columns with a descending flag.
pub(crate) fn parse_order_by(order_by: &str) -> Vec<(String, bool)> {
	order_by
		.split(',')
		.filter_map(|term| {
			let mut parts = term.split_whitespace();
			let column = parts.next()?.trim_matches('"').to_string();
			let descending = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
			Some((column, descending))
		})
		.collect()
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
	pub columns: Vec<FieldMeta>,
	pub rows: Vec<Row>,
}

impl MemoryTable {
	pub fn new(columns: Vec<FieldMeta>) -> Self {
		Self {
			columns,
			rows: vec![],
		}
	}

	pub fn with_row(mut self, row: Row) -> Self {
		self.rows.push(row);
		self
	}

	fn index_of(&self, table: &str, column: &str) -> Result<usize> {
		self.columns.iter().position(|c| c.name == column).ok_or_else(|| {
			LookupError::ColumnNotFound {
				table: table.to_string(),
				column: column.to_string(),
			}
			.into()
		})
	}
}

type Databases = HashMap<String, HashMap<String, MemoryTable>>;

/// Connector over in-process tables, shared by every store it opens.
#[derive(Clone, Default)]
pub struct MemoryConnector {
	databases: Arc<RwLock<Databases>>,
	queries: Arc<AtomicU64>,
}

impl MemoryConnector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_table(self, connection: &str, table: &str, data: MemoryTable) -> Self {
		self.insert_table(connection, table, data);
		self
	}

	pub fn insert_table(&self, connection: &str, table: &str, data: MemoryTable) {
		self.databases.write().entry(connection.to_string()).or_default().insert(table.to_string(), data);
	}

	pub fn insert_row(&self, connection: &str, table: &str, row: Row) {
		if let Some(data) = self.databases.write().get_mut(connection).and_then(|tables| tables.get_mut(table)) {
			data.rows.push(row);
		}
	}

	/// Number of keyed queries served so far.
	pub fn queries(&self) -> u64 {
		self.queries.load(AtomicOrdering::Relaxed)
	}
}

impl StoreConnector for MemoryConnector {
	fn connect(&self, connection: &str) -> Result<Box<dyn LookupStore>> {
		if !self.databases.read().contains_key(connection) {
			return Err(LookupError::UnknownConnection {
				connection: connection.to_string(),
			}
			.into());
		}

		Ok(Box::new(MemoryStore {
			connection: connection.to_string(),
			databases: self.databases.clone(),
			queries: self.queries.clone(),
		}))
	}
}

pub struct MemoryStore {
	connection: String,
	databases: Arc<RwLock<Databases>>,
	queries: Arc<AtomicU64>,
}

impl MemoryStore {
	fn with_table<T>(&self, table: &str, f: impl FnOnce(&MemoryTable) -> Result<T>) -> Result<T> {
		let databases = self.databases.read();
		let data = databases.get(&self.connection).and_then(|tables| tables.get(table)).ok_or_else(|| {
			LookupError::TableNotFound {
				table: table.to_string(),
			}
		})?;
		f(data)
	}
}

const NULL: &Value = &Value::Null;

/// Value at `index`, null for rows shorter than the table's columns.
fn cell(row: &Row, index: usize) -> &Value {
	row.get(index).unwrap_or(NULL)
}

fn project(row: &Row, indices: &[usize]) -> Row {
	indices.iter().map(|&i| cell(row, i).clone()).collect()
}

impl LookupStore for MemoryStore {
	fn column_types(&mut self, table: &str, columns: &[String]) -> Result<Vec<Option<ValueType>>> {
		self.with_table(table, |data| {
			columns.iter()
				.map(|column| data.index_of(table, column).map(|i| Some(data.columns[i].value_type)))
				.collect()
		})
	}

	fn lookup(&mut self, query: &LookupQuery, key: &[Value]) -> Result<Vec<Row>> {
		self.queries.fetch_add(1, AtomicOrdering::Relaxed);

		self.with_table(&query.table, |data| {
			let conditions = query
				.keys
				.iter()
				.map(|k| data.index_of(&query.table, &k.column).map(|i| (i, k.condition)))
				.collect::<Result<Vec<_>>>()?;
			let returns = query
				.returns
				.iter()
				.map(|column| data.index_of(&query.table, column))
				.collect::<Result<Vec<_>>>()?;

			let mut matched: Vec<&Row> = data
				.rows
				.iter()
				.filter(|row| {
					let mut offset = 0;
					conditions.iter().all(|(index, condition)| {
						let operands = key.get(offset..offset + condition.operands()).unwrap_or(&[]);
						offset += condition.operands();
						condition.matches(cell(row, *index), operands)
					})
				})
				.collect();

			if let Some(order_by) = &query.order_by {
				let order = parse_order_by(order_by)
					.into_iter()
					.map(|(column, descending)| data.index_of(&query.table, &column).map(|i| (i, descending)))
					.collect::<Result<Vec<_>>>()?;

				matched.sort_by(|a, b| {
					order.iter()
						.map(|(i, descending)| {
							let ordering = cell(a, *i).compare(cell(b, *i));
							if *descending { ordering.reverse() } else { ordering }
						})
						.find(|o| *o != Ordering::Equal)
						.unwrap_or(Ordering::Equal)
				});
			}

			Ok(matched.into_iter().take(2).map(|row| project(row, &returns)).collect())
		})
	}

	fn load_all(&mut self, table: &str, columns: &[String]) -> Result<Vec<Row>> {
		self.with_table(table, |data| {
			let indices = columns.iter().map(|c| data.index_of(table, c)).collect::<Result<Vec<_>>>()?;
			Ok(data.rows.iter().map(|row| project(row, &indices)).collect())
		})
	}
}

#[cfg(test)]
mod tests {
	use rowflow_type::row;

	use super::*;

	fn connector() -> MemoryConnector {
		let customers = MemoryTable::new(vec![
			FieldMeta::new("id", ValueType::Integer),
			FieldMeta::new("name", ValueType::String),
			FieldMeta::new("city", ValueType::String),
		])
		.with_row(row![1i64, "Ada", "London"])
		.with_row(row![2i64, "Grace", "New York"])
		.with_row(row![3i64, "Edsger", "Rotterdam"]);

		MemoryConnector::new().with_table("crm", "customers", customers)
	}

	fn query(keys: Vec<(&str, Condition)>) -> LookupQuery {
		LookupQuery {
			table: "customers".to_string(),
			keys: keys
				.into_iter()
				.map(|(column, condition)| QueryKey {
					column: column.to_string(),
					condition,
				})
				.collect(),
			returns: vec!["name".to_string()],
			order_by: None,
		}
	}

	#[test]
	fn test_unknown_connection() {
		let err = connector().connect("erp").err().unwrap();
		assert_eq!(err.code(), "STORE_001");
	}

	#[test]
	fn test_lookup_by_equality() {
		let connector = connector();
		let mut store = connector.connect("crm").unwrap();

		let rows = store.lookup(&query(vec![("id", Condition::Equal)]), &[Value::Integer(2)]).unwrap();
		assert_eq!(rows, vec![row!["Grace"]]);
		assert_eq!(connector.queries(), 1);
	}

	#[test]
	fn test_lookup_returns_at_most_two_in_order() {
		let mut store = connector().connect("crm").unwrap();
		let mut q = query(vec![("id", Condition::Between)]);
		q.order_by = Some("id DESC".to_string());

		let rows = store.lookup(&q, &[Value::Integer(1), Value::Integer(3)]).unwrap();
		assert_eq!(rows, vec![row!["Edsger"], row!["Grace"]]);
	}

	#[test]
	fn test_missing_table_and_column() {
		let mut store = connector().connect("crm").unwrap();

		let err = store.column_types("orders", &["id".to_string()]).unwrap_err();
		assert_eq!(err.code(), "STORE_003");

		let err = store.column_types("customers", &["email".to_string()]).unwrap_err();
		assert_eq!(err.code(), "STORE_004");
	}

	#[test]
	fn test_load_all_projects_columns() {
		let mut store = connector().connect("crm").unwrap();
		let rows = store.load_all("customers", &["city".to_string(), "id".to_string()]).unwrap();
		assert_eq!(rows.len(), 3);
		assert_eq!(rows[0], row!["London", 1i64]);
	}

	#[test]
	fn test_short_rows_read_as_null() {
		let table = MemoryTable::new(vec![FieldMeta::new("id", ValueType::Integer), FieldMeta::new("name", ValueType::String)])
			.with_row(row![1i64])
			.with_row(row![2i64, "Grace"]);
		let mut store = MemoryConnector::new().with_table("crm", "customers", table).connect("crm").unwrap();

		let mut q = query(vec![("name", Condition::IsNull)]);
		q.order_by = Some("name".to_string());
		assert_eq!(store.lookup(&q, &[]).unwrap(), vec![Row::new(vec![Value::Null])]);

		let rows = store.load_all("customers", &["name".to_string()]).unwrap();
		assert_eq!(rows, vec![Row::new(vec![Value::Null]), row!["Grace"]]);
	}

	#[test]
	fn test_parse_order_by() {
		assert_eq!(
			parse_order_by("name, \"id\" desc"),
			vec![("name".to_string(), false), ("id".to_string(), true)]
		);
	}
}
