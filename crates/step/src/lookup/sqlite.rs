// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! SQLite backed lookup store.

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
};

use rowflow_type::{Result, Row, Value, ValueType};
use rusqlite::{
	Connection, OpenFlags, params_from_iter,
	types::{Value as SqlValue, ValueRef},
};
use tracing::{debug, instrument};

use super::{
	condition::Condition,
	store::{LookupQuery, LookupStore, StoreConnector},
};
use crate::error::LookupError;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT_MILLIS: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Maps connection names to SQLite database files.
#[derive(Clone, Debug, Default)]
pub struct SqliteConnector {
	databases: HashMap<String, PathBuf>,
	read_only: bool,
}

impl SqliteConnector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_database(mut self, connection: impl Into<String>, path: impl AsRef<Path>) -> Self {
		self.databases.insert(connection.into(), path.as_ref().to_path_buf());
		self
	}

	pub fn read_only(mut self, read_only: bool) -> Self {
		self.read_only = read_only;
		self
	}
}

impl StoreConnector for SqliteConnector {
	#[instrument(name = "lookup::sqlite::connect", level = "debug", skip(self))]
	fn connect(&self, connection: &str) -> Result<Box<dyn LookupStore>> {
		let Some(path) = self.databases.get(connection) else {
			return Err(LookupError::UnknownConnection {
				connection: connection.to_string(),
			}
			.into());
		};

		let flags = if self.read_only {
			OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
		} else {
			OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX
		};

		let conn = Connection::open_with_flags(path, flags).map_err(|err| LookupError::ConnectionFailed {
			connection: connection.to_string(),
			reason: err.to_string(),
		})?;
		debug!(connection, path = %path.display(), "sqlite lookup store opened");

		Ok(Box::new(SqliteStore {
			conn,
		}))
	}
}

pub struct SqliteStore {
	conn: Connection,
}

fn quote(identifier: &str) -> String {
	format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn query_failed(table: &str, err: rusqlite::Error) -> LookupError {
	LookupError::QueryFailed {
		table: table.to_string(),
		reason: err.to_string(),
	}
}

/// Column type from a declared SQLite type name, following SQLite's
/// affinity rules with a few common extensions.
fn declared_type(declared: &str) -> Option<ValueType> {
	let declared = declared.to_ascii_uppercase();
	if declared.is_empty() {
		None
	} else if declared.contains("BOOL") {
		Some(ValueType::Boolean)
	} else if declared.contains("INT") {
		Some(ValueType::Integer)
	} else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
		Some(ValueType::String)
	} else if declared.contains("BLOB") {
		Some(ValueType::Binary)
	} else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB") {
		Some(ValueType::Number)
	} else if declared.contains("DATE") || declared.contains("TIME") {
		Some(ValueType::Date)
	} else if declared.contains("DEC") || declared.contains("NUMERIC") {
		Some(ValueType::BigNumber)
	} else {
		None
	}
}

fn to_sql(value: &Value) -> SqlValue {
	match value {
		Value::Null => SqlValue::Null,
		Value::String(s) => SqlValue::Text(s.clone()),
		Value::Integer(i) => SqlValue::Integer(*i),
		Value::Number(n) => SqlValue::Real(n.value()),
		Value::Boolean(b) => SqlValue::Integer(*b as i64),
		Value::Date(d) => {
			let format = if d.and_utc().timestamp_subsec_millis() == 0 { DATE_FORMAT } else { DATE_FORMAT_MILLIS };
			SqlValue::Text(d.format(format).to_string())
		}
		Value::Binary(b) => SqlValue::Blob(b.clone()),
		Value::BigNumber(n) => SqlValue::Text(n.to_string()),
	}
}

fn from_sql(value: ValueRef<'_>) -> Value {
	match value {
		ValueRef::Null => Value::Null,
		ValueRef::Integer(i) => Value::Integer(i),
		ValueRef::Real(r) => Value::number(r),
		ValueRef::Text(t) => Value::string(String::from_utf8_lossy(t)),
		ValueRef::Blob(b) => Value::binary(b.to_vec()),
	}
}

fn select_sql(query: &LookupQuery) -> String {
	let columns = query.returns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
	let mut sql = format!("SELECT {} FROM {}", columns, quote(&query.table));

	let terms = query
		.keys
		.iter()
		.map(|key| {
			let column = quote(&key.column);
			match key.condition {
				Condition::IsNull | Condition::IsNotNull => format!("{} {}", column, key.condition),
				Condition::Between => format!("{} BETWEEN ? AND ?", column),
				condition => format!("{} {} ?", column, condition),
			}
		})
		.collect::<Vec<_>>();

	if !terms.is_empty() {
		sql.push_str(" WHERE ");
		sql.push_str(&terms.join(" AND "));
	}

	if let Some(order_by) = query.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
		sql.push_str(" ORDER BY ");
		sql.push_str(order_by);
	}
	sql
}

impl SqliteStore {
	fn fetch(&self, table: &str, sql: &str, params: Vec<SqlValue>, width: usize, limit: Option<usize>) -> Result<Vec<Row>> {
		let mut stmt = self.conn.prepare_cached(sql).map_err(|err| query_failed(table, err))?;
		let mut rows = stmt.query(params_from_iter(params)).map_err(|err| query_failed(table, err))?;

		let mut result = Vec::new();
		while let Some(row) = rows.next().map_err(|err| query_failed(table, err))? {
			let mut values = Row::with_capacity(width);
			for index in 0..width {
				let value = row.get_ref(index).map_err(|err| query_failed(table, err))?;
				values.push(from_sql(value));
			}
			result.push(values);

			if limit.is_some_and(|limit| result.len() >= limit) {
				break;
			}
		}
		Ok(result)
	}
}

impl LookupStore for SqliteStore {
	fn column_types(&mut self, table: &str, columns: &[String]) -> Result<Vec<Option<ValueType>>> {
		let sql = format!("PRAGMA table_info({})", quote(table));
		let declared = self.fetch(table, &sql, vec![], 3, None)?;
		if declared.is_empty() {
			return Err(LookupError::TableNotFound {
				table: table.to_string(),
			}
			.into());
		}

		let types: HashMap<String, String> = declared
			.into_iter()
			.filter_map(|row| {
				let name = row.get(1)?.as_str()?.to_string();
				let declared = row.get(2).and_then(Value::as_str).unwrap_or_default().to_string();
				Some((name, declared))
			})
			.collect();

		columns.iter()
			.map(|column| match types.get(column) {
				Some(declared) => Ok(declared_type(declared)),
				None => Err(LookupError::ColumnNotFound {
					table: table.to_string(),
					column: column.clone(),
				}
				.into()),
			})
			.collect()
	}

	#[instrument(name = "lookup::sqlite::lookup", level = "trace", skip_all, fields(table = %query.table))]
	fn lookup(&mut self, query: &LookupQuery, key: &[Value]) -> Result<Vec<Row>> {
		let sql = select_sql(query);
		let params = key.iter().map(to_sql).collect();
		self.fetch(&query.table, &sql, params, query.returns.len(), Some(2))
	}

	fn load_all(&mut self, table: &str, columns: &[String]) -> Result<Vec<Row>> {
		let projection = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
		let sql = format!("SELECT {} FROM {}", projection, quote(table));
		self.fetch(table, &sql, vec![], columns.len(), None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lookup::store::QueryKey;

	#[test]
	fn test_select_sql() {
		let query = LookupQuery {
			table: "customers".to_string(),
			keys: vec![
				QueryKey {
					column: "id".to_string(),
					condition: Condition::Equal,
				},
				QueryKey {
					column: "since".to_string(),
					condition: Condition::Between,
				},
				QueryKey {
					column: "deleted".to_string(),
					condition: Condition::IsNull,
				},
			],
			returns: vec!["name".to_string(), "city".to_string()],
			order_by: Some("name".to_string()),
		};

		assert_eq!(
			select_sql(&query),
			"SELECT \"name\", \"city\" FROM \"customers\" WHERE \"id\" = ? AND \"since\" BETWEEN ? AND ? AND \"deleted\" IS NULL ORDER BY name"
		);
	}

	#[test]
	fn test_declared_types() {
		assert_eq!(declared_type("INTEGER"), Some(ValueType::Integer));
		assert_eq!(declared_type("varchar(50)"), Some(ValueType::String));
		assert_eq!(declared_type("DOUBLE PRECISION"), Some(ValueType::Number));
		assert_eq!(declared_type("BOOLEAN"), Some(ValueType::Boolean));
		assert_eq!(declared_type("DATETIME"), Some(ValueType::Date));
		assert_eq!(declared_type("DECIMAL(10,2)"), Some(ValueType::BigNumber));
		assert_eq!(declared_type(""), None);
	}

	#[test]
	fn test_quote_escapes() {
		assert_eq!(quote("odd\"name"), "\"odd\"\"name\"");
	}
}
