// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use once_cell::sync::Lazy;
use rowflow_engine::{RowCollector, RowProducer};
use rowflow_type::{FieldMeta, Row, RowMeta, ValueType};
use tracing_subscriber::EnvFilter;

static LOGGING: Lazy<()> = Lazy::new(|| {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_logging() {
	Lazy::force(&LOGGING);
}

pub fn orders_meta() -> Arc<RowMeta> {
	Arc::new(RowMeta::new(vec![FieldMeta::new("order", ValueType::Integer), FieldMeta::new("customer_id", ValueType::Integer)]))
}

pub fn feed(mut producer: RowProducer, meta: &Arc<RowMeta>, rows: Vec<Row>) {
	let expected = rows.len();
	assert_eq!(producer.put_rows(meta, rows).unwrap(), expected);
	producer.finish();
}

pub fn collect(mut collector: RowCollector) -> Vec<Row> {
	collector.collect_rows()
}
