// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Running a job per group of rows and fanning out its results

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread,
	time::Duration,
};

use rowflow_core::{
	ExecutionResult, ManualClock, ResultFile, ResultFileKind, RowSet, Step, StepContext, StepEnvironment, StepRef, StepState, StopFlag,
	job::{JobCatalog, JobParameterDefinition, JobSpecification, SequentialJob},
	step::{init_step, run_step, spawn_step},
};
use rowflow_step::{
	JobExecutorConfig, JobExecutorStep,
	job_executor::{ExecutionResultFields, ParameterMapping},
};
use rowflow_type::{FieldMeta, Row, RowMeta, Value, ValueType, row};

const WAIT: Duration = Duration::from_millis(2);

fn environment() -> StepEnvironment {
	let mut environment = StepEnvironment::new();
	environment.row_wait_timeout = WAIT;
	environment
}

fn input_meta() -> Arc<RowMeta> {
	Arc::new(RowMeta::new(vec![FieldMeta::new("customer", ValueType::String), FieldMeta::new("amount", ValueType::Integer)]))
}

fn result_meta() -> Arc<RowMeta> {
	Arc::new(RowMeta::new(vec![FieldMeta::new("label", ValueType::String)]))
}

fn specification() -> JobSpecification {
	JobSpecification::Filename {
		filename: "child.kjb".to_string(),
	}
}

struct Harness {
	ctx: StepContext,
	input: Arc<RowSet>,
	results: Arc<RowSet>,
	rows: Arc<RowSet>,
	files: Arc<RowSet>,
}

fn harness(env: &StepEnvironment) -> Harness {
	let me = StepRef::new("executor", 0);
	let input = Arc::new(RowSet::new(StepRef::new("source", 0), me.clone(), 100));
	let results = Arc::new(RowSet::new(me.clone(), StepRef::new("results", 0), 100));
	let rows = Arc::new(RowSet::new(me.clone(), StepRef::new("rows", 0), 100));
	let files = Arc::new(RowSet::new(me.clone(), StepRef::new("files", 0), 100));

	let mut ctx = StepContext::new(me, env);
	ctx.add_input(input.clone());
	ctx.add_output(results.clone());
	ctx.add_output(rows.clone());
	ctx.add_output(files.clone());

	Harness {
		ctx,
		input,
		results,
		rows,
		files,
	}
}

fn config() -> JobExecutorConfig {
	let mut config = JobExecutorConfig::new(specification());
	config.execution_result_target = Some("results".to_string());
	config.result_rows_target = Some("rows".to_string());
	config.result_rows_fields = vec![FieldMeta::new("label", ValueType::String)];
	config.result_files_target = Some("files".to_string());
	config
}

fn feed(input: &RowSet, rows: Vec<Row>) {
	let meta = input_meta();
	let stop = StopFlag::new();
	for row in rows {
		assert!(input.put_row(&meta, row, &stop, WAIT).unwrap());
	}
	input.set_done();
}

fn drain(rowset: &RowSet) -> Vec<Row> {
	let mut rows = vec![];
	while let Some((_, row)) = rowset.get_row(Duration::ZERO) {
		rows.push(row);
	}
	rows
}

fn catalog(job: SequentialJob) -> Arc<JobCatalog> {
	let catalog = JobCatalog::new();
	catalog.register_file("child.kjb", Arc::new(job));
	Arc::new(catalog)
}

/// A job that returns one result row per entry in `labels`.
fn labelling_job(labels: &'static [&'static str]) -> SequentialJob {
	SequentialJob::new("child").with_fn("label", move |_ctx, mut result| {
		for label in labels {
			result.add_row(result_meta(), row![*label]);
		}
		Ok(result)
	})
}

#[test]
fn test_one_execution_fans_out() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.group_size = 3;
	let mut step = JobExecutorStep::new(config, catalog(labelling_job(&["first", "second"])));

	feed(&h.input, vec![row!["ada", 1i64], row!["grace", 2i64], row!["edsger", 3i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);
	assert!(report.error.is_none());
	assert_eq!(report.state, StepState::Done);

	let results = drain(&h.results);
	assert_eq!(results.len(), 1);
	assert_eq!(results[0].len(), 14);
	assert_eq!(results[0][1], Value::Boolean(true));
	assert_eq!(results[0][2], Value::Integer(0));

	assert_eq!(drain(&h.rows), vec![row!["first"], row!["second"]]);
	assert!(drain(&h.files).is_empty());

	assert_eq!(step.executions(), 1);
	assert_eq!(report.counters.lines_read, 3);
	assert!(h.results.is_done());
	assert!(h.rows.is_done());
	assert!(h.files.is_done());
}

#[test]
fn test_groups_by_size_and_flushes_the_rest() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.group_size = 3;
	config.result_rows_target = None;
	config.result_files_target = None;

	let job = SequentialJob::new("child").with_fn("count", |ctx, mut result| {
		result.lines_read = ctx.source_rows().len() as u64;
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config, catalog(job));

	feed(&h.input, (0..7i64).map(|i| row!["c", i]).collect());

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);
	assert!(report.error.is_none());

	let read: Vec<Value> = drain(&h.results).into_iter().map(|r| r[3].clone()).collect();
	assert_eq!(read, vec![Value::Integer(3), Value::Integer(3), Value::Integer(1)]);
}

#[test]
fn test_groups_by_field_change() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.group_field = Some("customer".to_string());
	config.result_rows_target = None;
	config.result_files_target = None;
	let mut fields = ExecutionResultFields::none();
	fields.lines_read = Some("rows".to_string());
	config.execution_result_fields = fields;

	let job = SequentialJob::new("child").with_fn("count", |ctx, mut result| {
		result.lines_read = ctx.source_rows().len() as u64;
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config, catalog(job));

	let customers = ["a", "a", "b", "b", "b", "c"];
	feed(&h.input, customers.iter().map(|c| row![*c, 0i64]).collect());

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);
	assert!(report.error.is_none());

	assert_eq!(drain(&h.results), vec![row![2i64], row![3i64], row![1i64]]);
}

#[test]
fn test_groups_by_elapsed_time() {
	let clock = Arc::new(ManualClock::new(0));
	let env = environment().with_clock(clock.clone());
	let mut h = harness(&env);

	let mut config = config();
	config.group_size = 0;
	config.group_time_ms = 100;
	config.result_rows_target = None;
	config.result_files_target = None;
	let mut fields = ExecutionResultFields::none();
	fields.time = Some("elapsed".to_string());
	fields.lines_read = Some("rows".to_string());
	config.execution_result_fields = fields;

	let job = SequentialJob::new("child").with_fn("count", |ctx, mut result| {
		result.lines_read = ctx.source_rows().len() as u64;
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config, catalog(job));
	init_step(&mut step, &mut h.ctx).unwrap();

	let meta = input_meta();
	let stop = StopFlag::new();
	for (at, amount) in [(0, 1i64), (40, 2), (120, 3), (150, 4)] {
		clock.set(at);
		assert!(h.input.put_row(&meta, row!["c", amount], &stop, WAIT).unwrap());
		assert!(step.process_row(&mut h.ctx).unwrap());
	}
	assert_eq!(step.buffered(), 2);

	h.input.set_done();
	assert!(!step.process_row(&mut h.ctx).unwrap());

	assert_eq!(drain(&h.results), vec![row![120i64, 2i64], row![30i64, 2i64]]);
}

#[test]
fn test_no_input_means_no_execution() {
	let env = environment();
	let mut h = harness(&env);
	let mut step = JobExecutorStep::new(config(), catalog(labelling_job(&["x"])));

	feed(&h.input, vec![]);

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);
	assert!(report.error.is_none());
	assert_eq!(step.executions(), 0);
	assert!(drain(&h.results).is_empty());
	assert!(h.results.is_done());
}

#[test]
fn test_result_files_become_rows() {
	let env = environment();
	let mut h = harness(&env);

	let job = SequentialJob::new("child").with_fn("files", |_ctx, mut result| {
		result.add_file(ResultFile::new(ResultFileKind::General, "/tmp/out-1.csv"));
		result.add_file(ResultFile::new(ResultFileKind::Log, "/tmp/out-1.log"));
		result.files_retrieved = 2;
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config(), catalog(job));

	feed(&h.input, vec![row!["ada", 1i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	run_step(&mut step, &mut h.ctx);

	assert_eq!(drain(&h.files), vec![row!["/tmp/out-1.csv"], row!["/tmp/out-1.log"]]);
	let results = drain(&h.results);
	assert_eq!(results[0][10], Value::Integer(2));
}

#[test]
fn test_failed_job_is_data() {
	let env = environment();
	let mut h = harness(&env);

	let job = SequentialJob::new("child").with_fn("explode", |ctx, _result| {
		ctx.log_line("about to fail");
		Err(rowflow_core::StepError::RowProcessing {
			step: "child".to_string(),
			reason: "boom".to_string(),
		}
		.into())
	});
	let mut step = JobExecutorStep::new(config(), catalog(job));

	feed(&h.input, vec![row!["ada", 1i64], row!["grace", 2i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);
	assert!(report.error.is_none());
	assert!(!env.stop.is_stopped());

	let results = drain(&h.results);
	assert_eq!(results.len(), 2);
	for result in &results {
		assert_eq!(result[1], Value::Boolean(false));
		assert_eq!(result[2], Value::Integer(1));

		let log = result[12].as_str().unwrap();
		assert!(log.contains("about to fail"));
	}
	assert!(drain(&h.rows).is_empty());
}

#[test]
fn test_result_row_type_mismatch_emits_nothing() {
	let env = environment();
	let mut h = harness(&env);

	let job = SequentialJob::new("child").with_fn("rows", |_ctx, mut result| {
		result.add_row(result_meta(), row!["fine"]);
		let counted = Arc::new(RowMeta::new(vec![FieldMeta::new("label", ValueType::Integer)]));
		result.add_row(counted, row![7i64]);
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config(), catalog(job));

	feed(&h.input, vec![row!["ada", 1i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	let report = run_step(&mut step, &mut h.ctx);

	let err = report.error.unwrap();
	assert_eq!(err.code(), "SCHEMA_002");
	assert_eq!(report.state, StepState::Done);
	assert!(drain(&h.rows).is_empty());
	assert!(drain(&h.results).is_empty());
	assert!(env.stop.is_stopped());
}

#[test]
fn test_parameters_come_from_first_row_of_group() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.group_size = 2;
	config.parameters.parameters = vec![
		ParameterMapping::from_field("CUSTOMER", "customer"),
		ParameterMapping::from_value("REGION", "${AREA}-north"),
	];

	let job = SequentialJob::new("child")
		.with_parameter(JobParameterDefinition::new("CURRENCY").with_default("EUR"))
		.with_fn("echo", |ctx, mut result| {
			let label = format!(
				"{}/{}/{}",
				ctx.variable("CUSTOMER").unwrap_or("-"),
				ctx.variable("REGION").unwrap_or("-"),
				ctx.variable("CURRENCY").unwrap_or("-")
			);
			result.add_row(result_meta(), row![label]);
			Ok(result)
		});
	let mut step = JobExecutorStep::new(config, catalog(job));

	h.ctx.variables_mut().set("AREA", "eu");
	feed(&h.input, vec![row!["ada", 1i64], row!["grace", 2i64], row!["edsger", 3i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	run_step(&mut step, &mut h.ctx);

	assert_eq!(drain(&h.rows), vec![row!["ada/eu-north/EUR"], row!["edsger/eu-north/EUR"]]);
}

#[test]
fn test_variables_are_not_inherited_when_disabled() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.parameters.inherit_all_variables = false;

	let job = SequentialJob::new("child").with_fn("echo", |ctx, mut result| {
		result.add_row(result_meta(), row![ctx.variable("AREA").unwrap_or("unset")]);
		Ok(result)
	});
	let mut step = JobExecutorStep::new(config, catalog(job));

	h.ctx.variables_mut().set("AREA", "eu");
	feed(&h.input, vec![row!["ada", 1i64]]);

	init_step(&mut step, &mut h.ctx).unwrap();
	run_step(&mut step, &mut h.ctx);

	assert_eq!(drain(&h.rows), vec![row!["unset"]]);
}

#[test]
fn test_unknown_job_fails_init() {
	let env = environment();
	let mut h = harness(&env);
	let mut step = JobExecutorStep::new(config(), Arc::new(JobCatalog::new()));

	let err = init_step(&mut step, &mut h.ctx).unwrap_err();
	assert_eq!(err.code(), "CONFIG_001");
	assert_eq!(err.cause.as_ref().map(|c| c.code.as_str()), Some("JOB_001"));
	assert_eq!(h.ctx.state(), StepState::Failed);
}

#[test]
fn test_unwired_target_fails_init() {
	let env = environment();
	let mut h = harness(&env);

	let mut config = config();
	config.result_rows_target = Some("nowhere".to_string());
	let mut step = JobExecutorStep::new(config, catalog(labelling_job(&[])));

	let err = init_step(&mut step, &mut h.ctx).unwrap_err();
	assert_eq!(err.code(), "CONFIG_002");
}

#[test]
fn test_stop_reaches_running_job() {
	let env = environment();
	let h = harness(&env);

	let saw_stop = Arc::new(AtomicBool::new(false));
	let observed = saw_stop.clone();
	let job = SequentialJob::new("child").with_fn("wait", move |ctx, result| {
		while !ctx.is_stopped() {
			thread::sleep(Duration::from_millis(1));
		}
		observed.store(true, Ordering::SeqCst);
		Ok(ExecutionResult {
			stopped: true,
			..result
		})
	});

	let mut config = config();
	config.group_size = 1;
	let mut step = JobExecutorStep::new(config, catalog(job));

	let Harness {
		mut ctx,
		input,
		..
	} = h;
	let stop = StopFlag::new();
	input.put_row(&input_meta(), row!["ada", 1i64], &stop, WAIT).unwrap();

	init_step(&mut step, &mut ctx).unwrap();
	let handle = spawn_step(Box::new(step), ctx).unwrap();

	thread::sleep(Duration::from_millis(20));
	assert!(!handle.is_finished());

	env.stop.stop();
	let report = handle.join();

	assert!(saw_stop.load(Ordering::SeqCst));
	assert!(report.error.is_none());
	assert_eq!(report.state, StepState::Done);
}
