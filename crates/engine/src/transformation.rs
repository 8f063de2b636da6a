// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use rowflow_core::{
	Clock, RowSet, StepContext, StepEnvironment, StepRef, SystemClock,
	job::{JobCatalog, JobResolver},
	step::{dispose_step, init_step, spawn_step},
};
use rowflow_step::{MemoryConnector, StepFactory, Steps, StoreConnector};
use rowflow_type::{Error, Result};
use tracing::{debug, error, info, instrument};

use crate::{
	config::TransformationConfig,
	error::EngineError,
	execution::Execution,
	handle::{RowCollector, RowProducer},
};

const PRODUCER: &str = "rowflow.producer";
const COLLECTOR: &str = "rowflow.collector";

/// What steps need from the outside world.
#[derive(Clone)]
pub struct EngineServices {
	pub resolver: Arc<dyn JobResolver>,
	pub connector: Arc<dyn StoreConnector>,
	pub clock: Arc<dyn Clock>,
}

impl EngineServices {
	pub fn new(resolver: Arc<dyn JobResolver>, connector: Arc<dyn StoreConnector>) -> Self {
		Self {
			resolver,
			connector,
			clock: Arc::new(SystemClock),
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}
}

impl Default for EngineServices {
	fn default() -> Self {
		Self::new(Arc::new(JobCatalog::new()), Arc::new(MemoryConnector::new()))
	}
}

/// Copy pairs connected by a hop between steps with `from` and `to` copies.
/// Equal counts pair copy i with copy i, otherwise every copy feeds every copy.
pub(crate) fn copy_pairs(from: usize, to: usize) -> Vec<(usize, usize)> {
	if from == to {
		return (0..from).map(|i| (i, i)).collect();
	}

	(0..from).flat_map(|a| (0..to).map(move |b| (a, b))).collect()
}

fn validate(config: &TransformationConfig) -> Result<()> {
	let mut names = HashSet::new();
	for step in &config.steps {
		if step.name.trim().is_empty() {
			return Err(EngineError::InvalidDefinition {
				reason: "a step has no name".to_string(),
			}
			.into());
		}
		if !names.insert(step.name.as_str()) {
			return Err(EngineError::DuplicateStep {
				step: step.name.clone(),
			}
			.into());
		}
		if step.copies == 0 {
			return Err(EngineError::NoCopies {
				step: step.name.clone(),
			}
			.into());
		}
	}

	let mut hops = HashSet::new();
	for hop in &config.hops {
		for end in [&hop.from, &hop.to] {
			if !names.contains(end.as_str()) {
				return Err(EngineError::UnknownStep {
					context: format!("hop {} -> {}", hop.from, hop.to),
					step: end.clone(),
				}
				.into());
			}
		}

		let invalid = |reason: &str| -> Error {
			EngineError::InvalidHop {
				from: hop.from.clone(),
				to: hop.to.clone(),
				reason: reason.to_string(),
			}
			.into()
		};
		if hop.from == hop.to {
			return Err(invalid("a step cannot feed itself"));
		}
		if !hops.insert((hop.from.as_str(), hop.to.as_str())) {
			return Err(invalid("hop is defined more than once"));
		}
	}

	for step in &config.steps {
		for target in step.config.targets() {
			if !names.contains(target) {
				return Err(EngineError::UnknownStep {
					context: format!("step '{}'", step.name),
					step: target.to_string(),
				}
				.into());
			}
		}
	}
	Ok(())
}

struct StepCopy {
	step: Steps,
	ctx: StepContext,
}

pub struct Transformation;

impl Transformation {
	/// Validate `config`, build every step copy and wire the hops into row
	/// sets. Nothing runs until [`PreparedTransformation::start`].
	#[instrument(name = "transformation::prepare", level = "debug", skip_all, fields(transformation = %config.name))]
	pub fn prepare(config: TransformationConfig, services: &EngineServices) -> Result<PreparedTransformation> {
		validate(&config)?;

		let mut env = StepEnvironment::new().with_clock(services.clock.clone());
		env.row_wait_timeout = config.engine.row_wait_timeout();
		env.variables = config.variables.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

		let factory = StepFactory::new(services.resolver.clone(), services.connector.clone());

		let mut copies = Vec::new();
		let mut index: HashMap<String, Vec<usize>> = HashMap::new();
		for definition in &config.steps {
			for copy in 0..definition.copies {
				index.entry(definition.name.clone()).or_default().push(copies.len());
				copies.push(StepCopy {
					step: factory.create(&definition.config),
					ctx: StepContext::new(StepRef::new(&definition.name, copy), &env),
				});
			}
		}

		let capacity = config.engine.row_set_size.max(1);
		for hop in &config.hops {
			let from = &index[&hop.from];
			let to = &index[&hop.to];

			for (a, b) in copy_pairs(from.len(), to.len()) {
				let (producer, consumer) = (from[a], to[b]);
				let rowset = Arc::new(RowSet::new(
					copies[producer].ctx.step().clone(),
					copies[consumer].ctx.step().clone(),
					capacity,
				));
				debug!(rowset = %rowset, "wired row set");
				copies[producer].ctx.add_output(rowset.clone());
				copies[consumer].ctx.add_input(rowset);
			}
		}

		info!(
			transformation = %config.name,
			steps = config.steps.len(),
			copies = copies.len(),
			hops = config.hops.len(),
			"transformation prepared"
		);

		Ok(PreparedTransformation {
			config,
			env,
			copies,
			index,
		})
	}
}

/// A wired transformation that has not started yet.
pub struct PreparedTransformation {
	config: TransformationConfig,
	env: StepEnvironment,
	copies: Vec<StepCopy>,
	index: HashMap<String, Vec<usize>>,
}

impl PreparedTransformation {
	pub fn name(&self) -> &str {
		&self.config.name
	}

	pub fn config(&self) -> &TransformationConfig {
		&self.config
	}

	pub fn environment(&self) -> &StepEnvironment {
		&self.env
	}

	fn copies_of(&self, step: &str, context: &str) -> Result<Vec<usize>> {
		self.index.get(step).cloned().ok_or_else(|| {
			EngineError::UnknownStep {
				context: context.to_string(),
				step: step.to_string(),
			}
			.into()
		})
	}

	/// Feed rows into `step` from outside the transformation.
	pub fn row_producer(&mut self, step: &str) -> Result<RowProducer> {
		let copies = self.copies_of(step, "row producer")?;
		let capacity = self.config.engine.row_set_size.max(1);

		let mut rowsets = Vec::with_capacity(copies.len());
		for copy in copies {
			let ctx = &mut self.copies[copy].ctx;
			let rowset = Arc::new(RowSet::new(StepRef::new(PRODUCER, 0), ctx.step().clone(), capacity));
			ctx.add_input(rowset.clone());
			rowsets.push(rowset);
		}
		Ok(RowProducer::new(rowsets, self.env.stop.clone(), self.env.row_wait_timeout))
	}

	/// Receive every row `step` writes.
	///
	/// Only a step without outgoing hops and without another collector can be
	/// collected from.
	pub fn row_collector(&mut self, step: &str) -> Result<RowCollector> {
		let copies = self.copies_of(step, "row collector")?;
		if copies.iter().any(|&copy| !self.copies[copy].ctx.outputs().is_empty()) {
			return Err(EngineError::OutputTaken {
				step: step.to_string(),
			}
			.into());
		}
		let capacity = self.config.engine.row_set_size.max(1);

		let mut rowsets = Vec::with_capacity(copies.len());
		for copy in copies {
			let ctx = &mut self.copies[copy].ctx;
			let rowset = Arc::new(RowSet::new(ctx.step().clone(), StepRef::new(COLLECTOR, 0), capacity));
			ctx.add_output(rowset.clone());
			rowsets.push(rowset);
		}
		Ok(RowCollector::new(rowsets, self.env.row_wait_timeout))
	}

	/// Initialize every copy, then run each on its own thread.
	///
	/// When any copy fails to initialize, every copy is disposed and the first
	/// failure is returned.
	#[instrument(name = "transformation::start", level = "debug", skip_all, fields(transformation = %self.config.name))]
	pub fn start(self) -> Result<Execution> {
		let PreparedTransformation {
			config,
			env,
			mut copies,
			..
		} = self;

		let mut failure: Option<Error> = None;
		for copy in copies.iter_mut() {
			if let Err(err) = init_step(&mut copy.step, &mut copy.ctx) {
				if failure.is_none() {
					failure = Some(err);
				}
			}
		}

		if let Some(err) = failure {
			error!(transformation = %config.name, error = %err, "transformation failed to initialize");
			env.stop.stop();
			for copy in copies.iter_mut() {
				dispose_step(&mut copy.step, &mut copy.ctx);
			}
			return Err(err);
		}

		let mut handles = Vec::with_capacity(copies.len());
		let mut pending = copies.into_iter();
		while let Some(StepCopy {
			step,
			ctx,
		}) = pending.next()
		{
			match spawn_step(Box::new(step), ctx) {
				Ok(handle) => handles.push(handle),
				Err(err) => {
					env.stop.stop();
					for mut copy in pending {
						dispose_step(&mut copy.step, &mut copy.ctx);
					}
					for handle in handles {
						handle.join();
					}
					return Err(err);
				}
			}
		}

		info!(transformation = %config.name, copies = handles.len(), "transformation started");
		Ok(Execution::new(config.name, handles, env.stop.clone(), env.log.clone()))
	}
}
